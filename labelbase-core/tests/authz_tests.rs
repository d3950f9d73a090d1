//! Authorization resolver integration tests
//!
//! Exercises the hierarchy walk against the in-memory stores: admin bypass,
//! specific-first resolution with project fallback, and the distinction
//! between "missing" and "not allowed".

use labelbase_core::authz::Authorizer;
use labelbase_core::error::{Error, ResourceKind};
use labelbase_core::lifecycle::Lifecycle;
use labelbase_core::models::{
    CreateDataset, CreateImage, CreateImageObject, CreateObjectPoint, CreateProject, CreateUser,
    Dataset, ImagePayload, Project, User,
};
use labelbase_core::roles::{Capability, DatasetRole, ProjectRole, SystemRole};
use labelbase_core::store::memory::MemoryStores;
use labelbase_core::store::Stores;
use uuid::Uuid;

struct Fixture {
    stores: Stores,
    lifecycle: Lifecycle,
    authz: Authorizer,
    owner: User,
    project: Project,
    dataset: Dataset,
}

async fn add_user(stores: &Stores, name: &str, role: SystemRole) -> User {
    stores
        .users
        .insert(CreateUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "$argon2id$stub".to_string(),
            system_role: role,
        })
        .await
        .unwrap()
}

async fn fixture() -> Fixture {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let authz = Authorizer::new(stores.clone());

    let owner = add_user(&stores, "owner", SystemRole::Researcher).await;
    let project = lifecycle
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: owner.id,
        })
        .await
        .unwrap();
    let dataset = lifecycle
        .create_dataset(CreateDataset {
            name: "d1".to_string(),
            project_id: project.id,
            owner_id: owner.id,
        })
        .await
        .unwrap();

    Fixture {
        stores,
        lifecycle,
        authz,
        owner,
        project,
        dataset,
    }
}

#[tokio::test]
async fn test_admin_bypasses_resolution() {
    let f = fixture().await;
    let admin = add_user(&f.stores, "root", SystemRole::Admin).await;

    // No membership anywhere, still allowed.
    f.authz
        .authorize(&admin, ResourceKind::Dataset, f.dataset.id, Capability::DatasetDelete)
        .await
        .unwrap();

    // The bypass happens before any lookup, so even a missing target
    // passes for the administrator.
    f.authz
        .authorize(&admin, ResourceKind::Dataset, Uuid::new_v4(), Capability::DatasetRead)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_owner_granted_through_own_membership() {
    let f = fixture().await;

    f.authz
        .authorize(
            &f.owner,
            ResourceKind::Project,
            f.project.id,
            Capability::ProjectManageMembers,
        )
        .await
        .unwrap();
    f.authz
        .authorize(&f.owner, ResourceKind::Dataset, f.dataset.id, Capability::DatasetDelete)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_hierarchical_fallback_to_project() {
    let f = fixture().await;
    let editor = add_user(&f.stores, "pm", SystemRole::User).await;
    f.lifecycle
        .add_project_member(f.project.id, editor.id, ProjectRole::Owner)
        .await
        .unwrap();

    // No dataset membership at all; the project grant carries the dataset
    // operation transitively.
    f.authz
        .authorize(&editor, ResourceKind::Dataset, f.dataset.id, Capability::DatasetUpdate)
        .await
        .unwrap();

    // A user with neither membership is denied.
    let stranger = add_user(&f.stores, "stranger", SystemRole::User).await;
    let err = f
        .authz
        .authorize(&stranger, ResourceKind::Dataset, f.dataset.id, Capability::DatasetRead)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(Capability::DatasetRead)));
}

#[tokio::test]
async fn test_grants_checked_independently_not_merged() {
    let f = fixture().await;
    let dual = add_user(&f.stores, "dual", SystemRole::User).await;

    // Viewer at dataset scope, owner at project scope.
    f.lifecycle
        .add_dataset_member(f.dataset.id, dual.id, DatasetRole::Viewer)
        .await
        .unwrap();
    f.lifecycle
        .add_project_member(f.project.id, dual.id, ProjectRole::Owner)
        .await
        .unwrap();

    // The narrow dataset role does not downgrade the broad project grant:
    // delete is allowed through the fallback.
    f.authz
        .authorize(&dual, ResourceKind::Dataset, f.dataset.id, Capability::DatasetDelete)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_viewer_read_allowed_delete_denied() {
    let f = fixture().await;
    let viewer = add_user(&f.stores, "viewer", SystemRole::User).await;
    f.lifecycle
        .add_dataset_member(f.dataset.id, viewer.id, DatasetRole::Viewer)
        .await
        .unwrap();

    f.authz
        .authorize(&viewer, ResourceKind::Dataset, f.dataset.id, Capability::DatasetRead)
        .await
        .unwrap();

    let err = f
        .authz
        .authorize(&viewer, ResourceKind::Dataset, f.dataset.id, Capability::DatasetDelete)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(Capability::DatasetDelete)));
}

#[tokio::test]
async fn test_missing_resource_is_not_permission_denied() {
    let f = fixture().await;
    let viewer = add_user(&f.stores, "viewer", SystemRole::User).await;

    let err = f
        .authz
        .authorize(&viewer, ResourceKind::Dataset, Uuid::new_v4(), Capability::DatasetRead)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(ResourceKind::Dataset)));

    let err = f
        .authz
        .authorize(&viewer, ResourceKind::Project, Uuid::new_v4(), Capability::ProjectRead)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(ResourceKind::Project)));
}

#[tokio::test]
async fn test_dangling_parent_chain_surfaces_not_found() {
    let f = fixture().await;
    let viewer = add_user(&f.stores, "viewer", SystemRole::User).await;

    // A dataset whose project is gone (inserted behind the lifecycle's
    // back to fabricate the dangling state).
    let orphan = f
        .stores
        .datasets
        .insert(CreateDataset {
            name: "orphan".to_string(),
            project_id: Uuid::new_v4(),
            owner_id: f.owner.id,
        })
        .await
        .unwrap();

    let err = f
        .authz
        .authorize(&viewer, ResourceKind::Dataset, orphan.id, Capability::DatasetRead)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(ResourceKind::Project)));
}

#[tokio::test]
async fn test_image_targets_resolve_to_dataset_scope() {
    let f = fixture().await;
    let labeler = add_user(&f.stores, "labeler", SystemRole::User).await;
    f.lifecycle
        .add_dataset_member(f.dataset.id, labeler.id, DatasetRole::Labeler)
        .await
        .unwrap();

    let image = f
        .lifecycle
        .create_image(
            CreateImage {
                name: "frame".to_string(),
                format: "png".to_string(),
                dataset_id: f.dataset.id,
                categories: vec![],
            },
            ImagePayload {
                filename: "frame.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: bytes::Bytes::from_static(b"\x89PNG"),
            },
        )
        .await
        .unwrap();
    let object = f
        .lifecycle
        .create_image_object(CreateImageObject {
            name: "car".to_string(),
            image_id: image.id,
        })
        .await
        .unwrap();
    let point = f
        .lifecycle
        .create_object_point(CreateObjectPoint {
            image_object_id: object.id,
            x: 1.0,
            y: 2.0,
        })
        .await
        .unwrap();

    // Labeler can edit annotations anywhere in the image subtree...
    f.authz
        .authorize(&labeler, ResourceKind::Image, image.id, Capability::AnnotationEdit)
        .await
        .unwrap();
    f.authz
        .authorize(&labeler, ResourceKind::ImageObject, object.id, Capability::AnnotationEdit)
        .await
        .unwrap();
    f.authz
        .authorize(&labeler, ResourceKind::ObjectPoint, point.id, Capability::AnnotationEdit)
        .await
        .unwrap();

    // ...but cannot delete images.
    let err = f
        .authz
        .authorize(&labeler, ResourceKind::Image, image.id, Capability::ImageDelete)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(Capability::ImageDelete)));
}

#[tokio::test]
async fn test_system_scope_checks() {
    let f = fixture().await;
    let researcher = add_user(&f.stores, "res", SystemRole::Researcher).await;
    let regular = add_user(&f.stores, "reg", SystemRole::User).await;

    f.authz
        .authorize_system(&researcher, Capability::ProjectCreate)
        .unwrap();
    f.authz.authorize_system(&regular, Capability::UserRead).unwrap();

    let err = f
        .authz
        .authorize_system(&regular, Capability::ProjectCreate)
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(Capability::ProjectCreate)));
}
