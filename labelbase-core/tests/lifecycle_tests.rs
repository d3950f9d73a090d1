//! Lifecycle manager integration tests
//!
//! These run the engine against the in-memory stores and pin down the
//! creation, membership, and deletion invariants.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use labelbase_core::error::{Error, ResourceKind};
use labelbase_core::lifecycle::{BulkDeletePolicy, Lifecycle};
use labelbase_core::models::{
    CreateDataset, CreateImage, CreateImageObject, CreateObjectPoint, CreateProject, CreateUser,
    ImagePayload, ProjectMembership, User,
};
use labelbase_core::roles::{DatasetRole, ProjectRole, SystemRole};
use labelbase_core::store::memory::MemoryStores;
use labelbase_core::store::{BlobStore, ProjectMembershipStore, Stores};
use uuid::Uuid;

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

fn payload() -> ImagePayload {
    ImagePayload {
        filename: "frame.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: bytes::Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
    }
}

fn create_image(dataset_id: Uuid, name: &str) -> CreateImage {
    CreateImage {
        name: name.to_string(),
        format: "png".to_string(),
        dataset_id,
        categories: vec![],
    }
}

#[tokio::test]
async fn test_create_project_installs_single_owner_membership() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;

    let project = lifecycle
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: owner.id,
        })
        .await
        .unwrap();

    let members = lifecycle.list_project_members(project.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, owner.id);
    assert_eq!(members[0].role, ProjectRole::Owner);

    let owners: Vec<_> = members
        .iter()
        .filter(|m| m.role == ProjectRole::Owner)
        .collect();
    assert_eq!(owners.len(), 1, "exactly one owner membership after creation");
}

#[tokio::test]
async fn test_create_project_unknown_owner_fails() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());

    let err = lifecycle
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: Uuid::new_v4(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ReferenceNotFound(ResourceKind::User)));

    assert!(lifecycle.list_projects().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_membership_guard() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;
    let guest = add_user(&stores, "u2", SystemRole::User).await;

    let project = lifecycle
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: owner.id,
        })
        .await
        .unwrap();

    lifecycle
        .add_project_member(project.id, guest.id, ProjectRole::DatasetEditor)
        .await
        .unwrap();

    // A second link for the same pair is rejected, not merged.
    let err = lifecycle
        .add_project_member(project.id, guest.id, ProjectRole::Owner)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists));

    // Original untouched.
    let kept = lifecycle
        .get_project_membership(project.id, guest.id)
        .await
        .unwrap();
    assert_eq!(kept.role, ProjectRole::DatasetEditor);
}

#[tokio::test]
async fn test_add_member_validates_both_sides() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;

    let project = lifecycle
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: owner.id,
        })
        .await
        .unwrap();

    let err = lifecycle
        .add_project_member(project.id, Uuid::new_v4(), ProjectRole::DatasetEditor)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ReferenceNotFound(ResourceKind::User)));

    let err = lifecycle
        .add_project_member(Uuid::new_v4(), owner.id, ProjectRole::DatasetEditor)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(ResourceKind::Project)));
}

#[tokio::test]
async fn test_owner_membership_protected() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;

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

    // The protection is structural, not authorization-based: it fires for
    // every caller, administrators included.
    let err = lifecycle
        .remove_project_member(project.id, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OwnerProtected));

    let err = lifecycle
        .remove_dataset_member(dataset.id, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OwnerProtected));

    // Demotion is blocked the same way.
    let err = lifecycle
        .update_dataset_member_role(dataset.id, owner.id, DatasetRole::Viewer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OwnerProtected));
}

#[tokio::test]
async fn test_remove_non_owner_member_returns_link() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;
    let guest = add_user(&stores, "u2", SystemRole::User).await;

    let project = lifecycle
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: owner.id,
        })
        .await
        .unwrap();
    lifecycle
        .add_project_member(project.id, guest.id, ProjectRole::DatasetEditor)
        .await
        .unwrap();

    let removed = lifecycle
        .remove_project_member(project.id, guest.id)
        .await
        .unwrap();
    assert_eq!(removed.user_id, guest.id);
    assert_eq!(removed.role, ProjectRole::DatasetEditor);

    let err = lifecycle
        .remove_project_member(project.id, guest.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(ResourceKind::Membership)));
}

#[tokio::test]
async fn test_delete_project_strict_on_datasets() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;

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

    let err = lifecycle.delete_project(project.id).await.unwrap_err();
    assert!(matches!(err, Error::ChildrenExist(ResourceKind::Project)));

    // Still intact, owner membership included.
    assert!(lifecycle.get_project(project.id).await.is_ok());
    assert_eq!(lifecycle.list_project_members(project.id).await.unwrap().len(), 1);

    lifecycle.delete_dataset(dataset.id).await.unwrap();
    lifecycle.delete_project(project.id).await.unwrap();

    let err = lifecycle.get_project(project.id).await.unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(ResourceKind::Project)));
    assert!(stores
        .project_members
        .list_for_project(project.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_delete_dataset_removes_memberships() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;
    let viewer = add_user(&stores, "u2", SystemRole::User).await;

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
    lifecycle
        .add_dataset_member(dataset.id, viewer.id, DatasetRole::Viewer)
        .await
        .unwrap();

    lifecycle.delete_dataset(dataset.id).await.unwrap();

    // No dangling membership after the resource disappears.
    assert!(stores
        .dataset_members
        .list_for_dataset(dataset.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_deletion_ordering_across_the_tree() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;

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

    let annotated = lifecycle
        .create_image(create_image(dataset.id, "annotated"), payload())
        .await
        .unwrap();
    let empty = lifecycle
        .create_image(create_image(dataset.id, "empty"), payload())
        .await
        .unwrap();
    let object = lifecycle
        .create_image_object(CreateImageObject {
            name: "pedestrian".to_string(),
            image_id: annotated.id,
        })
        .await
        .unwrap();
    lifecycle
        .create_object_point(CreateObjectPoint {
            image_object_id: object.id,
            x: 10.0,
            y: 20.0,
        })
        .await
        .unwrap();

    // The sweep removes only images without objects; the dataset record
    // goes away regardless.
    lifecycle.delete_dataset(dataset.id).await.unwrap();

    assert!(stores.images.find_by_id(annotated.id).await.is_ok());
    assert!(matches!(
        stores.images.find_by_id(empty.id).await.unwrap_err(),
        Error::ResourceNotFound(ResourceKind::Image)
    ));

    // The surviving image still refuses strict deletion...
    let err = lifecycle.delete_image(annotated.id).await.unwrap_err();
    assert!(matches!(err, Error::ChildrenExist(ResourceKind::Image)));

    // ...until its object (and, transitively, the points) are gone.
    lifecycle.delete_image_object(object.id).await.unwrap();
    assert!(stores.object_points.list_by_object(object.id).await.unwrap().is_empty());
    lifecycle.delete_image(annotated.id).await.unwrap();
    assert!(stores.blobs.get(annotated.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_bulk_delete_skip_non_empty() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;

    let project = lifecycle
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: owner.id,
        })
        .await
        .unwrap();
    let full = lifecycle
        .create_dataset(CreateDataset {
            name: "full".to_string(),
            project_id: project.id,
            owner_id: owner.id,
        })
        .await
        .unwrap();
    let empty = lifecycle
        .create_dataset(CreateDataset {
            name: "empty".to_string(),
            project_id: project.id,
            owner_id: owner.id,
        })
        .await
        .unwrap();
    lifecycle
        .create_image(create_image(full.id, "frame"), payload())
        .await
        .unwrap();

    let removed = lifecycle.delete_datasets_in_project(project.id).await.unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id, empty.id);

    // The non-empty dataset is left fully intact, memberships included.
    assert!(lifecycle.get_dataset(full.id).await.is_ok());
    assert_eq!(
        stores.dataset_members.list_for_dataset(full.id).await.unwrap().len(),
        1
    );
    assert!(stores
        .dataset_members
        .list_for_dataset(empty.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_bulk_delete_require_empty() {
    let stores = MemoryStores::stores();
    let lifecycle =
        Lifecycle::new(stores.clone()).with_bulk_policy(BulkDeletePolicy::RequireEmpty);
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;

    let project = lifecycle
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: owner.id,
        })
        .await
        .unwrap();
    let full = lifecycle
        .create_dataset(CreateDataset {
            name: "full".to_string(),
            project_id: project.id,
            owner_id: owner.id,
        })
        .await
        .unwrap();
    let empty = lifecycle
        .create_dataset(CreateDataset {
            name: "empty".to_string(),
            project_id: project.id,
            owner_id: owner.id,
        })
        .await
        .unwrap();
    lifecycle
        .create_image(create_image(full.id, "frame"), payload())
        .await
        .unwrap();

    let err = lifecycle
        .delete_datasets_in_project(project.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ChildrenExist(ResourceKind::Dataset)));

    // Nothing was removed, not even the empty dataset.
    assert!(lifecycle.get_dataset(full.id).await.is_ok());
    assert!(lifecycle.get_dataset(empty.id).await.is_ok());
}

#[tokio::test]
async fn test_clear_dataset_best_effort() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;

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

    let annotated = lifecycle
        .create_image(create_image(dataset.id, "annotated"), payload())
        .await
        .unwrap();
    lifecycle
        .create_image(create_image(dataset.id, "plain"), payload())
        .await
        .unwrap();
    lifecycle
        .create_image_object(CreateImageObject {
            name: "car".to_string(),
            image_id: annotated.id,
        })
        .await
        .unwrap();

    let removed = lifecycle.clear_dataset(dataset.id).await.unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].name, "plain");

    // The dataset survives a clear; only images were touched.
    assert!(lifecycle.get_dataset(dataset.id).await.is_ok());
    assert_eq!(lifecycle.list_images_by_dataset(dataset.id).await.unwrap().len(), 1);
}

/// Project membership store that fails the first insert, for exercising
/// the compensation path.
struct FlakyProjectMembers {
    inner: Arc<dyn ProjectMembershipStore>,
    failed_once: AtomicBool,
}

#[async_trait]
impl ProjectMembershipStore for FlakyProjectMembers {
    async fn find(&self, project_id: Uuid, user_id: Uuid) -> labelbase_core::Result<ProjectMembership> {
        self.inner.find(project_id, user_id).await
    }

    async fn list_for_project(&self, project_id: Uuid) -> labelbase_core::Result<Vec<ProjectMembership>> {
        self.inner.list_for_project(project_id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> labelbase_core::Result<Vec<ProjectMembership>> {
        self.inner.list_for_user(user_id).await
    }

    async fn insert(&self, membership: ProjectMembership) -> labelbase_core::Result<ProjectMembership> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(Error::Infrastructure("write timed out".to_string()));
        }
        self.inner.insert(membership).await
    }

    async fn update_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> labelbase_core::Result<ProjectMembership> {
        self.inner.update_role(project_id, user_id, role).await
    }

    async fn delete(&self, project_id: Uuid, user_id: Uuid) -> labelbase_core::Result<ProjectMembership> {
        self.inner.delete(project_id, user_id).await
    }

    async fn delete_all_for_project(
        &self,
        project_id: Uuid,
    ) -> labelbase_core::Result<Vec<ProjectMembership>> {
        self.inner.delete_all_for_project(project_id).await
    }
}

#[tokio::test]
async fn test_create_project_compensates_and_retries() {
    let mut stores = MemoryStores::stores();
    let flaky = Arc::new(FlakyProjectMembers {
        inner: stores.project_members.clone(),
        failed_once: AtomicBool::new(false),
    });
    stores.project_members = flaky;
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;

    // First attempt: the membership write fails, the half-created project
    // record is compensated away, the failure is reported.
    let err = lifecycle
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: owner.id,
        })
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(lifecycle.list_projects().await.unwrap().is_empty());

    // Retrying the whole operation finishes the work.
    let project = lifecycle
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: owner.id,
        })
        .await
        .unwrap();
    let members = lifecycle.list_project_members(project.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].role, ProjectRole::Owner);
}

/// Blob store that always refuses writes.
struct RefusingBlobs;

#[async_trait]
impl BlobStore for RefusingBlobs {
    async fn put(&self, _image_id: Uuid, _payload: ImagePayload) -> labelbase_core::Result<()> {
        Err(Error::Infrastructure("blob backend unavailable".to_string()))
    }

    async fn get(&self, _image_id: Uuid) -> labelbase_core::Result<Option<ImagePayload>> {
        Ok(None)
    }

    async fn delete(&self, _image_id: Uuid) -> labelbase_core::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_create_image_compensates_on_blob_failure() {
    let mut stores = MemoryStores::stores();
    let lifecycle_setup = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;
    let project = lifecycle_setup
        .create_project(CreateProject {
            name: "alpha".to_string(),
            owner_id: owner.id,
        })
        .await
        .unwrap();
    let dataset = lifecycle_setup
        .create_dataset(CreateDataset {
            name: "d1".to_string(),
            project_id: project.id,
            owner_id: owner.id,
        })
        .await
        .unwrap();

    stores.blobs = Arc::new(RefusingBlobs);
    let lifecycle = Lifecycle::new(stores.clone());

    let err = lifecycle
        .create_image(create_image(dataset.id, "frame"), payload())
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    // No orphaned image record after the failed payload write.
    assert!(lifecycle.list_images_by_dataset(dataset.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_member_details_join_users() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let owner = add_user(&stores, "u1", SystemRole::Researcher).await;
    let labeler = add_user(&stores, "u2", SystemRole::User).await;

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
    lifecycle
        .add_dataset_member(dataset.id, labeler.id, DatasetRole::Labeler)
        .await
        .unwrap();

    let details = lifecycle.list_dataset_member_details(dataset.id).await.unwrap();
    assert_eq!(details.len(), 2);
    let entry = details
        .iter()
        .find(|d| d.membership.user_id == labeler.id)
        .unwrap();
    assert_eq!(entry.user.username, "u2");
    assert_eq!(entry.membership.role, DatasetRole::Labeler);
}

#[tokio::test]
async fn test_full_scenario() {
    let stores = MemoryStores::stores();
    let lifecycle = Lifecycle::new(stores.clone());
    let u1 = add_user(&stores, "u1", SystemRole::Researcher).await;
    let u2 = add_user(&stores, "u2", SystemRole::User).await;

    // Create project "Alpha" owned by U1.
    let alpha = lifecycle
        .create_project(CreateProject {
            name: "Alpha".to_string(),
            owner_id: u1.id,
        })
        .await
        .unwrap();
    assert_eq!(lifecycle.list_projects().await.unwrap().len(), 1);
    let members = lifecycle.list_project_members(alpha.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].role, ProjectRole::Owner);

    // Create dataset "D1" under Alpha owned by U1.
    let d1 = lifecycle
        .create_dataset(CreateDataset {
            name: "D1".to_string(),
            project_id: alpha.id,
            owner_id: u1.id,
        })
        .await
        .unwrap();
    let d1_members = lifecycle.list_dataset_members(d1.id).await.unwrap();
    assert_eq!(d1_members.len(), 1);
    assert_eq!(d1_members[0].role, DatasetRole::Owner);

    // Add U2 to D1 as viewer.
    lifecycle
        .add_dataset_member(d1.id, u2.id, DatasetRole::Viewer)
        .await
        .unwrap();

    // Alpha cannot go while D1 exists.
    let err = lifecycle.delete_project(alpha.id).await.unwrap_err();
    assert!(matches!(err, Error::ChildrenExist(ResourceKind::Project)));

    // Clear D1's images (none exist), delete D1: both memberships gone.
    assert!(lifecycle.clear_dataset(d1.id).await.unwrap().is_empty());
    lifecycle.delete_dataset(d1.id).await.unwrap();
    assert!(stores.dataset_members.list_for_dataset(d1.id).await.unwrap().is_empty());

    // Now Alpha deletes cleanly.
    lifecycle.delete_project(alpha.id).await.unwrap();
    assert!(lifecycle.list_projects().await.unwrap().is_empty());
    assert!(stores
        .project_members
        .list_for_project(alpha.id)
        .await
        .unwrap()
        .is_empty());
}
