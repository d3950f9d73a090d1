/// Store adapter contracts
///
/// This module defines the persistence contract the core depends on. The
/// authorization resolver and the lifecycle manager only ever talk to these
/// traits; the concrete engine behind them is an injected dependency.
///
/// # Adapter Contract
///
/// All implementations must:
/// 1. Enforce the duplicate-membership guard atomically: inserting a second
///    membership for an existing (user, resource) pair fails with
///    [`crate::Error::AlreadyExists`] and leaves the original untouched.
/// 2. Refuse `delete` of an owner-tier membership with
///    [`crate::Error::OwnerProtected`]; only `delete_all_for_resource`,
///    used when the resource itself goes away, bypasses that guard.
/// 3. Signal absence of a singular entity with
///    [`crate::Error::ResourceNotFound`]; plural lookups return
///    possibly-empty vectors and never fail for "none found".
/// 4. Map transport failures (timeouts, lost connections) to
///    [`crate::Error::Infrastructure`] so callers can tell retryable from
///    terminal.
///
/// Two implementations ship with the crate:
/// - [`postgres::PgStores`]: production stores on PostgreSQL/sqlx
/// - [`memory::MemoryStores`]: in-process stores for tests and demos
///
/// # Example
///
/// ```no_run
/// use labelbase_core::store::memory::MemoryStores;
///
/// let stores = MemoryStores::stores();
/// // hand `stores` to Lifecycle::new / Authorizer::new
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    CreateDataset, CreateImage, CreateImageObject, CreateObjectPoint, CreateProject, CreateUser,
    Dataset, DatasetMembership, Image, ImageObject, ImagePayload, ObjectPoint, Project,
    ProjectMembership, UpdateDataset, UpdateImageObject, UpdateProject, UpdateUser, User,
};
use crate::roles::{DatasetRole, ProjectRole};

/// User directory operations
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetches a user by id
    async fn find_by_id(&self, id: Uuid) -> Result<User>;

    /// Fetches a user by login name
    async fn find_by_username(&self, username: &str) -> Result<User>;

    /// Fetches a user by email address
    async fn find_by_email(&self, email: &str) -> Result<User>;

    /// Lists every user
    async fn list(&self) -> Result<Vec<User>>;

    /// Inserts a new account; duplicate username/email fails `AlreadyExists`
    async fn insert(&self, input: CreateUser) -> Result<User>;

    /// Applies the non-`None` fields of `input`
    async fn update(&self, id: Uuid, input: UpdateUser) -> Result<User>;

    /// Removes the account record
    async fn delete(&self, id: Uuid) -> Result<User>;
}

/// Project record operations
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Fetches a project by id
    async fn find_by_id(&self, id: Uuid) -> Result<Project>;

    /// Lists every project
    async fn list(&self) -> Result<Vec<Project>>;

    /// Lists projects owned by one user
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Project>>;

    /// Inserts a new project record
    async fn insert(&self, input: CreateProject) -> Result<Project>;

    /// Applies the non-`None` fields of `input`
    async fn update(&self, id: Uuid, input: UpdateProject) -> Result<Project>;

    /// Removes the project record
    async fn delete(&self, id: Uuid) -> Result<Project>;
}

/// Dataset record operations
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Fetches a dataset by id
    async fn find_by_id(&self, id: Uuid) -> Result<Dataset>;

    /// Lists every dataset
    async fn list(&self) -> Result<Vec<Dataset>>;

    /// Lists the datasets of one project
    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<Dataset>>;

    /// Lists datasets owned by one user
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Dataset>>;

    /// Lists datasets by display name
    async fn list_by_name(&self, name: &str) -> Result<Vec<Dataset>>;

    /// Inserts a new dataset record
    async fn insert(&self, input: CreateDataset) -> Result<Dataset>;

    /// Applies the non-`None` fields of `input`
    async fn update(&self, id: Uuid, input: UpdateDataset) -> Result<Dataset>;

    /// Removes the dataset record
    async fn delete(&self, id: Uuid) -> Result<Dataset>;
}

/// Image record operations
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Fetches an image by id
    async fn find_by_id(&self, id: Uuid) -> Result<Image>;

    /// Lists the images of one dataset
    async fn list_by_dataset(&self, dataset_id: Uuid) -> Result<Vec<Image>>;

    /// Lists images tagged with every category in `categories`, optionally
    /// restricted to one dataset
    async fn list_by_categories(
        &self,
        categories: &[String],
        dataset_id: Option<Uuid>,
    ) -> Result<Vec<Image>>;

    /// Inserts a new image record
    async fn insert(&self, input: CreateImage) -> Result<Image>;

    /// Removes the image record
    async fn delete(&self, id: Uuid) -> Result<Image>;
}

/// Image object record operations
#[async_trait]
pub trait ImageObjectStore: Send + Sync {
    /// Fetches an object by id
    async fn find_by_id(&self, id: Uuid) -> Result<ImageObject>;

    /// Lists the objects of one image
    async fn list_by_image(&self, image_id: Uuid) -> Result<Vec<ImageObject>>;

    /// Inserts a new object record
    async fn insert(&self, input: CreateImageObject) -> Result<ImageObject>;

    /// Applies the non-`None` fields of `input`
    async fn update(&self, id: Uuid, input: UpdateImageObject) -> Result<ImageObject>;

    /// Removes the object record
    async fn delete(&self, id: Uuid) -> Result<ImageObject>;
}

/// Object point record operations
#[async_trait]
pub trait ObjectPointStore: Send + Sync {
    /// Fetches a point by id
    async fn find_by_id(&self, id: Uuid) -> Result<ObjectPoint>;

    /// Lists the points of one object
    async fn list_by_object(&self, image_object_id: Uuid) -> Result<Vec<ObjectPoint>>;

    /// Inserts a new point record
    async fn insert(&self, input: CreateObjectPoint) -> Result<ObjectPoint>;

    /// Removes the point record
    async fn delete(&self, id: Uuid) -> Result<ObjectPoint>;

    /// Removes every point of one object, returning the removed records
    async fn delete_all_by_object(&self, image_object_id: Uuid) -> Result<Vec<ObjectPoint>>;
}

/// Project membership link operations
#[async_trait]
pub trait ProjectMembershipStore: Send + Sync {
    /// Fetches the link for one (project, user) pair
    async fn find(&self, project_id: Uuid, user_id: Uuid) -> Result<ProjectMembership>;

    /// Lists every link of one project
    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ProjectMembership>>;

    /// Lists every link of one user
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ProjectMembership>>;

    /// Inserts a link; a second link for the same pair fails `AlreadyExists`
    async fn insert(&self, membership: ProjectMembership) -> Result<ProjectMembership>;

    /// Changes the role of an existing link
    async fn update_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<ProjectMembership>;

    /// Removes a link; owner-tier links fail `OwnerProtected`
    async fn delete(&self, project_id: Uuid, user_id: Uuid) -> Result<ProjectMembership>;

    /// Removes every link of one project, owner included; used only while
    /// the project itself is being deleted
    async fn delete_all_for_project(&self, project_id: Uuid) -> Result<Vec<ProjectMembership>>;
}

/// Dataset membership link operations
#[async_trait]
pub trait DatasetMembershipStore: Send + Sync {
    /// Fetches the link for one (dataset, user) pair
    async fn find(&self, dataset_id: Uuid, user_id: Uuid) -> Result<DatasetMembership>;

    /// Lists every link of one dataset
    async fn list_for_dataset(&self, dataset_id: Uuid) -> Result<Vec<DatasetMembership>>;

    /// Lists every link of one user
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<DatasetMembership>>;

    /// Inserts a link; a second link for the same pair fails `AlreadyExists`
    async fn insert(&self, membership: DatasetMembership) -> Result<DatasetMembership>;

    /// Changes the role of an existing link
    async fn update_role(
        &self,
        dataset_id: Uuid,
        user_id: Uuid,
        role: DatasetRole,
    ) -> Result<DatasetMembership>;

    /// Removes a link; owner-tier links fail `OwnerProtected`
    async fn delete(&self, dataset_id: Uuid, user_id: Uuid) -> Result<DatasetMembership>;

    /// Removes every link of one dataset, owner included; used only while
    /// the dataset itself is being deleted
    async fn delete_all_for_dataset(&self, dataset_id: Uuid) -> Result<Vec<DatasetMembership>>;
}

/// Raw image payload storage
///
/// Filename, content type, and byte length are preserved through a
/// put/get round-trip.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the payload for an image, replacing any previous one
    async fn put(&self, image_id: Uuid, payload: ImagePayload) -> Result<()>;

    /// Fetches the payload for an image; `Ok(None)` when none was stored
    async fn get(&self, image_id: Uuid) -> Result<Option<ImagePayload>>;

    /// Removes the payload for an image; absent payloads are a no-op
    async fn delete(&self, image_id: Uuid) -> Result<()>;
}

/// The full bundle of store adapters the core operates on
///
/// Cheap to clone; every field is an `Arc`. Production code builds one via
/// [`postgres::PgStores::stores`], tests via [`memory::MemoryStores::stores`].
#[derive(Clone)]
pub struct Stores {
    /// User directory
    pub users: Arc<dyn UserStore>,

    /// Project records
    pub projects: Arc<dyn ProjectStore>,

    /// Dataset records
    pub datasets: Arc<dyn DatasetStore>,

    /// Image records
    pub images: Arc<dyn ImageStore>,

    /// Image object records
    pub image_objects: Arc<dyn ImageObjectStore>,

    /// Object point records
    pub object_points: Arc<dyn ObjectPointStore>,

    /// Project membership links
    pub project_members: Arc<dyn ProjectMembershipStore>,

    /// Dataset membership links
    pub dataset_members: Arc<dyn DatasetMembershipStore>,

    /// Raw image payloads
    pub blobs: Arc<dyn BlobStore>,
}
