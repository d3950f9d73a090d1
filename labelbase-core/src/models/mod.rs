/// Domain records for Labelbase
///
/// This module contains the entity records persisted by the store adapters
/// together with their `Create*`/`Update*` input records. Records are plain
/// data: all reads and writes go through the traits in [`crate::store`].
///
/// # Hierarchy
///
/// ```text
/// User ──(system role)
/// Project ──< Dataset ──< Image ──< ImageObject ──< ObjectPoint
///    │            │
///    └ ProjectMembership (user, project, role)
///                 └ DatasetMembership (user, dataset, role)
/// ```

pub mod dataset;
pub mod image;
pub mod project;
pub mod user;

pub use dataset::{CreateDataset, Dataset, DatasetMemberDetails, DatasetMembership, UpdateDataset};
pub use image::{
    CreateImage, CreateImageObject, CreateObjectPoint, Image, ImageObject, ImagePayload,
    ObjectPoint, UpdateImageObject,
};
pub use project::{
    CreateProject, Project, ProjectMemberDetails, ProjectMembership, UpdateProject,
};
pub use user::{CreateUser, UpdateUser, User};
