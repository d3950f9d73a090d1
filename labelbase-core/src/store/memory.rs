/// In-memory store implementation for tests and demos
///
/// One [`MemoryStores`] value implements every adapter trait in
/// [`crate::store`] on top of plain hash maps behind a mutex. It honors the
/// full contract (duplicate-membership guard, owner protection, not-found
/// signaling) so the lifecycle and authorization suites can run without a
/// database.
///
/// # Example
///
/// ```
/// use labelbase_core::store::memory::MemoryStores;
///
/// let stores = MemoryStores::stores();
/// assert!(std::sync::Arc::strong_count(&stores.users) >= 1);
/// ```

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{Error, ResourceKind, Result};
use crate::models::{
    CreateDataset, CreateImage, CreateImageObject, CreateObjectPoint, CreateProject, CreateUser,
    Dataset, DatasetMembership, Image, ImageObject, ImagePayload, ObjectPoint, Project,
    ProjectMembership, UpdateDataset, UpdateImageObject, UpdateProject, UpdateUser, User,
};
use crate::roles::{DatasetRole, ProjectRole};
use crate::store::{
    BlobStore, DatasetMembershipStore, DatasetStore, ImageObjectStore, ImageStore,
    ObjectPointStore, ProjectMembershipStore, ProjectStore, Stores, UserStore,
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    datasets: HashMap<Uuid, Dataset>,
    images: HashMap<Uuid, Image>,
    image_objects: HashMap<Uuid, ImageObject>,
    object_points: HashMap<Uuid, ObjectPoint>,
    project_members: HashMap<(Uuid, Uuid), ProjectMembership>,
    dataset_members: HashMap<(Uuid, Uuid), DatasetMembership>,
    blobs: HashMap<Uuid, ImagePayload>,
}

/// In-process implementation of every store adapter
#[derive(Default)]
pub struct MemoryStores {
    inner: Mutex<Inner>,
}

impl MemoryStores {
    /// Creates an empty store set
    pub fn new() -> Self {
        MemoryStores::default()
    }

    /// Builds a [`Stores`] bundle backed by one shared in-memory state
    pub fn stores() -> Stores {
        let shared = Arc::new(MemoryStores::new());
        Stores {
            users: shared.clone(),
            projects: shared.clone(),
            datasets: shared.clone(),
            images: shared.clone(),
            image_objects: shared.clone(),
            object_points: shared.clone(),
            project_members: shared.clone(),
            dataset_members: shared.clone(),
            blobs: shared,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Infrastructure("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for MemoryStores {
    async fn find_by_id(&self, id: Uuid) -> Result<User> {
        let inner = self.lock()?;
        inner
            .users
            .get(&id)
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::User))
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        let inner = self.lock()?;
        inner
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::User))
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let inner = self.lock()?;
        inner
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::User))
    }

    async fn list(&self) -> Result<Vec<User>> {
        let inner = self.lock()?;
        Ok(inner.users.values().cloned().collect())
    }

    async fn insert(&self, input: CreateUser) -> Result<User> {
        let mut inner = self.lock()?;
        if inner
            .users
            .values()
            .any(|u| u.username == input.username || u.email == input.email)
        {
            return Err(Error::AlreadyExists);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            password_hash: input.password_hash,
            system_role: input.system_role,
            active: true,
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> Result<User> {
        let mut inner = self.lock()?;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or(Error::ResourceNotFound(ResourceKind::User))?;
        if let Some(username) = input.username {
            user.username = username;
        }
        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(password_hash) = input.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(system_role) = input.system_role {
            user.system_role = system_role;
        }
        if let Some(active) = input.active {
            user.active = active;
        }
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<User> {
        let mut inner = self.lock()?;
        inner
            .users
            .remove(&id)
            .ok_or(Error::ResourceNotFound(ResourceKind::User))
    }
}

#[async_trait]
impl ProjectStore for MemoryStores {
    async fn find_by_id(&self, id: Uuid) -> Result<Project> {
        let inner = self.lock()?;
        inner
            .projects
            .get(&id)
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::Project))
    }

    async fn list(&self) -> Result<Vec<Project>> {
        let inner = self.lock()?;
        Ok(inner.projects.values().cloned().collect())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Project>> {
        let inner = self.lock()?;
        Ok(inner
            .projects
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, input: CreateProject) -> Result<Project> {
        let mut inner = self.lock()?;
        let project = Project {
            id: Uuid::new_v4(),
            name: input.name,
            owner_id: input.owner_id,
            created_at: Utc::now(),
        };
        inner.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn update(&self, id: Uuid, input: UpdateProject) -> Result<Project> {
        let mut inner = self.lock()?;
        let project = inner
            .projects
            .get_mut(&id)
            .ok_or(Error::ResourceNotFound(ResourceKind::Project))?;
        if let Some(name) = input.name {
            project.name = name;
        }
        if let Some(owner_id) = input.owner_id {
            project.owner_id = owner_id;
        }
        Ok(project.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<Project> {
        let mut inner = self.lock()?;
        inner
            .projects
            .remove(&id)
            .ok_or(Error::ResourceNotFound(ResourceKind::Project))
    }
}

#[async_trait]
impl DatasetStore for MemoryStores {
    async fn find_by_id(&self, id: Uuid) -> Result<Dataset> {
        let inner = self.lock()?;
        inner
            .datasets
            .get(&id)
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::Dataset))
    }

    async fn list(&self) -> Result<Vec<Dataset>> {
        let inner = self.lock()?;
        Ok(inner.datasets.values().cloned().collect())
    }

    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<Dataset>> {
        let inner = self.lock()?;
        Ok(inner
            .datasets
            .values()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Dataset>> {
        let inner = self.lock()?;
        Ok(inner
            .datasets
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_by_name(&self, name: &str) -> Result<Vec<Dataset>> {
        let inner = self.lock()?;
        Ok(inner
            .datasets
            .values()
            .filter(|d| d.name == name)
            .cloned()
            .collect())
    }

    async fn insert(&self, input: CreateDataset) -> Result<Dataset> {
        let mut inner = self.lock()?;
        let dataset = Dataset {
            id: Uuid::new_v4(),
            name: input.name,
            project_id: input.project_id,
            owner_id: input.owner_id,
            created_at: Utc::now(),
        };
        inner.datasets.insert(dataset.id, dataset.clone());
        Ok(dataset)
    }

    async fn update(&self, id: Uuid, input: UpdateDataset) -> Result<Dataset> {
        let mut inner = self.lock()?;
        let dataset = inner
            .datasets
            .get_mut(&id)
            .ok_or(Error::ResourceNotFound(ResourceKind::Dataset))?;
        if let Some(name) = input.name {
            dataset.name = name;
        }
        if let Some(project_id) = input.project_id {
            dataset.project_id = project_id;
        }
        if let Some(owner_id) = input.owner_id {
            dataset.owner_id = owner_id;
        }
        Ok(dataset.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<Dataset> {
        let mut inner = self.lock()?;
        inner
            .datasets
            .remove(&id)
            .ok_or(Error::ResourceNotFound(ResourceKind::Dataset))
    }
}

#[async_trait]
impl ImageStore for MemoryStores {
    async fn find_by_id(&self, id: Uuid) -> Result<Image> {
        let inner = self.lock()?;
        inner
            .images
            .get(&id)
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::Image))
    }

    async fn list_by_dataset(&self, dataset_id: Uuid) -> Result<Vec<Image>> {
        let inner = self.lock()?;
        Ok(inner
            .images
            .values()
            .filter(|i| i.dataset_id == dataset_id)
            .cloned()
            .collect())
    }

    async fn list_by_categories(
        &self,
        categories: &[String],
        dataset_id: Option<Uuid>,
    ) -> Result<Vec<Image>> {
        let inner = self.lock()?;
        Ok(inner
            .images
            .values()
            .filter(|i| dataset_id.map_or(true, |d| i.dataset_id == d))
            .filter(|i| categories.iter().all(|c| i.categories.contains(c)))
            .cloned()
            .collect())
    }

    async fn insert(&self, input: CreateImage) -> Result<Image> {
        let mut inner = self.lock()?;
        let image = Image {
            id: Uuid::new_v4(),
            name: input.name,
            format: input.format,
            dataset_id: input.dataset_id,
            categories: input.categories,
            created_at: Utc::now(),
        };
        inner.images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn delete(&self, id: Uuid) -> Result<Image> {
        let mut inner = self.lock()?;
        inner
            .images
            .remove(&id)
            .ok_or(Error::ResourceNotFound(ResourceKind::Image))
    }
}

#[async_trait]
impl ImageObjectStore for MemoryStores {
    async fn find_by_id(&self, id: Uuid) -> Result<ImageObject> {
        let inner = self.lock()?;
        inner
            .image_objects
            .get(&id)
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::ImageObject))
    }

    async fn list_by_image(&self, image_id: Uuid) -> Result<Vec<ImageObject>> {
        let inner = self.lock()?;
        Ok(inner
            .image_objects
            .values()
            .filter(|o| o.image_id == image_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, input: CreateImageObject) -> Result<ImageObject> {
        let mut inner = self.lock()?;
        let object = ImageObject {
            id: Uuid::new_v4(),
            name: input.name,
            image_id: input.image_id,
        };
        inner.image_objects.insert(object.id, object.clone());
        Ok(object)
    }

    async fn update(&self, id: Uuid, input: UpdateImageObject) -> Result<ImageObject> {
        let mut inner = self.lock()?;
        let object = inner
            .image_objects
            .get_mut(&id)
            .ok_or(Error::ResourceNotFound(ResourceKind::ImageObject))?;
        if let Some(name) = input.name {
            object.name = name;
        }
        if let Some(image_id) = input.image_id {
            object.image_id = image_id;
        }
        Ok(object.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<ImageObject> {
        let mut inner = self.lock()?;
        inner
            .image_objects
            .remove(&id)
            .ok_or(Error::ResourceNotFound(ResourceKind::ImageObject))
    }
}

#[async_trait]
impl ObjectPointStore for MemoryStores {
    async fn find_by_id(&self, id: Uuid) -> Result<ObjectPoint> {
        let inner = self.lock()?;
        inner
            .object_points
            .get(&id)
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::ObjectPoint))
    }

    async fn list_by_object(&self, image_object_id: Uuid) -> Result<Vec<ObjectPoint>> {
        let inner = self.lock()?;
        Ok(inner
            .object_points
            .values()
            .filter(|p| p.image_object_id == image_object_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, input: CreateObjectPoint) -> Result<ObjectPoint> {
        let mut inner = self.lock()?;
        let point = ObjectPoint {
            id: Uuid::new_v4(),
            image_object_id: input.image_object_id,
            x: input.x,
            y: input.y,
        };
        inner.object_points.insert(point.id, point.clone());
        Ok(point)
    }

    async fn delete(&self, id: Uuid) -> Result<ObjectPoint> {
        let mut inner = self.lock()?;
        inner
            .object_points
            .remove(&id)
            .ok_or(Error::ResourceNotFound(ResourceKind::ObjectPoint))
    }

    async fn delete_all_by_object(&self, image_object_id: Uuid) -> Result<Vec<ObjectPoint>> {
        let mut inner = self.lock()?;
        let ids: Vec<Uuid> = inner
            .object_points
            .values()
            .filter(|p| p.image_object_id == image_object_id)
            .map(|p| p.id)
            .collect();
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(point) = inner.object_points.remove(&id) {
                removed.push(point);
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl ProjectMembershipStore for MemoryStores {
    async fn find(&self, project_id: Uuid, user_id: Uuid) -> Result<ProjectMembership> {
        let inner = self.lock()?;
        inner
            .project_members
            .get(&(project_id, user_id))
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::Membership))
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ProjectMembership>> {
        let inner = self.lock()?;
        Ok(inner
            .project_members
            .values()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ProjectMembership>> {
        let inner = self.lock()?;
        Ok(inner
            .project_members
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, membership: ProjectMembership) -> Result<ProjectMembership> {
        let mut inner = self.lock()?;
        let key = (membership.project_id, membership.user_id);
        if inner.project_members.contains_key(&key) {
            return Err(Error::AlreadyExists);
        }
        inner.project_members.insert(key, membership.clone());
        Ok(membership)
    }

    async fn update_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<ProjectMembership> {
        let mut inner = self.lock()?;
        let membership = inner
            .project_members
            .get_mut(&(project_id, user_id))
            .ok_or(Error::ResourceNotFound(ResourceKind::Membership))?;
        if membership.role.is_owner_tier() {
            return Err(Error::OwnerProtected);
        }
        membership.role = role;
        Ok(membership.clone())
    }

    async fn delete(&self, project_id: Uuid, user_id: Uuid) -> Result<ProjectMembership> {
        let mut inner = self.lock()?;
        let key = (project_id, user_id);
        let membership = inner
            .project_members
            .get(&key)
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::Membership))?;
        if membership.role.is_owner_tier() {
            return Err(Error::OwnerProtected);
        }
        inner.project_members.remove(&key);
        Ok(membership)
    }

    async fn delete_all_for_project(&self, project_id: Uuid) -> Result<Vec<ProjectMembership>> {
        let mut inner = self.lock()?;
        let keys: Vec<(Uuid, Uuid)> = inner
            .project_members
            .keys()
            .filter(|(p, _)| *p == project_id)
            .cloned()
            .collect();
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(membership) = inner.project_members.remove(&key) {
                removed.push(membership);
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl DatasetMembershipStore for MemoryStores {
    async fn find(&self, dataset_id: Uuid, user_id: Uuid) -> Result<DatasetMembership> {
        let inner = self.lock()?;
        inner
            .dataset_members
            .get(&(dataset_id, user_id))
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::Membership))
    }

    async fn list_for_dataset(&self, dataset_id: Uuid) -> Result<Vec<DatasetMembership>> {
        let inner = self.lock()?;
        Ok(inner
            .dataset_members
            .values()
            .filter(|m| m.dataset_id == dataset_id)
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<DatasetMembership>> {
        let inner = self.lock()?;
        Ok(inner
            .dataset_members
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, membership: DatasetMembership) -> Result<DatasetMembership> {
        let mut inner = self.lock()?;
        let key = (membership.dataset_id, membership.user_id);
        if inner.dataset_members.contains_key(&key) {
            return Err(Error::AlreadyExists);
        }
        inner.dataset_members.insert(key, membership.clone());
        Ok(membership)
    }

    async fn update_role(
        &self,
        dataset_id: Uuid,
        user_id: Uuid,
        role: DatasetRole,
    ) -> Result<DatasetMembership> {
        let mut inner = self.lock()?;
        let membership = inner
            .dataset_members
            .get_mut(&(dataset_id, user_id))
            .ok_or(Error::ResourceNotFound(ResourceKind::Membership))?;
        if membership.role.is_owner_tier() {
            return Err(Error::OwnerProtected);
        }
        membership.role = role;
        Ok(membership.clone())
    }

    async fn delete(&self, dataset_id: Uuid, user_id: Uuid) -> Result<DatasetMembership> {
        let mut inner = self.lock()?;
        let key = (dataset_id, user_id);
        let membership = inner
            .dataset_members
            .get(&key)
            .cloned()
            .ok_or(Error::ResourceNotFound(ResourceKind::Membership))?;
        if membership.role.is_owner_tier() {
            return Err(Error::OwnerProtected);
        }
        inner.dataset_members.remove(&key);
        Ok(membership)
    }

    async fn delete_all_for_dataset(&self, dataset_id: Uuid) -> Result<Vec<DatasetMembership>> {
        let mut inner = self.lock()?;
        let keys: Vec<(Uuid, Uuid)> = inner
            .dataset_members
            .keys()
            .filter(|(d, _)| *d == dataset_id)
            .cloned()
            .collect();
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(membership) = inner.dataset_members.remove(&key) {
                removed.push(membership);
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl BlobStore for MemoryStores {
    async fn put(&self, image_id: Uuid, payload: ImagePayload) -> Result<()> {
        let mut inner = self.lock()?;
        inner.blobs.insert(image_id, payload);
        Ok(())
    }

    async fn get(&self, image_id: Uuid) -> Result<Option<ImagePayload>> {
        let inner = self.lock()?;
        Ok(inner.blobs.get(&image_id).cloned())
    }

    async fn delete(&self, image_id: Uuid) -> Result<()> {
        let mut inner = self.lock()?;
        inner.blobs.remove(&image_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::SystemRole;
    use bytes::Bytes;

    fn create_user(name: &str) -> CreateUser {
        CreateUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "$argon2id$stub".to_string(),
            system_role: SystemRole::User,
        }
    }

    #[tokio::test]
    async fn test_duplicate_membership_rejected() {
        let stores = MemoryStores::stores();
        let project_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let first = ProjectMembership::owner_link(project_id, user_id);
        stores.project_members.insert(first.clone()).await.unwrap();

        let second = ProjectMembership {
            role: ProjectRole::DatasetEditor,
            ..first
        };
        let err = stores.project_members.insert(second).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));

        // Original untouched
        let kept = stores.project_members.find(project_id, user_id).await.unwrap();
        assert_eq!(kept.role, ProjectRole::Owner);
    }

    #[tokio::test]
    async fn test_owner_protected_delete() {
        let stores = MemoryStores::stores();
        let dataset_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        stores
            .dataset_members
            .insert(DatasetMembership::owner_link(dataset_id, user_id))
            .await
            .unwrap();

        let err = stores.dataset_members.delete(dataset_id, user_id).await.unwrap_err();
        assert!(matches!(err, Error::OwnerProtected));

        // Bulk cleanup bypasses the guard
        let removed = stores
            .dataset_members
            .delete_all_for_dataset(dataset_id)
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
    }

    #[tokio::test]
    async fn test_unique_username_and_email() {
        let stores = MemoryStores::stores();
        stores.users.insert(create_user("ada")).await.unwrap();

        let err = stores.users.insert(create_user("ada")).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
    }

    #[tokio::test]
    async fn test_blob_roundtrip() {
        let stores = MemoryStores::stores();
        let image_id = Uuid::new_v4();
        let payload = ImagePayload {
            filename: "frame.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG"),
        };

        stores.blobs.put(image_id, payload.clone()).await.unwrap();
        let fetched = stores.blobs.get(image_id).await.unwrap().unwrap();
        assert_eq!(fetched, payload);

        stores.blobs.delete(image_id).await.unwrap();
        assert!(stores.blobs.get(image_id).await.unwrap().is_none());

        // Deleting an absent blob is a no-op
        stores.blobs.delete(image_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_category_filter_is_conjunctive() {
        let stores = MemoryStores::stores();
        let dataset_id = Uuid::new_v4();

        stores
            .images
            .insert(CreateImage {
                name: "a".to_string(),
                format: "png".to_string(),
                dataset_id,
                categories: vec!["nature".to_string(), "panorama".to_string()],
            })
            .await
            .unwrap();
        stores
            .images
            .insert(CreateImage {
                name: "b".to_string(),
                format: "png".to_string(),
                dataset_id,
                categories: vec!["nature".to_string()],
            })
            .await
            .unwrap();

        let both = vec!["nature".to_string(), "panorama".to_string()];
        let hits = stores.images.list_by_categories(&both, Some(dataset_id)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "a");
    }
}
