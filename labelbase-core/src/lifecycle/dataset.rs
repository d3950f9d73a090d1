/// Dataset lifecycle operations
///
/// Creation mirrors project creation (record + owner membership). Deletion
/// of a single dataset is lenient: images still holding objects are
/// skipped, the dataset record itself goes away unconditionally. The bulk
/// per-project sweep is governed by [`crate::lifecycle::BulkDeletePolicy`].

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, ResourceKind, Result};
use crate::lifecycle::{BulkDeletePolicy, Lifecycle};
use crate::models::{
    CreateDataset, Dataset, DatasetMemberDetails, DatasetMembership, UpdateDataset,
};
use crate::roles::DatasetRole;

impl Lifecycle {
    /// Creates a dataset and its owner membership
    ///
    /// Parent project and owner user must exist (`ReferenceNotFound`
    /// otherwise). After a successful return the dataset has exactly one
    /// `owner` membership.
    pub async fn create_dataset(&self, input: CreateDataset) -> Result<Dataset> {
        if let Err(e) = self.stores().projects.find_by_id(input.project_id).await {
            return Err(match e {
                Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::Project),
                other => other,
            });
        }
        if let Err(e) = self.stores().users.find_by_id(input.owner_id).await {
            return Err(match e {
                Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::User),
                other => other,
            });
        }

        let dataset = self.stores().datasets.insert(input).await?;
        self.ensure_dataset_owner_link(&dataset).await?;

        info!(
            dataset_id = %dataset.id,
            project_id = %dataset.project_id,
            owner_id = %dataset.owner_id,
            "dataset created"
        );
        Ok(dataset)
    }

    /// Installs the owner membership for a freshly created dataset
    ///
    /// Same compensation/idempotence contract as the project variant.
    async fn ensure_dataset_owner_link(&self, dataset: &Dataset) -> Result<()> {
        let link = DatasetMembership::owner_link(dataset.id, dataset.owner_id);
        match self.stores().dataset_members.insert(link).await {
            Ok(_) => Ok(()),
            Err(Error::AlreadyExists) => {
                let existing = self
                    .stores()
                    .dataset_members
                    .find(dataset.id, dataset.owner_id)
                    .await?;
                if existing.role == DatasetRole::Owner {
                    Ok(())
                } else {
                    Err(Error::AlreadyExists)
                }
            }
            Err(e) => {
                warn!(
                    dataset_id = %dataset.id,
                    error = %e,
                    "owner membership failed, compensating dataset record"
                );
                let _ = self.stores().datasets.delete(dataset.id).await;
                Err(e)
            }
        }
    }

    /// Fetches a dataset by id
    pub async fn get_dataset(&self, id: Uuid) -> Result<Dataset> {
        self.stores().datasets.find_by_id(id).await
    }

    /// Lists every dataset
    pub async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        self.stores().datasets.list().await
    }

    /// Lists the datasets of one project; the project must exist
    pub async fn list_datasets_by_project(&self, project_id: Uuid) -> Result<Vec<Dataset>> {
        self.stores().projects.find_by_id(project_id).await?;
        self.stores().datasets.list_by_project(project_id).await
    }

    /// Lists datasets owned by one user
    pub async fn list_datasets_by_owner(&self, owner_id: Uuid) -> Result<Vec<Dataset>> {
        self.stores().datasets.list_by_owner(owner_id).await
    }

    /// Lists datasets by display name
    pub async fn list_datasets_by_name(&self, name: &str) -> Result<Vec<Dataset>> {
        self.stores().datasets.list_by_name(name).await
    }

    /// Updates a dataset's name, project, and/or owner field
    ///
    /// Every referenced id is re-validated before writing.
    pub async fn update_dataset(&self, id: Uuid, input: UpdateDataset) -> Result<Dataset> {
        self.stores().datasets.find_by_id(id).await?;
        if let Some(project_id) = input.project_id {
            if let Err(e) = self.stores().projects.find_by_id(project_id).await {
                return Err(match e {
                    Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::Project),
                    other => other,
                });
            }
        }
        if let Some(owner_id) = input.owner_id {
            if let Err(e) = self.stores().users.find_by_id(owner_id).await {
                return Err(match e {
                    Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::User),
                    other => other,
                });
            }
        }
        self.stores().datasets.update(id, input).await
    }

    /// Deletes a dataset with best-effort image cleanup
    ///
    /// Images still holding objects are skipped (their blobs untouched);
    /// all dataset memberships are removed; the dataset record itself is
    /// deleted unconditionally once requested. Skipped images remain
    /// individually deletable afterwards.
    pub async fn delete_dataset(&self, id: Uuid) -> Result<Dataset> {
        self.stores().datasets.find_by_id(id).await?;

        let removed_images = self.delete_images_in_dataset(id).await?;
        let removed_members = self.stores().dataset_members.delete_all_for_dataset(id).await?;
        let deleted = self.stores().datasets.delete(id).await?;

        info!(
            dataset_id = %id,
            images_removed = removed_images.len(),
            memberships_removed = removed_members.len(),
            "dataset deleted"
        );
        Ok(deleted)
    }

    /// Bulk-deletes the datasets of one project according to the policy
    ///
    /// Returns the datasets actually removed. Under
    /// [`BulkDeletePolicy::SkipNonEmpty`] a dataset that still holds images
    /// is left fully intact, record and memberships. Under
    /// [`BulkDeletePolicy::RequireEmpty`] the sweep fails up front with
    /// `ChildrenExist` if any dataset still holds images.
    pub async fn delete_datasets_in_project(&self, project_id: Uuid) -> Result<Vec<Dataset>> {
        self.stores().projects.find_by_id(project_id).await?;
        let datasets = self.stores().datasets.list_by_project(project_id).await?;

        if self.bulk_policy() == BulkDeletePolicy::RequireEmpty {
            for dataset in &datasets {
                let images = self.stores().images.list_by_dataset(dataset.id).await?;
                if !images.is_empty() {
                    return Err(Error::ChildrenExist(ResourceKind::Dataset));
                }
            }
        }

        let mut removed = Vec::new();
        for dataset in datasets {
            let images = self.stores().images.list_by_dataset(dataset.id).await?;
            if !images.is_empty() {
                debug!(dataset_id = %dataset.id, images = images.len(), "bulk delete skipping non-empty dataset");
                continue;
            }
            self.stores()
                .dataset_members
                .delete_all_for_dataset(dataset.id)
                .await?;
            removed.push(self.stores().datasets.delete(dataset.id).await?);
        }

        info!(project_id = %project_id, datasets_removed = removed.len(), "bulk dataset delete finished");
        Ok(removed)
    }

    /// Adds a user to a dataset with the requested role
    pub async fn add_dataset_member(
        &self,
        dataset_id: Uuid,
        user_id: Uuid,
        role: DatasetRole,
    ) -> Result<DatasetMembership> {
        if let Err(e) = self.stores().users.find_by_id(user_id).await {
            return Err(match e {
                Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::User),
                other => other,
            });
        }
        self.stores().datasets.find_by_id(dataset_id).await?;

        let membership = DatasetMembership {
            dataset_id,
            user_id,
            role,
            created_at: chrono::Utc::now(),
        };
        let inserted = self.stores().dataset_members.insert(membership).await?;

        info!(dataset_id = %dataset_id, user_id = %user_id, role = role.as_str(), "dataset member added");
        Ok(inserted)
    }

    /// Removes a user from a dataset
    ///
    /// Owner-tier links fail `OwnerProtected` no matter who asks.
    pub async fn remove_dataset_member(
        &self,
        dataset_id: Uuid,
        user_id: Uuid,
    ) -> Result<DatasetMembership> {
        let removed = self.stores().dataset_members.delete(dataset_id, user_id).await?;
        info!(dataset_id = %dataset_id, user_id = %user_id, "dataset member removed");
        Ok(removed)
    }

    /// Changes a member's role; owner-tier links fail `OwnerProtected`
    pub async fn update_dataset_member_role(
        &self,
        dataset_id: Uuid,
        user_id: Uuid,
        role: DatasetRole,
    ) -> Result<DatasetMembership> {
        self.stores()
            .dataset_members
            .update_role(dataset_id, user_id, role)
            .await
    }

    /// Fetches the membership for one (dataset, user) pair
    pub async fn get_dataset_membership(
        &self,
        dataset_id: Uuid,
        user_id: Uuid,
    ) -> Result<DatasetMembership> {
        self.stores().datasets.find_by_id(dataset_id).await?;
        self.stores().dataset_members.find(dataset_id, user_id).await
    }

    /// Lists the memberships of a dataset; the dataset must exist
    pub async fn list_dataset_members(&self, dataset_id: Uuid) -> Result<Vec<DatasetMembership>> {
        self.stores().datasets.find_by_id(dataset_id).await?;
        self.stores().dataset_members.list_for_dataset(dataset_id).await
    }

    /// Lists the memberships of a dataset joined with their user records
    pub async fn list_dataset_member_details(
        &self,
        dataset_id: Uuid,
    ) -> Result<Vec<DatasetMemberDetails>> {
        let memberships = self.list_dataset_members(dataset_id).await?;
        let mut details = Vec::with_capacity(memberships.len());
        for membership in memberships {
            match self.stores().users.find_by_id(membership.user_id).await {
                Ok(user) => details.push(DatasetMemberDetails { user, membership }),
                Err(Error::ResourceNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(details)
    }
}
