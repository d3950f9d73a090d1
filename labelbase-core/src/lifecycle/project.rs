/// Project lifecycle operations
///
/// Creation installs the creator's `owner` membership in the same logical
/// operation; deletion is strict and refuses while any dataset remains.

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, ResourceKind, Result};
use crate::lifecycle::Lifecycle;
use crate::models::{
    CreateProject, Project, ProjectMemberDetails, ProjectMembership, UpdateProject,
};
use crate::roles::ProjectRole;

impl Lifecycle {
    /// Creates a project and its owner membership
    ///
    /// The owner user must exist (`ReferenceNotFound` otherwise). After a
    /// successful return the project has exactly one `owner` membership.
    ///
    /// # Errors
    ///
    /// - `ReferenceNotFound` if the owner user does not exist
    /// - whatever the membership insert failed with, after the freshly
    ///   created record has been compensated away
    pub async fn create_project(&self, input: CreateProject) -> Result<Project> {
        if let Err(e) = self.stores().users.find_by_id(input.owner_id).await {
            return Err(match e {
                Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::User),
                other => other,
            });
        }

        let project = self.stores().projects.insert(input).await?;
        self.ensure_project_owner_link(&project).await?;

        info!(project_id = %project.id, owner_id = %project.owner_id, "project created");
        Ok(project)
    }

    /// Installs the owner membership for a freshly created project
    ///
    /// Idempotent: a link that already exists with the owner role counts as
    /// success, so a retry after a partial failure converges instead of
    /// erroring. Any other failure deletes the project record again before
    /// surfacing.
    async fn ensure_project_owner_link(&self, project: &Project) -> Result<()> {
        let link = ProjectMembership::owner_link(project.id, project.owner_id);
        match self.stores().project_members.insert(link).await {
            Ok(_) => Ok(()),
            Err(Error::AlreadyExists) => {
                let existing = self
                    .stores()
                    .project_members
                    .find(project.id, project.owner_id)
                    .await?;
                if existing.role == ProjectRole::Owner {
                    Ok(())
                } else {
                    Err(Error::AlreadyExists)
                }
            }
            Err(e) => {
                warn!(
                    project_id = %project.id,
                    error = %e,
                    "owner membership failed, compensating project record"
                );
                // Best effort: if the compensation itself fails the retry
                // path above still repairs the pair.
                let _ = self.stores().projects.delete(project.id).await;
                Err(e)
            }
        }
    }

    /// Fetches a project by id
    pub async fn get_project(&self, id: Uuid) -> Result<Project> {
        self.stores().projects.find_by_id(id).await
    }

    /// Lists every project
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.stores().projects.list().await
    }

    /// Lists the projects owned by one user; the user must exist
    pub async fn list_projects_by_owner(&self, owner_id: Uuid) -> Result<Vec<Project>> {
        self.stores().users.find_by_id(owner_id).await?;
        self.stores().projects.list_by_owner(owner_id).await
    }

    /// Updates a project's name and/or owner field
    ///
    /// A new owner id must reference an existing user. Changing the owner
    /// field does not touch memberships, since ownership transfer is not an
    /// in-scope operation.
    pub async fn update_project(&self, id: Uuid, input: UpdateProject) -> Result<Project> {
        self.stores().projects.find_by_id(id).await?;
        if let Some(owner_id) = input.owner_id {
            if let Err(e) = self.stores().users.find_by_id(owner_id).await {
                return Err(match e {
                    Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::User),
                    other => other,
                });
            }
        }
        self.stores().projects.update(id, input).await
    }

    /// Deletes a project, sweeping its memberships first
    ///
    /// Strict: fails with `ChildrenExist` while the project owns any
    /// dataset. There is no force/cascade variant.
    pub async fn delete_project(&self, id: Uuid) -> Result<Project> {
        let project = self.stores().projects.find_by_id(id).await?;

        let datasets = self.stores().datasets.list_by_project(id).await?;
        if !datasets.is_empty() {
            return Err(Error::ChildrenExist(ResourceKind::Project));
        }

        let removed = self.stores().project_members.delete_all_for_project(id).await?;
        let deleted = self.stores().projects.delete(id).await?;

        info!(
            project_id = %project.id,
            memberships_removed = removed.len(),
            "project deleted"
        );
        Ok(deleted)
    }

    /// Adds a user to a project with the requested role
    ///
    /// Both the user and the project must exist; a second membership for
    /// the same pair fails `AlreadyExists` and leaves the original
    /// untouched. Authorization of the caller happens at the API layer.
    pub async fn add_project_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<ProjectMembership> {
        if let Err(e) = self.stores().users.find_by_id(user_id).await {
            return Err(match e {
                Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::User),
                other => other,
            });
        }
        self.stores().projects.find_by_id(project_id).await?;

        let membership = ProjectMembership {
            project_id,
            user_id,
            role,
            created_at: chrono::Utc::now(),
        };
        let inserted = self.stores().project_members.insert(membership).await?;

        info!(project_id = %project_id, user_id = %user_id, role = role.as_str(), "project member added");
        Ok(inserted)
    }

    /// Removes a user from a project
    ///
    /// Owner-tier links fail `OwnerProtected` no matter who asks; the
    /// returned value is the removed link.
    pub async fn remove_project_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<ProjectMembership> {
        let removed = self.stores().project_members.delete(project_id, user_id).await?;
        info!(project_id = %project_id, user_id = %user_id, "project member removed");
        Ok(removed)
    }

    /// Changes a member's role; owner-tier links fail `OwnerProtected`
    pub async fn update_project_member_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<ProjectMembership> {
        self.stores()
            .project_members
            .update_role(project_id, user_id, role)
            .await
    }

    /// Fetches the membership for one (project, user) pair
    pub async fn get_project_membership(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<ProjectMembership> {
        self.stores().projects.find_by_id(project_id).await?;
        self.stores().project_members.find(project_id, user_id).await
    }

    /// Lists the memberships of a project; the project must exist
    pub async fn list_project_members(&self, project_id: Uuid) -> Result<Vec<ProjectMembership>> {
        self.stores().projects.find_by_id(project_id).await?;
        self.stores().project_members.list_for_project(project_id).await
    }

    /// Lists the memberships of a project joined with their user records
    ///
    /// Members whose account has since disappeared are skipped rather than
    /// failing the whole listing.
    pub async fn list_project_member_details(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ProjectMemberDetails>> {
        let memberships = self.list_project_members(project_id).await?;
        let mut details = Vec::with_capacity(memberships.len());
        for membership in memberships {
            match self.stores().users.find_by_id(membership.user_id).await {
                Ok(user) => details.push(ProjectMemberDetails { user, membership }),
                Err(Error::ResourceNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(details)
    }
}
