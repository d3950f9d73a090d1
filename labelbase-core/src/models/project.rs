/// Project record and project membership link
///
/// Projects are the top of the resource hierarchy below the system scope.
/// They are only ever created through the lifecycle manager, which also
/// inserts the creator's `project_owner` membership in the same logical
/// operation.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('owner', 'dataset_editor');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE project_memberships (
///     project_id UUID NOT NULL REFERENCES projects(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role project_role NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// The composite primary key is the duplicate-membership guard: at most one
/// membership per (user, project) pair, enforced by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;
use crate::roles::ProjectRole;

/// Project record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Creating user; also carried in the owner membership
    pub owner_id: Uuid,

    /// Server-assigned creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    /// Display name
    pub name: String,

    /// Owning user; must exist
    pub owner_id: Uuid,
}

/// Input for updating a project; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    /// New display name
    pub name: Option<String>,

    /// New owner id; must exist (does not touch memberships)
    pub owner_id: Option<Uuid>,
}

/// Link granting a user a role within one project
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMembership {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the project
    pub role: ProjectRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

impl ProjectMembership {
    /// Builds the creator's owner link for a freshly created project
    pub fn owner_link(project_id: Uuid, user_id: Uuid) -> Self {
        ProjectMembership {
            project_id,
            user_id,
            role: ProjectRole::Owner,
            created_at: Utc::now(),
        }
    }
}

/// A membership joined with its user record, for member listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMemberDetails {
    /// The member's account
    pub user: User,

    /// The membership link
    pub membership: ProjectMembership,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_link() {
        let project_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let link = ProjectMembership::owner_link(project_id, user_id);

        assert_eq!(link.project_id, project_id);
        assert_eq!(link.user_id, user_id);
        assert_eq!(link.role, ProjectRole::Owner);
        assert!(link.role.is_owner_tier());
    }
}
