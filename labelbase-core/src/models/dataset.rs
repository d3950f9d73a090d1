/// Dataset record and dataset membership link
///
/// Datasets live under projects and hold the images being labeled. Like
/// projects they are created only through the lifecycle manager, which also
/// inserts the creator's `dataset_owner` membership.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE dataset_role AS ENUM ('owner', 'labeler', 'viewer');
///
/// CREATE TABLE datasets (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     project_id UUID NOT NULL REFERENCES projects(id),
///     owner_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE dataset_memberships (
///     dataset_id UUID NOT NULL REFERENCES datasets(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role dataset_role NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (dataset_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;
use crate::roles::DatasetRole;

/// Dataset record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Dataset {
    /// Unique dataset ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Parent project
    pub project_id: Uuid,

    /// Creating user; also carried in the owner membership
    pub owner_id: Uuid,

    /// Server-assigned creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDataset {
    /// Display name
    pub name: String,

    /// Parent project; must exist
    pub project_id: Uuid,

    /// Owning user; must exist
    pub owner_id: Uuid,
}

/// Input for updating a dataset; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDataset {
    /// New display name
    pub name: Option<String>,

    /// Move the dataset to another project; must exist
    pub project_id: Option<Uuid>,

    /// New owner id; must exist (does not touch memberships)
    pub owner_id: Option<Uuid>,
}

/// Link granting a user a role within one dataset
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DatasetMembership {
    /// Dataset ID
    pub dataset_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the dataset
    pub role: DatasetRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

impl DatasetMembership {
    /// Builds the creator's owner link for a freshly created dataset
    pub fn owner_link(dataset_id: Uuid, user_id: Uuid) -> Self {
        DatasetMembership {
            dataset_id,
            user_id,
            role: DatasetRole::Owner,
            created_at: Utc::now(),
        }
    }
}

/// A membership joined with its user record, for member listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMemberDetails {
    /// The member's account
    pub user: User,

    /// The membership link
    pub membership: DatasetMembership,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_link() {
        let dataset_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let link = DatasetMembership::owner_link(dataset_id, user_id);

        assert_eq!(link.dataset_id, dataset_id);
        assert_eq!(link.user_id, user_id);
        assert_eq!(link.role, DatasetRole::Owner);
        assert!(link.role.is_owner_tier());
    }
}
