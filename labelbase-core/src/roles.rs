/// Role and capability model
///
/// This module defines the three tiers of roles used for access control:
///
/// 1. **System roles**: attached to the user account itself
/// 2. **Project roles**: granted via a `ProjectMembership`
/// 3. **Dataset roles**: granted via a `DatasetMembership`
///
/// Each role maps to a fixed set of [`Capability`] tokens. The mapping is
/// pure data: every table is an explicit `match` returning a `'static`
/// slice, so there are no runtime initializers and no ordering hazards.
///
/// # Resolution Order
///
/// The [`crate::authz::Authorizer`] consults the most specific grant first
/// (dataset membership), then falls back to the project membership. The two
/// grants are checked independently; a narrow dataset role never shadows a
/// broader project role.
///
/// # Example
///
/// ```
/// use labelbase_core::roles::{Capability, DatasetRole, ProjectRole};
///
/// assert!(ProjectRole::Owner.grants(Capability::DatasetDelete));
/// assert!(DatasetRole::Viewer.grants(Capability::DatasetRead));
/// assert!(!DatasetRole::Viewer.grants(Capability::AnnotationEdit));
/// ```

use serde::{Deserialize, Serialize};

/// An atomic permission token
///
/// Capabilities are scoped: system-scoped tokens are checked against the
/// user's system role, project- and dataset-scoped tokens against the
/// membership chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read user directory entries (system scope)
    UserRead,

    /// Create new projects (system scope)
    ProjectCreate,

    /// Read a project and its metadata
    ProjectRead,

    /// Rename a project or reassign its owner field
    ProjectUpdate,

    /// Delete a project
    ProjectDelete,

    /// Add, remove, or re-role project members
    ProjectManageMembers,

    /// Create datasets under a project
    DatasetCreate,

    /// Read a dataset and list its images
    DatasetRead,

    /// Rename a dataset or move it between projects
    DatasetUpdate,

    /// Delete a dataset
    DatasetDelete,

    /// Add, remove, or re-role dataset members
    DatasetManageMembers,

    /// Upload images into a dataset
    ImageUpload,

    /// Delete images from a dataset
    ImageDelete,

    /// Create, update, or delete image objects and their points
    AnnotationEdit,
}

impl Capability {
    /// Returns the capability in its `scope:action` token form
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::UserRead => "user:read",
            Capability::ProjectCreate => "project:create",
            Capability::ProjectRead => "project:read",
            Capability::ProjectUpdate => "project:update",
            Capability::ProjectDelete => "project:delete",
            Capability::ProjectManageMembers => "project:manage-members",
            Capability::DatasetCreate => "dataset:create",
            Capability::DatasetRead => "dataset:read",
            Capability::DatasetUpdate => "dataset:update",
            Capability::DatasetDelete => "dataset:delete",
            Capability::DatasetManageMembers => "dataset:manage-members",
            Capability::ImageUpload => "image:upload",
            Capability::ImageDelete => "image:delete",
            Capability::AnnotationEdit => "annotation:edit",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// System-wide role attached to a user account
///
/// Every user has exactly one system role at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "system_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    /// Regular account, may be invited into projects and datasets
    User,

    /// Full access to everything; bypasses hierarchy resolution entirely
    Admin,

    /// May create and run their own projects
    Researcher,
}

impl SystemRole {
    /// Converts role to string for display and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::User => "user",
            SystemRole::Admin => "admin",
            SystemRole::Researcher => "researcher",
        }
    }

    /// System-scope capability set for this role
    ///
    /// `Admin` is resolved before any table lookup by the authorizer, but
    /// its set is complete anyway so that direct table consultation gives
    /// the same answer.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            SystemRole::User => &[Capability::UserRead],
            SystemRole::Admin => ALL_CAPABILITIES,
            SystemRole::Researcher => &[Capability::UserRead, Capability::ProjectCreate],
        }
    }

    /// Checks whether this role's capability set contains `capability`
    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// True for the administrator role, which skips hierarchy resolution
    pub fn is_admin(&self) -> bool {
        matches!(self, SystemRole::Admin)
    }
}

/// Role granted by a project membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    /// Project creator tier: full control over the project and every
    /// dataset beneath it
    Owner,

    /// Dataset-editor tier: may create and edit datasets in the project,
    /// but not delete them or manage members
    DatasetEditor,
}

impl ProjectRole {
    /// Converts role to string for display and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "owner",
            ProjectRole::DatasetEditor => "dataset_editor",
        }
    }

    /// Capability set for this role
    ///
    /// The owner tier carries the full dataset-scope set as well; that is
    /// what makes a project owner's grant apply transitively to every
    /// dataset in the project during the authorizer's upward walk.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            ProjectRole::Owner => &[
                Capability::ProjectRead,
                Capability::ProjectUpdate,
                Capability::ProjectDelete,
                Capability::ProjectManageMembers,
                Capability::DatasetCreate,
                Capability::DatasetRead,
                Capability::DatasetUpdate,
                Capability::DatasetDelete,
                Capability::DatasetManageMembers,
                Capability::ImageUpload,
                Capability::ImageDelete,
                Capability::AnnotationEdit,
            ],
            ProjectRole::DatasetEditor => &[
                Capability::ProjectRead,
                Capability::DatasetCreate,
                Capability::DatasetRead,
                Capability::DatasetUpdate,
                Capability::ImageUpload,
                Capability::AnnotationEdit,
            ],
        }
    }

    /// Checks whether this role's capability set contains `capability`
    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Owner-tier memberships cannot be removed while the project exists
    pub fn is_owner_tier(&self) -> bool {
        matches!(self, ProjectRole::Owner)
    }
}

/// Role granted by a dataset membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "dataset_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DatasetRole {
    /// Dataset creator tier: full control over the dataset
    Owner,

    /// Labeler tier: may upload images and edit annotations
    Labeler,

    /// Read-only access to the dataset
    Viewer,
}

impl DatasetRole {
    /// Converts role to string for display and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetRole::Owner => "owner",
            DatasetRole::Labeler => "labeler",
            DatasetRole::Viewer => "viewer",
        }
    }

    /// Capability set for this role
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            DatasetRole::Owner => &[
                Capability::DatasetRead,
                Capability::DatasetUpdate,
                Capability::DatasetDelete,
                Capability::DatasetManageMembers,
                Capability::ImageUpload,
                Capability::ImageDelete,
                Capability::AnnotationEdit,
            ],
            DatasetRole::Labeler => &[
                Capability::DatasetRead,
                Capability::ImageUpload,
                Capability::AnnotationEdit,
            ],
            DatasetRole::Viewer => &[Capability::DatasetRead],
        }
    }

    /// Checks whether this role's capability set contains `capability`
    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Owner-tier memberships cannot be removed while the dataset exists
    pub fn is_owner_tier(&self) -> bool {
        matches!(self, DatasetRole::Owner)
    }
}

/// Every capability, in declaration order
///
/// Used as the administrator's set and by tests that sweep the tables.
pub const ALL_CAPABILITIES: &[Capability] = &[
    Capability::UserRead,
    Capability::ProjectCreate,
    Capability::ProjectRead,
    Capability::ProjectUpdate,
    Capability::ProjectDelete,
    Capability::ProjectManageMembers,
    Capability::DatasetCreate,
    Capability::DatasetRead,
    Capability::DatasetUpdate,
    Capability::DatasetDelete,
    Capability::DatasetManageMembers,
    Capability::ImageUpload,
    Capability::ImageDelete,
    Capability::AnnotationEdit,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_as_str() {
        assert_eq!(Capability::DatasetDelete.as_str(), "dataset:delete");
        assert_eq!(Capability::ProjectManageMembers.as_str(), "project:manage-members");
        assert_eq!(Capability::AnnotationEdit.as_str(), "annotation:edit");
    }

    #[test]
    fn test_admin_grants_everything() {
        for capability in ALL_CAPABILITIES {
            assert!(SystemRole::Admin.grants(*capability));
        }
    }

    #[test]
    fn test_system_role_tables() {
        assert!(SystemRole::User.grants(Capability::UserRead));
        assert!(!SystemRole::User.grants(Capability::ProjectCreate));

        assert!(SystemRole::Researcher.grants(Capability::ProjectCreate));
        assert!(!SystemRole::Researcher.grants(Capability::ProjectDelete));
    }

    #[test]
    fn test_project_owner_covers_dataset_scope() {
        // The upward fallback relies on the owner tier carrying dataset
        // capabilities.
        assert!(ProjectRole::Owner.grants(Capability::DatasetRead));
        assert!(ProjectRole::Owner.grants(Capability::DatasetUpdate));
        assert!(ProjectRole::Owner.grants(Capability::DatasetDelete));
        assert!(ProjectRole::Owner.grants(Capability::ImageUpload));
        assert!(ProjectRole::Owner.grants(Capability::AnnotationEdit));
    }

    #[test]
    fn test_dataset_editor_is_not_empty() {
        // Regression guard: this tier must carry a real working set.
        assert!(ProjectRole::DatasetEditor.grants(Capability::DatasetCreate));
        assert!(ProjectRole::DatasetEditor.grants(Capability::DatasetUpdate));
        assert!(!ProjectRole::DatasetEditor.grants(Capability::DatasetDelete));
        assert!(!ProjectRole::DatasetEditor.grants(Capability::ProjectManageMembers));
    }

    #[test]
    fn test_dataset_role_tables() {
        assert!(DatasetRole::Owner.grants(Capability::DatasetManageMembers));
        assert!(DatasetRole::Owner.grants(Capability::ImageDelete));

        assert!(DatasetRole::Labeler.grants(Capability::AnnotationEdit));
        assert!(DatasetRole::Labeler.grants(Capability::ImageUpload));
        assert!(!DatasetRole::Labeler.grants(Capability::ImageDelete));

        assert!(DatasetRole::Viewer.grants(Capability::DatasetRead));
        assert!(!DatasetRole::Viewer.grants(Capability::DatasetUpdate));
        assert!(!DatasetRole::Viewer.grants(Capability::AnnotationEdit));
    }

    #[test]
    fn test_owner_tier_flags() {
        assert!(ProjectRole::Owner.is_owner_tier());
        assert!(!ProjectRole::DatasetEditor.is_owner_tier());
        assert!(DatasetRole::Owner.is_owner_tier());
        assert!(!DatasetRole::Labeler.is_owner_tier());
        assert!(!DatasetRole::Viewer.is_owner_tier());
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(SystemRole::Admin.as_str(), "admin");
        assert_eq!(ProjectRole::Owner.as_str(), "owner");
        assert_eq!(ProjectRole::DatasetEditor.as_str(), "dataset_editor");
        assert_eq!(DatasetRole::Labeler.as_str(), "labeler");
    }
}
