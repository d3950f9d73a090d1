/// Domain error taxonomy
///
/// Every core operation returns [`Result<T>`]. The variants split into two
/// families:
///
/// - **Terminal** errors reflect domain state and must be surfaced to the
///   caller verbatim: `ResourceNotFound`, `ReferenceNotFound`,
///   `AlreadyExists`, `OwnerProtected`, `ChildrenExist`, `PermissionDenied`.
///   Retrying them without changing the world is pointless.
/// - **Retryable** errors come from the infrastructure underneath the store
///   adapters (timeouts, lost connections): `Infrastructure`. The core never
///   retries internally; callers back off and retry whole operations.
///
/// # Example
///
/// ```
/// use labelbase_core::error::{Error, ResourceKind};
///
/// let err = Error::ChildrenExist(ResourceKind::Project);
/// assert!(!err.is_retryable());
/// assert_eq!(err.to_string(), "project still has undeleted children");
/// ```

use crate::roles::Capability;

/// Core result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Kinds of addressable resources, used to qualify error variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Project,
    Dataset,
    Image,
    ImageObject,
    ObjectPoint,
    Membership,
}

impl ResourceKind {
    /// Lowercase name for messages and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Project => "project",
            ResourceKind::Dataset => "dataset",
            ResourceKind::Image => "image",
            ResourceKind::ImageObject => "image object",
            ResourceKind::ObjectPoint => "object point",
            ResourceKind::Membership => "membership",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified core error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The directly addressed entity does not exist
    #[error("{0} not found")]
    ResourceNotFound(ResourceKind),

    /// A foreign id referenced during a write (owner user, parent project,
    /// ...) does not exist
    #[error("referenced {0} not found")]
    ReferenceNotFound(ResourceKind),

    /// A membership for the same (user, resource) pair (or another unique
    /// record) is already present; the original is left untouched
    #[error("already exists")]
    AlreadyExists,

    /// Attempt to remove or demote an owner-tier membership
    #[error("owner membership is protected")]
    OwnerProtected,

    /// Deletion blocked because dependent children still exist
    #[error("{0} still has undeleted children")]
    ChildrenExist(ResourceKind),

    /// The authorization resolver denied the operation
    #[error("permission denied: {0} not granted")]
    PermissionDenied(Capability),

    /// Store/collaborator failure (timeout, unavailable); retryable with
    /// backoff by the caller
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl Error {
    /// True only for transient infrastructure failures
    ///
    /// All other variants describe domain state and will fail the same way
    /// on an immediate retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Infrastructure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability_split() {
        assert!(Error::Infrastructure("connection reset".into()).is_retryable());

        assert!(!Error::ResourceNotFound(ResourceKind::Dataset).is_retryable());
        assert!(!Error::ReferenceNotFound(ResourceKind::User).is_retryable());
        assert!(!Error::AlreadyExists.is_retryable());
        assert!(!Error::OwnerProtected.is_retryable());
        assert!(!Error::ChildrenExist(ResourceKind::Image).is_retryable());
        assert!(!Error::PermissionDenied(Capability::DatasetDelete).is_retryable());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::ResourceNotFound(ResourceKind::ImageObject).to_string(),
            "image object not found"
        );
        assert_eq!(
            Error::ReferenceNotFound(ResourceKind::User).to_string(),
            "referenced user not found"
        );
        assert_eq!(
            Error::PermissionDenied(Capability::ImageUpload).to_string(),
            "permission denied: image:upload not granted"
        );
    }
}
