/// Lifecycle manager
///
/// Orchestrates every mutating operation on the resource hierarchy:
/// creation together with the owner membership link, membership
/// management, and order-dependent deletion with membership cleanup.
///
/// # Layering
///
/// The lifecycle manager depends on the store adapters only. It performs no
/// authorization itself: the API layer asks the
/// [`crate::authz::Authorizer`] first and then calls in, so nothing here
/// depends back on either of them.
///
/// # Partial Failure
///
/// Cross-record sequences (create resource + create owner membership,
/// delete resource + delete its memberships) are not wrapped in a
/// transaction. Instead:
///
/// - creation compensates: when the owner-membership insert fails for any
///   reason other than the link already being in place, the freshly
///   created record is deleted again and the failure surfaced;
/// - deletion sweeps subordinate records first and removes the resource
///   record last, so a failed attempt is finished by simply retrying it.
///
/// Either way a partial failure is always reported, never swallowed.
///
/// # Example
///
/// ```no_run
/// use labelbase_core::lifecycle::Lifecycle;
/// use labelbase_core::models::CreateProject;
/// use labelbase_core::store::memory::MemoryStores;
/// # use uuid::Uuid;
///
/// # async fn example(owner_id: Uuid) -> labelbase_core::Result<()> {
/// let lifecycle = Lifecycle::new(MemoryStores::stores());
/// let project = lifecycle
///     .create_project(CreateProject { name: "alpha".into(), owner_id })
///     .await?;
/// # Ok(())
/// # }
/// ```

mod dataset;
mod image;
mod project;

use serde::{Deserialize, Serialize};

use crate::store::Stores;

/// Policy for the bulk "delete all datasets in a project" sweep
///
/// The single-resource deletes have fixed semantics (strict for projects
/// and images, lenient for datasets); only the bulk sweep is configurable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkDeletePolicy {
    /// Datasets that still hold images are left fully intact, record and
    /// memberships both; only empty datasets are removed
    #[default]
    SkipNonEmpty,

    /// The sweep fails with `ChildrenExist` up front if any dataset in the
    /// project still holds images
    RequireEmpty,
}

/// Orchestrator for creation, membership, and deletion
#[derive(Clone)]
pub struct Lifecycle {
    stores: Stores,
    bulk_policy: BulkDeletePolicy,
}

impl Lifecycle {
    /// Creates a manager with the default (lenient) bulk-delete policy
    pub fn new(stores: Stores) -> Self {
        Lifecycle {
            stores,
            bulk_policy: BulkDeletePolicy::default(),
        }
    }

    /// Overrides the bulk-delete policy
    pub fn with_bulk_policy(mut self, policy: BulkDeletePolicy) -> Self {
        self.bulk_policy = policy;
        self
    }

    /// The configured bulk-delete policy
    pub fn bulk_policy(&self) -> BulkDeletePolicy {
        self.bulk_policy
    }

    pub(crate) fn stores(&self) -> &Stores {
        &self.stores
    }
}
