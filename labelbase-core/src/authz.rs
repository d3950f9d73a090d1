/// Authorization resolver
///
/// Decides "may user U perform capability C on resource R" by walking the
/// membership hierarchy from the most specific scope upward:
///
/// 1. `admin` system role → allow, no lookups.
/// 2. Image/object/point targets resolve upward to their owning dataset.
/// 3. Dataset scope: the user's dataset membership is consulted first; if
///    its role grants the capability, allow.
/// 4. Otherwise the dataset's project membership is consulted as a
///    fallback. The two grants are checked independently and never merged:
///    a `viewer` role on the dataset does not downgrade an `owner` role on
///    the project, and vice versa; either grant suffices.
/// 5. Project scope: only the project membership applies; there is nothing
///    above it but the system role.
///
/// A broken resolution chain (the dataset is gone, the dataset's project is
/// gone, ...) surfaces as [`Error::ResourceNotFound`], distinct from
/// [`Error::PermissionDenied`], so callers can tell "missing" from "not
/// allowed".
///
/// Checks are read-only and side-effect-free. The acting user is always an
/// explicit parameter.
///
/// # Example
///
/// ```no_run
/// use labelbase_core::authz::Authorizer;
/// use labelbase_core::error::ResourceKind;
/// use labelbase_core::roles::Capability;
/// use labelbase_core::store::memory::MemoryStores;
/// # use labelbase_core::models::User;
///
/// # async fn example(user: &User, dataset_id: uuid::Uuid) -> labelbase_core::Result<()> {
/// let authz = Authorizer::new(MemoryStores::stores());
/// authz
///     .authorize(user, ResourceKind::Dataset, dataset_id, Capability::DatasetRead)
///     .await?;
/// # Ok(())
/// # }
/// ```

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, ResourceKind, Result};
use crate::models::User;
use crate::roles::Capability;
use crate::store::Stores;

/// Read-only capability resolver over the membership hierarchy
#[derive(Clone)]
pub struct Authorizer {
    stores: Stores,
}

impl Authorizer {
    /// Creates a resolver over the given stores
    pub fn new(stores: Stores) -> Self {
        Authorizer { stores }
    }

    /// Checks a system-scoped capability against the user's system role
    ///
    /// Used for operations with no resource target yet, e.g. creating a
    /// project or reading the user directory.
    pub fn authorize_system(&self, user: &User, capability: Capability) -> Result<()> {
        if user.system_role.grants(capability) {
            return Ok(());
        }
        debug!(
            user_id = %user.id,
            capability = %capability,
            "system-scope authorization denied"
        );
        Err(Error::PermissionDenied(capability))
    }

    /// Checks a resource-scoped capability against the membership hierarchy
    ///
    /// `kind`/`id` address the target resource; image, object, and point
    /// targets are resolved upward to their owning dataset before the
    /// membership walk starts.
    pub async fn authorize(
        &self,
        user: &User,
        kind: ResourceKind,
        id: Uuid,
        capability: Capability,
    ) -> Result<()> {
        // Administrators bypass hierarchy resolution entirely.
        if user.is_admin() {
            return Ok(());
        }

        let allowed = match kind {
            ResourceKind::Project => self.project_scope_allows(user, id, capability).await?,
            ResourceKind::Dataset => self.dataset_scope_allows(user, id, capability).await?,
            ResourceKind::Image => {
                let image = self.stores.images.find_by_id(id).await?;
                self.dataset_scope_allows(user, image.dataset_id, capability)
                    .await?
            }
            ResourceKind::ImageObject => {
                let dataset_id = self.dataset_of_object(id).await?;
                self.dataset_scope_allows(user, dataset_id, capability).await?
            }
            ResourceKind::ObjectPoint => {
                let point = self.stores.object_points.find_by_id(id).await?;
                let dataset_id = self.dataset_of_object(point.image_object_id).await?;
                self.dataset_scope_allows(user, dataset_id, capability).await?
            }
            ResourceKind::User | ResourceKind::Membership => {
                // Memberships and users are not authorization targets; the
                // enclosing resource (or the system scope) is checked
                // instead.
                return Err(Error::PermissionDenied(capability));
            }
        };

        if allowed {
            Ok(())
        } else {
            debug!(
                user_id = %user.id,
                kind = %kind,
                resource_id = %id,
                capability = %capability,
                "authorization denied"
            );
            Err(Error::PermissionDenied(capability))
        }
    }

    /// Project scope: the project membership alone decides
    async fn project_scope_allows(
        &self,
        user: &User,
        project_id: Uuid,
        capability: Capability,
    ) -> Result<bool> {
        // The project must exist for the check to be meaningful.
        self.stores.projects.find_by_id(project_id).await?;

        match self.stores.project_members.find(project_id, user.id).await {
            Ok(membership) => Ok(membership.role.grants(capability)),
            Err(Error::ResourceNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Dataset scope: dataset membership first, project membership as
    /// fallback
    async fn dataset_scope_allows(
        &self,
        user: &User,
        dataset_id: Uuid,
        capability: Capability,
    ) -> Result<bool> {
        let dataset = self.stores.datasets.find_by_id(dataset_id).await?;

        match self.stores.dataset_members.find(dataset_id, user.id).await {
            Ok(membership) if membership.role.grants(capability) => return Ok(true),
            Ok(_) | Err(Error::ResourceNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        // Walk up: a project-level grant authorizes dataset operations
        // transitively. The parent project must exist.
        self.stores.projects.find_by_id(dataset.project_id).await?;

        match self
            .stores
            .project_members
            .find(dataset.project_id, user.id)
            .await
        {
            Ok(membership) => Ok(membership.role.grants(capability)),
            Err(Error::ResourceNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Resolves an image object to the dataset that owns its image
    async fn dataset_of_object(&self, image_object_id: Uuid) -> Result<Uuid> {
        let object = self.stores.image_objects.find_by_id(image_object_id).await?;
        let image = self.stores.images.find_by_id(object.image_id).await?;
        Ok(image.dataset_id)
    }
}
