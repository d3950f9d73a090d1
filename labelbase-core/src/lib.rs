//! # Labelbase Core
//!
//! Domain core of the Labelbase image-labeling platform: the hierarchical
//! authorization and cascading-lifecycle engine over the resource tree
//! Project → Dataset → Image → ImageObject → ObjectPoint.
//!
//! ## Module Organization
//!
//! - `roles`: capability tokens and the system/project/dataset role tiers
//! - `models`: entity records and their create/update inputs
//! - `error`: domain error taxonomy
//! - `store`: persistence adapter contracts + PostgreSQL and in-memory
//!   implementations
//! - `authz`: the authorization resolver (hierarchy walk)
//! - `lifecycle`: the lifecycle manager (creation, membership, deletion)
//!
//! ## Layering
//!
//! ```text
//! API layer (labelbase-api)
//!   ├── Authorizer ──┐
//!   └── Lifecycle ───┴──> Stores (adapter traits)
//! ```
//!
//! The lifecycle manager never authorizes and the authorizer never
//! mutates; both depend only on the store adapters.

pub mod authz;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod roles;
pub mod store;

pub use error::{Error, ResourceKind, Result};

/// Current version of the Labelbase core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
