/// API route handlers
///
/// Organized by resource:
///
/// - `health`: health check endpoint
/// - `auth`: register, login, refresh
/// - `users`: user directory and account management
/// - `projects`: projects, project memberships, dataset listing
/// - `datasets`: datasets, dataset memberships, clearing
/// - `images`: image records and payloads, objects, points
///
/// Handlers authenticate via the middleware's `CurrentUser` extension,
/// authorize through the core [`labelbase_core::authz::Authorizer`], and
/// then call the lifecycle manager. No business rules live here.

pub mod auth;
pub mod datasets;
pub mod health;
pub mod images;
pub mod projects;
pub mod users;
