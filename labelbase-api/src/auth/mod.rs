/// Authentication for the API server
///
/// - `password`: Argon2id hashing and verification
/// - `jwt`: HS256 access/refresh token creation and validation
/// - `middleware`: Bearer extraction and the `CurrentUser` extension
///
/// Authorization, meaning what an authenticated user may do, lives in
/// `labelbase_core::authz`; this module only establishes who is calling.

pub mod jwt;
pub mod middleware;
pub mod password;
