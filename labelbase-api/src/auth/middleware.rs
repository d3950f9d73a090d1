/// Authentication middleware
///
/// Validates the `Authorization: Bearer <token>` header, loads the user
/// record behind the token, and stores it in the request extensions as
/// [`CurrentUser`]. Handlers extract it with axum's `Extension` extractor:
///
/// ```no_run
/// use axum::Extension;
/// use labelbase_api::auth::middleware::CurrentUser;
///
/// async fn handler(Extension(CurrentUser(user)): Extension<CurrentUser>) -> String {
///     format!("hello, {}", user.username)
/// }
/// ```
///
/// Loading the user on every request means a deactivated account or a
/// changed system role takes effect immediately, not at next login.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use labelbase_core::models::User;

use crate::app::AppState;
use crate::auth::jwt;
use crate::error::ApiError;

/// The authenticated user, stored in request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Extracts the Bearer token from the Authorization header
fn bearer_token(request: &Request) -> Result<&str, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("malformed authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("expected a bearer token".to_string()))
}

/// Middleware that requires a valid access token
///
/// On success the request carries a [`CurrentUser`] extension; on failure
/// the request is rejected with 401 before reaching the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)?;

    let claims = jwt::validate_access_token(token, &state.config.jwt.secret)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let user = state
        .stores
        .users
        .find_by_id(claims.sub)
        .await
        .map_err(|_| ApiError::Unauthorized("unknown user".to_string()))?;

    if !user.active {
        return Err(ApiError::Unauthorized("account is deactivated".to_string()));
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
