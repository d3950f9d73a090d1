/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - register a new account
/// - `POST /v1/auth/login` - login with username/email and password
/// - `POST /v1/auth/refresh` - mint a new access token from a refresh token

use crate::{
    app::AppState,
    auth::{jwt, password},
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Json};
use labelbase_core::models::CreateUser;
use labelbase_core::roles::SystemRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Login name
    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Register / login response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// User ID
    pub user_id: Uuid,

    /// System role of the account
    pub system_role: SystemRole,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Login request: either the username or the email identifies the account
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email address
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,

    /// Password
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

fn token_pair(state: &AppState, user_id: Uuid) -> Result<(String, String), ApiError> {
    let secret = &state.config.jwt.secret;
    let access = jwt::create_token(&jwt::Claims::new(user_id, jwt::TokenType::Access), secret)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let refresh = jwt::create_token(&jwt::Claims::new(user_id, jwt::TokenType::Refresh), secret)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok((access, refresh))
}

/// Registers a new account
///
/// New accounts get the regular `user` system role; promotion to
/// researcher or administrator is an administrative operation.
///
/// # Errors
///
/// - `422` validation failed
/// - `409` username or email already taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let password_hash =
        password::hash_password(&req.password).map_err(|e| ApiError::InternalError(e.to_string()))?;

    let user = state
        .stores
        .users
        .insert(CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            system_role: SystemRole::User,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");

    let (access_token, refresh_token) = token_pair(&state, user.id)?;
    Ok(Json(TokenResponse {
        user_id: user.id,
        system_role: user.system_role,
        access_token,
        refresh_token,
    }))
}

/// Logs a user in
///
/// The identifier matches against the username first, then the email. A
/// wrong identifier and a wrong password return the same error, so the
/// endpoint does not leak which accounts exist.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("invalid credentials".to_string());

    let user = match state.stores.users.find_by_username(&req.identifier).await {
        Ok(user) => user,
        Err(_) => state
            .stores
            .users
            .find_by_email(&req.identifier)
            .await
            .map_err(|_| invalid())?,
    };

    let verified = password::verify_password(&req.password, &user.password_hash)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    if !verified {
        return Err(invalid());
    }
    if !user.active {
        return Err(ApiError::Unauthorized("account is deactivated".to_string()));
    }

    tracing::info!(user_id = %user.id, "user logged in");

    let (access_token, refresh_token) = token_pair(&state, user.id)?;
    Ok(Json(TokenResponse {
        user_id: user.id,
        system_role: user.system_role,
        access_token,
        refresh_token,
    }))
}

/// Mints a new access token from a refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, &state.config.jwt.secret)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    // The account must still exist and be active.
    let user = state
        .stores
        .users
        .find_by_id(claims.sub)
        .await
        .map_err(|_| ApiError::Unauthorized("unknown user".to_string()))?;
    if !user.active {
        return Err(ApiError::Unauthorized("account is deactivated".to_string()));
    }

    let access_token = jwt::create_token(
        &jwt::Claims::new(user.id, jwt::TokenType::Access),
        &state.config.jwt.secret,
    )
    .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(RefreshResponse { access_token }))
}
