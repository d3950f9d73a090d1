/// User directory and account management endpoints
///
/// # Endpoints
///
/// - `GET    /v1/users` - list accounts (administrators)
/// - `GET    /v1/users/:id` - fetch one account
/// - `PUT    /v1/users/:id/username` - change login name (self or admin)
/// - `PUT    /v1/users/:id/email` - change email (self or admin)
/// - `PUT    /v1/users/:id/password` - change password (self or admin)
/// - `PUT    /v1/users/:id/role` - change system role (administrators)
/// - `DELETE /v1/users/:id` - remove an account (administrators)

use crate::{
    app::AppState,
    auth::{middleware::CurrentUser, password},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use labelbase_core::models::{UpdateUser, User};
use labelbase_core::roles::{Capability, SystemRole};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Change-username request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUsernameRequest {
    /// New login name
    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    pub username: String,
}

/// Change-email request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEmailRequest {
    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Change-password request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    /// New password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Change-role request
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    /// New system role
    pub system_role: SystemRole,
}

fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("administrator role required".to_string()))
    }
}

fn require_self_or_admin(user: &User, target: Uuid) -> Result<(), ApiError> {
    if user.id == target || user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("may only modify your own account".to_string()))
    }
}

/// Lists every account (administrators only)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<User>>> {
    require_admin(&user)?;
    Ok(Json(state.stores.users.list().await?))
}

/// Fetches one account
pub async fn get_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    state.authz.authorize_system(&user, Capability::UserRead)?;
    Ok(Json(state.stores.users.find_by_id(id).await?))
}

/// Changes an account's login name (self or admin)
pub async fn update_username(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUsernameRequest>,
) -> ApiResult<Json<User>> {
    require_self_or_admin(&user, id)?;
    req.validate()?;

    let updated = state
        .stores
        .users
        .update(
            id,
            UpdateUser {
                username: Some(req.username),
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(updated))
}

/// Changes an account's email (self or admin)
pub async fn update_email(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEmailRequest>,
) -> ApiResult<Json<User>> {
    require_self_or_admin(&user, id)?;
    req.validate()?;

    let updated = state
        .stores
        .users
        .update(
            id,
            UpdateUser {
                email: Some(req.email),
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(updated))
}

/// Changes an account's password (self or admin)
pub async fn update_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<Json<User>> {
    require_self_or_admin(&user, id)?;
    req.validate()?;

    let password_hash =
        password::hash_password(&req.password).map_err(|e| ApiError::InternalError(e.to_string()))?;
    let updated = state
        .stores
        .users
        .update(
            id,
            UpdateUser {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(updated))
}

/// Changes an account's system role (administrators only)
pub async fn update_role(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<User>> {
    require_admin(&user)?;

    let updated = state
        .stores
        .users
        .update(
            id,
            UpdateUser {
                system_role: Some(req.system_role),
                ..Default::default()
            },
        )
        .await?;
    tracing::info!(user_id = %id, role = updated.system_role.as_str(), "system role changed");
    Ok(Json(updated))
}

/// Removes an account (administrators only)
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    require_admin(&user)?;
    Ok(Json(state.stores.users.delete(id).await?))
}
