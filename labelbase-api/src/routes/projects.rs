/// Project endpoints
///
/// # Endpoints
///
/// - `POST   /v1/projects` - create a project (researchers/admins)
/// - `GET    /v1/projects` - list every project (administrators)
/// - `GET    /v1/projects/owner/:user_id` - projects owned by a user
/// - `GET    /v1/projects/:id` - fetch one project
/// - `PUT    /v1/projects/:id` - update name/owner field
/// - `DELETE /v1/projects/:id` - delete (strict, fails on children)
/// - `GET    /v1/projects/:id/members` - member listing with user records
/// - `POST   /v1/projects/:id/members` - add a member
/// - `PUT    /v1/projects/:id/members/:user_id` - change a member's role
/// - `DELETE /v1/projects/:id/members/:user_id` - remove a member
///
/// Each handler authorizes through the core resolver before touching the
/// lifecycle manager.

use crate::{
    app::AppState,
    auth::middleware::CurrentUser,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use labelbase_core::error::ResourceKind;
use labelbase_core::models::{
    CreateProject, Project, ProjectMemberDetails, ProjectMembership, UpdateProject,
};
use labelbase_core::roles::{Capability, ProjectRole};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create-project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Owner account; defaults to the caller, anyone else requires the
    /// administrator role
    pub owner_id: Option<Uuid>,
}

/// Update-project request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    /// New display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    /// New owner id
    pub owner_id: Option<Uuid>,
}

/// Add-member request
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    /// Account to add
    pub user_id: Uuid,

    /// Role to grant
    pub role: ProjectRole,
}

/// Change-member-role request
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    /// New role
    pub role: ProjectRole,
}

/// Creates a project owned by the caller (or, for admins, any user)
pub async fn create_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;
    state.authz.authorize_system(&user, Capability::ProjectCreate)?;

    let owner_id = match req.owner_id {
        Some(other) if other != user.id => {
            if !user.is_admin() {
                return Err(ApiError::Forbidden(
                    "only administrators may create projects for other users".to_string(),
                ));
            }
            other
        }
        _ => user.id,
    };

    let project = state
        .lifecycle
        .create_project(CreateProject {
            name: req.name,
            owner_id,
        })
        .await?;
    Ok(Json(project))
}

/// Lists every project (administrators only)
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Project>>> {
    if !user.is_admin() {
        return Err(ApiError::Forbidden("administrator role required".to_string()));
    }
    Ok(Json(state.lifecycle.list_projects().await?))
}

/// Lists the projects owned by a user (self or admin)
pub async fn list_projects_by_owner(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Project>>> {
    if user.id != user_id && !user.is_admin() {
        return Err(ApiError::Forbidden(
            "may only list your own projects".to_string(),
        ));
    }
    Ok(Json(state.lifecycle.list_projects_by_owner(user_id).await?))
}

/// Fetches one project
pub async fn get_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    state
        .authz
        .authorize(&user, ResourceKind::Project, id, Capability::ProjectRead)
        .await?;
    Ok(Json(state.lifecycle.get_project(id).await?))
}

/// Updates a project's name and/or owner field
pub async fn update_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;
    state
        .authz
        .authorize(&user, ResourceKind::Project, id, Capability::ProjectUpdate)
        .await?;

    let updated = state
        .lifecycle
        .update_project(
            id,
            UpdateProject {
                name: req.name,
                owner_id: req.owner_id,
            },
        )
        .await?;
    Ok(Json(updated))
}

/// Deletes a project; fails with 409 while datasets remain
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    state
        .authz
        .authorize(&user, ResourceKind::Project, id, Capability::ProjectDelete)
        .await?;
    Ok(Json(state.lifecycle.delete_project(id).await?))
}

/// Lists a project's members with their user records
pub async fn list_members(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProjectMemberDetails>>> {
    state
        .authz
        .authorize(&user, ResourceKind::Project, id, Capability::ProjectRead)
        .await?;
    Ok(Json(state.lifecycle.list_project_member_details(id).await?))
}

/// Adds a member to a project
pub async fn add_member(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<Json<ProjectMembership>> {
    state
        .authz
        .authorize(&user, ResourceKind::Project, id, Capability::ProjectManageMembers)
        .await?;

    let membership = state
        .lifecycle
        .add_project_member(id, req.user_id, req.role)
        .await?;
    Ok(Json(membership))
}

/// Changes a member's role; the owner link is protected
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<ProjectMembership>> {
    state
        .authz
        .authorize(&user, ResourceKind::Project, id, Capability::ProjectManageMembers)
        .await?;

    let membership = state
        .lifecycle
        .update_project_member_role(id, user_id, req.role)
        .await?;
    Ok(Json(membership))
}

/// Removes a member; the owner link is protected
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ProjectMembership>> {
    state
        .authz
        .authorize(&user, ResourceKind::Project, id, Capability::ProjectManageMembers)
        .await?;
    Ok(Json(state.lifecycle.remove_project_member(id, user_id).await?))
}
