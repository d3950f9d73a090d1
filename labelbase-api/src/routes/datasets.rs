/// Dataset endpoints
///
/// # Endpoints
///
/// - `POST   /v1/datasets` - create a dataset under a project
/// - `GET    /v1/datasets/:id` - fetch one dataset
/// - `PUT    /v1/datasets/:id` - update name/project/owner field
/// - `DELETE /v1/datasets/:id` - delete (lenient image sweep)
/// - `POST   /v1/datasets/:id/clear` - best-effort image cleanup
/// - `GET    /v1/datasets/:id/members` - member listing with user records
/// - `POST   /v1/datasets/:id/members` - add a member
/// - `PUT    /v1/datasets/:id/members/:user_id` - change a member's role
/// - `DELETE /v1/datasets/:id/members/:user_id` - remove a member
/// - `GET    /v1/projects/:id/datasets` - datasets of one project
/// - `DELETE /v1/projects/:id/datasets` - bulk delete (policy-governed)

use crate::{app::AppState, auth::middleware::CurrentUser, error::ApiResult};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use labelbase_core::error::ResourceKind;
use labelbase_core::models::{
    CreateDataset, Dataset, DatasetMemberDetails, DatasetMembership, Image, UpdateDataset,
};
use labelbase_core::roles::{Capability, DatasetRole};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create-dataset request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDatasetRequest {
    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Parent project
    pub project_id: Uuid,
}

/// Update-dataset request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDatasetRequest {
    /// New display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    /// Move to another project
    pub project_id: Option<Uuid>,

    /// New owner id
    pub owner_id: Option<Uuid>,
}

/// Add-member request
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    /// Account to add
    pub user_id: Uuid,

    /// Role to grant
    pub role: DatasetRole,
}

/// Change-member-role request
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    /// New role
    pub role: DatasetRole,
}

/// Creates a dataset under a project, owned by the caller
///
/// Requires the `dataset:create` capability on the parent project.
pub async fn create_dataset(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateDatasetRequest>,
) -> ApiResult<Json<Dataset>> {
    req.validate()?;
    state
        .authz
        .authorize(&user, ResourceKind::Project, req.project_id, Capability::DatasetCreate)
        .await?;

    let dataset = state
        .lifecycle
        .create_dataset(CreateDataset {
            name: req.name,
            project_id: req.project_id,
            owner_id: user.id,
        })
        .await?;
    Ok(Json(dataset))
}

/// Fetches one dataset
pub async fn get_dataset(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Dataset>> {
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, id, Capability::DatasetRead)
        .await?;
    Ok(Json(state.lifecycle.get_dataset(id).await?))
}

/// Updates a dataset's name, project, and/or owner field
pub async fn update_dataset(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDatasetRequest>,
) -> ApiResult<Json<Dataset>> {
    req.validate()?;
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, id, Capability::DatasetUpdate)
        .await?;

    let updated = state
        .lifecycle
        .update_dataset(
            id,
            UpdateDataset {
                name: req.name,
                project_id: req.project_id,
                owner_id: req.owner_id,
            },
        )
        .await?;
    Ok(Json(updated))
}

/// Deletes a dataset
///
/// Images still holding objects are skipped; the dataset record and all
/// its memberships go away regardless.
pub async fn delete_dataset(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Dataset>> {
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, id, Capability::DatasetDelete)
        .await?;
    Ok(Json(state.lifecycle.delete_dataset(id).await?))
}

/// Best-effort image cleanup; returns the images actually removed
pub async fn clear_dataset(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Image>>> {
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, id, Capability::ImageDelete)
        .await?;
    Ok(Json(state.lifecycle.clear_dataset(id).await?))
}

/// Lists a dataset's members with their user records
pub async fn list_members(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<DatasetMemberDetails>>> {
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, id, Capability::DatasetRead)
        .await?;
    Ok(Json(state.lifecycle.list_dataset_member_details(id).await?))
}

/// Adds a member to a dataset
pub async fn add_member(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<Json<DatasetMembership>> {
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, id, Capability::DatasetManageMembers)
        .await?;

    let membership = state
        .lifecycle
        .add_dataset_member(id, req.user_id, req.role)
        .await?;
    Ok(Json(membership))
}

/// Changes a member's role; the owner link is protected
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<DatasetMembership>> {
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, id, Capability::DatasetManageMembers)
        .await?;

    let membership = state
        .lifecycle
        .update_dataset_member_role(id, user_id, req.role)
        .await?;
    Ok(Json(membership))
}

/// Removes a member; the owner link is protected
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<DatasetMembership>> {
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, id, Capability::DatasetManageMembers)
        .await?;
    Ok(Json(state.lifecycle.remove_dataset_member(id, user_id).await?))
}

/// Lists the datasets of one project
pub async fn list_datasets_of_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Dataset>>> {
    state
        .authz
        .authorize(&user, ResourceKind::Project, id, Capability::ProjectRead)
        .await?;
    Ok(Json(state.lifecycle.list_datasets_by_project(id).await?))
}

/// Bulk-deletes the datasets of one project under the configured policy
///
/// Returns the datasets actually removed.
pub async fn delete_datasets_of_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Dataset>>> {
    state
        .authz
        .authorize(&user, ResourceKind::Project, id, Capability::DatasetDelete)
        .await?;
    Ok(Json(state.lifecycle.delete_datasets_in_project(id).await?))
}
