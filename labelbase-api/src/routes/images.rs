/// Image, image object, and object point endpoints
///
/// # Endpoints
///
/// - `POST   /v1/datasets/:id/images` - upload (raw body + query metadata)
/// - `GET    /v1/datasets/:id/images` - images of one dataset
/// - `GET    /v1/images` - category search
/// - `GET    /v1/images/:id` - image record
/// - `GET    /v1/images/:id/data` - raw payload with its content type
/// - `DELETE /v1/images/:id` - delete (strict, fails on objects)
/// - `GET    /v1/images/:id/objects` / `POST` - annotated objects
/// - `GET    /v1/objects/:id` / `PUT` / `DELETE` - one object (delete cascades points)
/// - `GET    /v1/objects/:id/points` / `POST` - outline points
/// - `DELETE /v1/points/:id` - one point

use crate::{app::AppState, auth::middleware::CurrentUser, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use bytes::Bytes;
use labelbase_core::error::ResourceKind;
use labelbase_core::models::{
    CreateImage, CreateImageObject, CreateObjectPoint, Image, ImageObject, ImagePayload,
    ObjectPoint, UpdateImageObject,
};
use labelbase_core::roles::Capability;
use serde::Deserialize;
use uuid::Uuid;

/// Upload query parameters; the picture itself is the request body
#[derive(Debug, Deserialize)]
pub struct UploadImageParams {
    /// Display name; doubles as the stored filename
    pub name: String,

    /// Image format; derived from the Content-Type header when omitted
    pub format: Option<String>,

    /// Comma-separated category tags
    pub categories: Option<String>,
}

/// Category search parameters
#[derive(Debug, Deserialize)]
pub struct SearchImagesParams {
    /// Comma-separated category tags; an image must carry all of them
    pub categories: String,

    /// Restrict the search to one dataset
    pub dataset_id: Uuid,
}

/// Create-object request
#[derive(Debug, Deserialize)]
pub struct CreateObjectRequest {
    /// Label name
    pub name: String,
}

/// Update-object request
#[derive(Debug, Deserialize)]
pub struct UpdateObjectRequest {
    /// New label name
    pub name: Option<String>,

    /// Move to another image
    pub image_id: Option<Uuid>,
}

/// Create-point request
#[derive(Debug, Deserialize)]
pub struct CreatePointRequest {
    /// Horizontal position in pixels
    pub x: f64,

    /// Vertical position in pixels
    pub y: f64,
}

fn split_categories(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Uploads an image into a dataset
///
/// The request body is the raw picture; name, format, and categories come
/// from query parameters, the content type from the header.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(dataset_id): Path<Uuid>,
    Query(params): Query<UploadImageParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Image>> {
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, dataset_id, Capability::ImageUpload)
        .await?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let format = params
        .format
        .unwrap_or_else(|| content_type.rsplit('/').next().unwrap_or("bin").to_string());

    let image = state
        .lifecycle
        .create_image(
            CreateImage {
                name: params.name.clone(),
                format,
                dataset_id,
                categories: split_categories(params.categories.as_deref()),
            },
            ImagePayload {
                filename: params.name,
                content_type,
                bytes: body,
            },
        )
        .await?;
    Ok(Json(image))
}

/// Lists the images of one dataset
pub async fn list_images_of_dataset(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(dataset_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Image>>> {
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, dataset_id, Capability::DatasetRead)
        .await?;
    Ok(Json(state.lifecycle.list_images_by_dataset(dataset_id).await?))
}

/// Searches a dataset's images by category tags (all must match)
pub async fn search_images(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<SearchImagesParams>,
) -> ApiResult<Json<Vec<Image>>> {
    state
        .authz
        .authorize(&user, ResourceKind::Dataset, params.dataset_id, Capability::DatasetRead)
        .await?;

    let categories = split_categories(Some(&params.categories));
    let images = state
        .lifecycle
        .list_images_by_categories(&categories, Some(params.dataset_id))
        .await?;
    Ok(Json(images))
}

/// Fetches an image record
pub async fn get_image(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Image>> {
    state
        .authz
        .authorize(&user, ResourceKind::Image, id, Capability::DatasetRead)
        .await?;
    let (image, _) = state.lifecycle.get_image(id).await?;
    Ok(Json(image))
}

/// Fetches an image's raw payload with its stored content type
pub async fn get_image_data(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .authz
        .authorize(&user, ResourceKind::Image, id, Capability::DatasetRead)
        .await?;

    let (_, payload) = state.lifecycle.get_image(id).await?;
    let payload = payload.ok_or_else(|| {
        crate::error::ApiError::NotFound("image has no stored payload".to_string())
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, payload.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", payload.filename),
            ),
        ],
        payload.bytes,
    ))
}

/// Deletes an image; fails with 409 while objects remain
pub async fn delete_image(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Image>> {
    state
        .authz
        .authorize(&user, ResourceKind::Image, id, Capability::ImageDelete)
        .await?;
    Ok(Json(state.lifecycle.delete_image(id).await?))
}

/// Lists the objects of one image
pub async fn list_objects(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(image_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ImageObject>>> {
    state
        .authz
        .authorize(&user, ResourceKind::Image, image_id, Capability::DatasetRead)
        .await?;
    Ok(Json(state.lifecycle.list_image_objects(image_id).await?))
}

/// Creates an object within an image
pub async fn create_object(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(image_id): Path<Uuid>,
    Json(req): Json<CreateObjectRequest>,
) -> ApiResult<Json<ImageObject>> {
    state
        .authz
        .authorize(&user, ResourceKind::Image, image_id, Capability::AnnotationEdit)
        .await?;

    let object = state
        .lifecycle
        .create_image_object(CreateImageObject {
            name: req.name,
            image_id,
        })
        .await?;
    Ok(Json(object))
}

/// Fetches one object
pub async fn get_object(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ImageObject>> {
    state
        .authz
        .authorize(&user, ResourceKind::ImageObject, id, Capability::DatasetRead)
        .await?;
    Ok(Json(state.lifecycle.get_image_object(id).await?))
}

/// Updates an object's name and/or image reference
pub async fn update_object(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateObjectRequest>,
) -> ApiResult<Json<ImageObject>> {
    state
        .authz
        .authorize(&user, ResourceKind::ImageObject, id, Capability::AnnotationEdit)
        .await?;

    let updated = state
        .lifecycle
        .update_image_object(
            id,
            UpdateImageObject {
                name: req.name,
                image_id: req.image_id,
            },
        )
        .await?;
    Ok(Json(updated))
}

/// Deletes an object, cascading to its points
pub async fn delete_object(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ImageObject>> {
    state
        .authz
        .authorize(&user, ResourceKind::ImageObject, id, Capability::AnnotationEdit)
        .await?;
    Ok(Json(state.lifecycle.delete_image_object(id).await?))
}

/// Lists the points of one object
pub async fn list_points(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(object_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ObjectPoint>>> {
    state
        .authz
        .authorize(&user, ResourceKind::ImageObject, object_id, Capability::DatasetRead)
        .await?;
    Ok(Json(state.lifecycle.list_object_points(object_id).await?))
}

/// Creates a point within an object
pub async fn create_point(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(object_id): Path<Uuid>,
    Json(req): Json<CreatePointRequest>,
) -> ApiResult<Json<ObjectPoint>> {
    state
        .authz
        .authorize(&user, ResourceKind::ImageObject, object_id, Capability::AnnotationEdit)
        .await?;

    let point = state
        .lifecycle
        .create_object_point(CreateObjectPoint {
            image_object_id: object_id,
            x: req.x,
            y: req.y,
        })
        .await?;
    Ok(Json(point))
}

/// Deletes one point
pub async fn delete_point(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ObjectPoint>> {
    state
        .authz
        .authorize(&user, ResourceKind::ObjectPoint, id, Capability::AnnotationEdit)
        .await?;
    Ok(Json(state.lifecycle.delete_object_point(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_categories() {
        assert_eq!(
            split_categories(Some("nature, panorama,portrait")),
            vec!["nature", "panorama", "portrait"]
        );
        assert_eq!(split_categories(Some("")), Vec::<String>::new());
        assert_eq!(split_categories(None), Vec::<String>::new());
    }
}
