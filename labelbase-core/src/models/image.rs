/// Image, image object, and object point records
///
/// Images are the leaves users actually label: each image may carry any
/// number of annotated objects, and each object any number of points. The
/// raw picture bytes are not part of the record; they live behind the
/// [`crate::store::BlobStore`] adapter, keyed by image id.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE images (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     format VARCHAR(32) NOT NULL,
///     dataset_id UUID NOT NULL,
///     categories TEXT[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE image_objects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     image_id UUID NOT NULL REFERENCES images(id)
/// );
///
/// CREATE TABLE object_points (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     image_object_id UUID NOT NULL REFERENCES image_objects(id),
///     x DOUBLE PRECISION NOT NULL,
///     y DOUBLE PRECISION NOT NULL
/// );
/// ```
///
/// `images.dataset_id` deliberately carries no foreign key: the lenient
/// dataset-deletion sweep removes a dataset record while skipping images
/// that still own objects, so an image may briefly outlive its dataset.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image record; the payload itself lives in the blob store
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    /// Unique image ID; also the blob key
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Image format, e.g. "png" or "jpeg"
    pub format: String,

    /// Owning dataset
    pub dataset_id: Uuid,

    /// Category tags for filtered listings
    pub categories: Vec<String>,

    /// Server-assigned creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating an image record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateImage {
    /// Display name
    pub name: String,

    /// Image format, e.g. "png" or "jpeg"
    pub format: String,

    /// Owning dataset; must exist
    pub dataset_id: Uuid,

    /// Category tags
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Raw picture bytes handed to the blob store
///
/// Filename, content type, and byte length round-trip unchanged through
/// store and fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Original filename
    pub filename: String,

    /// MIME content type, e.g. "image/png"
    pub content_type: String,

    /// The picture bytes
    pub bytes: Bytes,
}

/// An annotated object within an image
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImageObject {
    /// Unique object ID
    pub id: Uuid,

    /// Label name, e.g. "pedestrian"
    pub name: String,

    /// Owning image
    pub image_id: Uuid,
}

/// Input for creating an image object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateImageObject {
    /// Label name
    pub name: String,

    /// Owning image; must exist
    pub image_id: Uuid,
}

/// Input for updating an image object; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateImageObject {
    /// New label name
    pub name: Option<String>,

    /// Move the object to another image; must exist
    pub image_id: Option<Uuid>,
}

/// A single coordinate belonging to an object outline
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ObjectPoint {
    /// Unique point ID
    pub id: Uuid,

    /// Owning object
    pub image_object_id: Uuid,

    /// Horizontal position in pixels
    pub x: f64,

    /// Vertical position in pixels
    pub y: f64,
}

/// Input for creating an object point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateObjectPoint {
    /// Owning object; must exist
    pub image_object_id: Uuid,

    /// Horizontal position in pixels
    pub x: f64,

    /// Vertical position in pixels
    pub y: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_image_default_categories() {
        let input: CreateImage = serde_json::from_str(&format!(
            r#"{{"name":"frame-001","format":"png","dataset_id":"{}"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(input.categories.is_empty());
    }

    #[test]
    fn test_payload_roundtrip_fields() {
        let payload = ImagePayload {
            filename: "frame-001.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG\r\n"),
        };
        let copy = payload.clone();
        assert_eq!(copy.filename, payload.filename);
        assert_eq!(copy.content_type, payload.content_type);
        assert_eq!(copy.bytes.len(), payload.bytes.len());
    }
}
