/// Image, image object, and object point lifecycle operations
///
/// Image deletion is strict (`ChildrenExist` while objects remain); object
/// deletion cascades its points unconditionally; points are disposable
/// leaves. The per-dataset sweep is best-effort and skips images that still
/// hold objects.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, ResourceKind, Result};
use crate::lifecycle::Lifecycle;
use crate::models::{
    CreateImage, CreateImageObject, CreateObjectPoint, Image, ImageObject, ImagePayload,
    ObjectPoint, UpdateImageObject,
};

impl Lifecycle {
    /// Creates an image record and stores its payload
    ///
    /// The dataset must exist (`ReferenceNotFound` otherwise). If the blob
    /// store refuses the payload the record is compensated away and the
    /// failure surfaced.
    pub async fn create_image(
        &self,
        input: CreateImage,
        payload: ImagePayload,
    ) -> Result<Image> {
        if let Err(e) = self.stores().datasets.find_by_id(input.dataset_id).await {
            return Err(match e {
                Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::Dataset),
                other => other,
            });
        }

        let image = self.stores().images.insert(input).await?;
        if let Err(e) = self.stores().blobs.put(image.id, payload).await {
            warn!(image_id = %image.id, error = %e, "payload store failed, compensating image record");
            let _ = self.stores().images.delete(image.id).await;
            return Err(e);
        }

        info!(image_id = %image.id, dataset_id = %image.dataset_id, "image created");
        Ok(image)
    }

    /// Fetches an image record together with its payload, if any
    pub async fn get_image(&self, id: Uuid) -> Result<(Image, Option<ImagePayload>)> {
        let image = self.stores().images.find_by_id(id).await?;
        let payload = self.stores().blobs.get(id).await?;
        Ok((image, payload))
    }

    /// Lists the images of one dataset; the dataset must exist
    pub async fn list_images_by_dataset(&self, dataset_id: Uuid) -> Result<Vec<Image>> {
        self.stores().datasets.find_by_id(dataset_id).await?;
        self.stores().images.list_by_dataset(dataset_id).await
    }

    /// Lists images tagged with every given category, optionally within one
    /// dataset
    pub async fn list_images_by_categories(
        &self,
        categories: &[String],
        dataset_id: Option<Uuid>,
    ) -> Result<Vec<Image>> {
        self.stores().images.list_by_categories(categories, dataset_id).await
    }

    /// Deletes an image and its payload
    ///
    /// Strict: fails with `ChildrenExist` while the image owns any object.
    pub async fn delete_image(&self, id: Uuid) -> Result<Image> {
        self.stores().images.find_by_id(id).await?;

        let objects = self.stores().image_objects.list_by_image(id).await?;
        if !objects.is_empty() {
            return Err(Error::ChildrenExist(ResourceKind::Image));
        }

        self.stores().blobs.delete(id).await?;
        let deleted = self.stores().images.delete(id).await?;

        info!(image_id = %id, "image deleted");
        Ok(deleted)
    }

    /// Best-effort deletion of every image in a dataset
    ///
    /// Images still holding objects are skipped, blobs and records
    /// untouched. Returns the images actually removed. Callers clear the
    /// objects first if they want the dataset fully emptied.
    pub async fn delete_images_in_dataset(&self, dataset_id: Uuid) -> Result<Vec<Image>> {
        let images = self.stores().images.list_by_dataset(dataset_id).await?;

        let mut removed = Vec::new();
        for image in images {
            let objects = self.stores().image_objects.list_by_image(image.id).await?;
            if !objects.is_empty() {
                debug!(image_id = %image.id, objects = objects.len(), "sweep skipping image with objects");
                continue;
            }
            self.stores().blobs.delete(image.id).await?;
            removed.push(self.stores().images.delete(image.id).await?);
        }
        Ok(removed)
    }

    /// Empties a dataset of images, best-effort; the dataset must exist
    pub async fn clear_dataset(&self, dataset_id: Uuid) -> Result<Vec<Image>> {
        self.stores().datasets.find_by_id(dataset_id).await?;
        let removed = self.delete_images_in_dataset(dataset_id).await?;
        info!(dataset_id = %dataset_id, images_removed = removed.len(), "dataset cleared");
        Ok(removed)
    }

    /// Creates an object within an image; the image must exist
    pub async fn create_image_object(&self, input: CreateImageObject) -> Result<ImageObject> {
        if let Err(e) = self.stores().images.find_by_id(input.image_id).await {
            return Err(match e {
                Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::Image),
                other => other,
            });
        }
        self.stores().image_objects.insert(input).await
    }

    /// Fetches an object by id
    pub async fn get_image_object(&self, id: Uuid) -> Result<ImageObject> {
        self.stores().image_objects.find_by_id(id).await
    }

    /// Lists the objects of one image; the image must exist
    pub async fn list_image_objects(&self, image_id: Uuid) -> Result<Vec<ImageObject>> {
        self.stores().images.find_by_id(image_id).await?;
        self.stores().image_objects.list_by_image(image_id).await
    }

    /// Updates an object's name and/or image reference
    pub async fn update_image_object(
        &self,
        id: Uuid,
        input: UpdateImageObject,
    ) -> Result<ImageObject> {
        self.stores().image_objects.find_by_id(id).await?;
        if let Some(image_id) = input.image_id {
            if let Err(e) = self.stores().images.find_by_id(image_id).await {
                return Err(match e {
                    Error::ResourceNotFound(_) => Error::ReferenceNotFound(ResourceKind::Image),
                    other => other,
                });
            }
        }
        self.stores().image_objects.update(id, input).await
    }

    /// Deletes an object, cascading to its points unconditionally
    pub async fn delete_image_object(&self, id: Uuid) -> Result<ImageObject> {
        self.stores().image_objects.find_by_id(id).await?;

        let points = self.stores().object_points.delete_all_by_object(id).await?;
        let deleted = self.stores().image_objects.delete(id).await?;

        info!(image_object_id = %id, points_removed = points.len(), "image object deleted");
        Ok(deleted)
    }

    /// Deletes every object of one image, points included
    pub async fn delete_objects_in_image(&self, image_id: Uuid) -> Result<Vec<ImageObject>> {
        let objects = self.stores().image_objects.list_by_image(image_id).await?;
        let mut removed = Vec::with_capacity(objects.len());
        for object in objects {
            self.stores().object_points.delete_all_by_object(object.id).await?;
            removed.push(self.stores().image_objects.delete(object.id).await?);
        }
        Ok(removed)
    }

    /// Creates a point within an object; the object must exist
    pub async fn create_object_point(&self, input: CreateObjectPoint) -> Result<ObjectPoint> {
        if let Err(e) = self
            .stores()
            .image_objects
            .find_by_id(input.image_object_id)
            .await
        {
            return Err(match e {
                Error::ResourceNotFound(_) => {
                    Error::ReferenceNotFound(ResourceKind::ImageObject)
                }
                other => other,
            });
        }
        self.stores().object_points.insert(input).await
    }

    /// Fetches a point by id
    pub async fn get_object_point(&self, id: Uuid) -> Result<ObjectPoint> {
        self.stores().object_points.find_by_id(id).await
    }

    /// Lists the points of one object; the object must exist
    pub async fn list_object_points(&self, image_object_id: Uuid) -> Result<Vec<ObjectPoint>> {
        self.stores().image_objects.find_by_id(image_object_id).await?;
        self.stores().object_points.list_by_object(image_object_id).await
    }

    /// Deletes a single point
    pub async fn delete_object_point(&self, id: Uuid) -> Result<ObjectPoint> {
        self.stores().object_points.delete(id).await
    }

    /// Deletes every point of one object; the object must exist
    pub async fn delete_points_in_object(
        &self,
        image_object_id: Uuid,
    ) -> Result<Vec<ObjectPoint>> {
        self.stores().image_objects.find_by_id(image_object_id).await?;
        self.stores().object_points.delete_all_by_object(image_object_id).await
    }
}
