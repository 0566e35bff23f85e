//! Image insert/update driving the upload and checksum lifecycle.

use dockyard_core::error::CoreError;
use dockyard_core::image_state::UploadState;
use dockyard_core::types::DbId;
use dockyard_core::validation::validate_image_id;

use crate::error::DbResult;
use crate::models::image::{CreateImage, Image, UpdateImage};
use crate::repositories::ImageRepo;
use crate::storage::{Filter, Record, Storage};

pub struct ImageService<'a> {
    storage: &'a Storage,
}

impl<'a> ImageService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Record a new image at the start of a push. The row must begin in
    /// [`UploadState::Created`]; later states are reached through
    /// [`update_image`](Self::update_image). A reused `image_id` is a
    /// uniqueness violation.
    #[tracing::instrument(skip(self, input), fields(image_id = %input.image_id))]
    pub async fn insert_image(&self, input: CreateImage) -> DbResult<Image> {
        validate_image_id(&input.image_id)?;
        let state = UploadState::from_flags(input.uploaded, input.checksumed)?;
        if state != UploadState::Created {
            return Err(CoreError::Validation(format!(
                "New image must start in state {}, not {state}",
                UploadState::Created
            ))
            .into());
        }

        let image = ImageRepo::create(self.storage.pool(), &input).await?;
        tracing::info!(id = image.id, "Image created");
        Ok(image)
    }

    /// Apply `input` to image `id`.
    ///
    /// Runs in one transaction holding the row lock: the stored version must
    /// equal `input.version` (`Conflict` otherwise) and the resulting flags
    /// must be a legal lifecycle step from the stored ones (`Validation`
    /// otherwise). Omitted fields keep their stored values.
    #[tracing::instrument(skip(self, input), fields(version = input.version))]
    pub async fn update_image(&self, id: DbId, input: &UpdateImage) -> DbResult<Image> {
        if let Some(image_id) = &input.image_id {
            validate_image_id(image_id)?;
        }

        let mut tx = self.storage.pool().begin().await?;

        let current = ImageRepo::lock_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found(Image::ENTITY, id))?;
        if current.version != input.version {
            tracing::warn!(stored = current.version, "Stale image version");
            return Err(CoreError::stale_version(Image::ENTITY, id).into());
        }

        let from = current.state()?;
        let to = UploadState::from_flags(
            input.uploaded.unwrap_or(current.uploaded),
            input.checksumed.unwrap_or(current.checksumed),
        )?;
        from.check_transition(to)?;

        let updated = ImageRepo::update(&mut *tx, id, input)
            .await?
            .ok_or_else(|| CoreError::stale_version(Image::ENTITY, id))?;
        tx.commit().await?;

        if from != to {
            tracing::info!(%from, %to, "Image state changed");
        }
        Ok(updated)
    }

    /// Find an image by its external identifier.
    pub async fn find_image_by_external_id(&self, image_id: &str) -> DbResult<Option<Image>> {
        self.storage
            .find_one_by::<Image>(&Filter::new().eq("image_id", image_id))
            .await
    }

    /// Mark the layer bytes as received.
    pub async fn mark_uploaded(&self, image: &Image) -> DbResult<Image> {
        let update = UpdateImage {
            uploaded: Some(true),
            ..UpdateImage::at_version(image.version)
        };
        self.update_image(image.id, &update).await
    }

    /// Store the verified checksum and mark the image as checksumed.
    pub async fn mark_verified(&self, image: &Image, checksum: &str) -> DbResult<Image> {
        let update = UpdateImage {
            checksum: Some(checksum.to_string()),
            checksumed: Some(true),
            ..UpdateImage::at_version(image.version)
        };
        self.update_image(image.id, &update).await
    }
}
