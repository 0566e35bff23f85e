//! Image layer record and its upload/checksum flags.

use dockyard_core::error::CoreError;
use dockyard_core::image_state::UploadState;
use dockyard_core::types::{DbId, RowVersion, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `images` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Image {
    pub id: DbId,
    /// External content identifier supplied by the pushing client.
    pub image_id: String,
    pub json: String,
    pub parent_json: String,
    pub checksum: String,
    pub payload: String,
    pub uploaded: bool,
    pub checksumed: bool,
    pub version: RowVersion,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Image {
    /// Lifecycle state derived from the stored flags.
    pub fn state(&self) -> Result<UploadState, CoreError> {
        UploadState::from_flags(self.uploaded, self.checksumed)
    }
}

/// DTO for inserting a new image. Omitted text fields default to empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateImage {
    pub image_id: String,
    #[serde(default)]
    pub json: String,
    #[serde(default)]
    pub parent_json: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub uploaded: bool,
    #[serde(default)]
    pub checksumed: bool,
}

/// DTO for updating an image.
///
/// `version` must equal the stored version. `Some` fields replace stored
/// values and `None` fields are left as they are; build one with
/// [`UpdateImage::from`] to write back a complete record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateImage {
    pub version: RowVersion,
    pub image_id: Option<String>,
    pub json: Option<String>,
    pub parent_json: Option<String>,
    pub checksum: Option<String>,
    pub payload: Option<String>,
    pub uploaded: Option<bool>,
    pub checksumed: Option<bool>,
}

impl UpdateImage {
    /// An update that only carries the expected version; chain fields on it.
    pub fn at_version(version: RowVersion) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }
}

impl From<&Image> for UpdateImage {
    fn from(image: &Image) -> Self {
        Self {
            version: image.version,
            image_id: Some(image.image_id.clone()),
            json: Some(image.json.clone()),
            parent_json: Some(image.parent_json.clone()),
            checksum: Some(image.checksum.clone()),
            payload: Some(image.payload.clone()),
            uploaded: Some(image.uploaded),
            checksumed: Some(image.checksumed),
        }
    }
}
