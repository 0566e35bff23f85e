//! Tag binding: `(namespace, repository, tag_name)` to a manifest snapshot.

use dockyard_core::tag_key::TagKey;
use dockyard_core::types::{DbId, RowVersion, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `repository_tags` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct RepositoryTag {
    pub id: DbId,
    pub namespace: String,
    pub repository: String,
    pub description: String,
    pub tag_name: String,
    /// Manifest snapshot the tag points at.
    pub tag_json: String,
    pub tag: String,
    pub version: RowVersion,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RepositoryTag {
    pub fn key(&self) -> TagKey {
        TagKey::new(&self.namespace, &self.repository, &self.tag_name)
    }
}

/// DTO for binding a tag, used by both insert and put.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRepositoryTag {
    pub namespace: String,
    pub repository: String,
    #[serde(default)]
    pub description: String,
    pub tag_name: String,
    #[serde(default)]
    pub tag_json: String,
    #[serde(default)]
    pub tag: String,
}

impl CreateRepositoryTag {
    pub fn key(&self) -> TagKey {
        TagKey::new(&self.namespace, &self.repository, &self.tag_name)
    }
}

/// DTO for an in-place tag update. `version` must equal the stored version;
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRepositoryTag {
    pub version: RowVersion,
    pub namespace: Option<String>,
    pub repository: Option<String>,
    pub description: Option<String>,
    pub tag_name: Option<String>,
    pub tag_json: Option<String>,
    pub tag: Option<String>,
}
