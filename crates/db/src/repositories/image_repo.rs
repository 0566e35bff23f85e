//! Repository for the `images` table.

use dockyard_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::image::{CreateImage, Image, UpdateImage};
use crate::storage::Record;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, image_id, json, parent_json, checksum, payload, \
                        uploaded, checksumed, version, created_at, updated_at";

impl Record for Image {
    const ENTITY: &'static str = "image";
    const TABLE: &'static str = "images";
    const COLUMNS: &'static str = COLUMNS;
}

/// Provides insert and guarded update for images.
pub struct ImageRepo;

impl ImageRepo {
    /// Insert a new image, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateImage) -> Result<Image, sqlx::Error> {
        let query = format!(
            "INSERT INTO images (image_id, json, parent_json, checksum, payload, uploaded, checksumed)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(&input.image_id)
            .bind(&input.json)
            .bind(&input.parent_json)
            .bind(&input.checksum)
            .bind(&input.payload)
            .bind(input.uploaded)
            .bind(input.checksumed)
            .fetch_one(pool)
            .await
    }

    /// Load an image and hold a row lock until the surrounding transaction ends.
    pub async fn lock_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Update an image. Only non-`None` fields in `input` are applied, and
    /// only if the stored version equals `input.version`. Increments the
    /// version.
    ///
    /// Returns `None` if no row with that id and version exists.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateImage,
    ) -> Result<Option<Image>, sqlx::Error> {
        let query = format!(
            "UPDATE images SET
                image_id = COALESCE($3, image_id),
                json = COALESCE($4, json),
                parent_json = COALESCE($5, parent_json),
                checksum = COALESCE($6, checksum),
                payload = COALESCE($7, payload),
                uploaded = COALESCE($8, uploaded),
                checksumed = COALESCE($9, checksumed),
                version = version + 1
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .bind(input.version)
            .bind(&input.image_id)
            .bind(&input.json)
            .bind(&input.parent_json)
            .bind(&input.checksum)
            .bind(&input.payload)
            .bind(input.uploaded)
            .bind(input.checksumed)
            .fetch_optional(conn)
            .await
    }
}
