//! Repository for the `repository_tags` table.

use dockyard_core::tag_key::TagKey;
use dockyard_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::models::repository_tag::{CreateRepositoryTag, RepositoryTag, UpdateRepositoryTag};
use crate::storage::Record;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, namespace, repository, description, tag_name, tag_json, tag, \
                        version, created_at, updated_at";

impl Record for RepositoryTag {
    const ENTITY: &'static str = "repository tag";
    const TABLE: &'static str = "repository_tags";
    const COLUMNS: &'static str = COLUMNS;
}

/// Tag binding queries: insert, keyed delete, row and per-key locks,
/// guarded update.
pub struct RepositoryTagRepo;

impl RepositoryTagRepo {
    /// Insert a new tag binding, returning the created row.
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateRepositoryTag,
    ) -> Result<RepositoryTag, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO repository_tags (namespace, repository, description, tag_name, tag_json, tag)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RepositoryTag>(&query)
            .bind(&input.namespace)
            .bind(&input.repository)
            .bind(&input.description)
            .bind(&input.tag_name)
            .bind(&input.tag_json)
            .bind(&input.tag)
            .fetch_one(executor)
            .await
    }

    /// Take a transaction-scoped advisory lock on `key`.
    ///
    /// Must run inside a transaction; the lock is released on commit or
    /// rollback. Concurrent holders of the same key queue behind each other.
    pub async fn lock_key<'e, E>(executor: E, key: &TagKey) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(key.lock_key())
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Delete the binding for `key`, if any. Returns the number of rows removed.
    pub async fn delete_by_key<'e, E>(executor: E, key: &TagKey) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM repository_tags \
             WHERE namespace = $1 AND repository = $2 AND tag_name = $3",
        )
        .bind(&key.namespace)
        .bind(&key.repository)
        .bind(&key.tag_name)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Load a tag and hold a row lock until the surrounding transaction ends.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<RepositoryTag>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM repository_tags WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, RepositoryTag>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Update a tag in place. Only non-`None` fields are applied, and only if
    /// the stored version equals `input.version`. Increments the version.
    ///
    /// Returns `None` if no row with that id and version exists.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateRepositoryTag,
    ) -> Result<Option<RepositoryTag>, sqlx::Error> {
        let query = format!(
            "UPDATE repository_tags SET
                namespace = COALESCE($3, namespace),
                repository = COALESCE($4, repository),
                description = COALESCE($5, description),
                tag_name = COALESCE($6, tag_name),
                tag_json = COALESCE($7, tag_json),
                tag = COALESCE($8, tag),
                version = version + 1
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RepositoryTag>(&query)
            .bind(id)
            .bind(input.version)
            .bind(&input.namespace)
            .bind(&input.repository)
            .bind(&input.description)
            .bind(&input.tag_name)
            .bind(&input.tag_json)
            .bind(&input.tag)
            .fetch_optional(conn)
            .await
    }
}
