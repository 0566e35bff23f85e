//! Persistence gateway: connection lifecycle, schema, and generic typed
//! lookups shared by every entity.

use dockyard_core::error::CoreError;
use dockyard_core::types::DbId;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::config::DbConfig;
use crate::error::{DbError, DbResult, StartupError};

/// An entity kind the gateway can query generically.
pub trait Record: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    /// Human-readable entity name used in error messages.
    const ENTITY: &'static str;
    /// Backing table.
    const TABLE: &'static str;
    /// Comma-separated select list; also the set of columns a [`Filter`]
    /// may reference.
    const COLUMNS: &'static str;

    fn has_column(column: &str) -> bool {
        Self::COLUMNS.split(',').any(|c| c.trim() == column)
    }
}

/// A value bound into a [`Filter`] predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// Conjunction of `column = value` predicates with an optional ascending
/// sort column.
///
/// Column names are checked against the target [`Record`]'s declared
/// columns when the query is built; values are always bound parameters.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(&'static str, FilterValue)>,
    order_by: Option<&'static str>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `column = value` predicate.
    pub fn eq(mut self, column: &'static str, value: impl Into<FilterValue>) -> Self {
        self.clauses.push((column, value.into()));
        self
    }

    /// Sort results ascending by `column`.
    pub fn order_by(mut self, column: &'static str) -> Self {
        self.order_by = Some(column);
        self
    }

    fn check_columns<R: Record>(&self) -> Result<(), CoreError> {
        let referenced = self
            .clauses
            .iter()
            .map(|(column, _)| *column)
            .chain(self.order_by);
        for column in referenced {
            if !R::has_column(column) {
                return Err(CoreError::Validation(format!(
                    "Unknown column '{column}' for {}",
                    R::ENTITY
                )));
            }
        }
        Ok(())
    }

    /// Build `{head} FROM {table} WHERE ... [ORDER BY ...]`.
    fn build<R: Record>(&self, head: &str) -> Result<QueryBuilder<'static, Postgres>, CoreError> {
        self.check_columns::<R>()?;

        let mut qb = QueryBuilder::new(format!("{head} FROM {}", R::TABLE));
        for (i, (column, value)) in self.clauses.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(*column).push(" = ");
            match value {
                FilterValue::Text(text) => qb.push_bind(text.clone()),
                FilterValue::Int(int) => qb.push_bind(*int),
                FilterValue::Bool(flag) => qb.push_bind(*flag),
            };
        }
        if let Some(column) = self.order_by {
            qb.push(" ORDER BY ").push(column);
        }
        Ok(qb)
    }
}

/// Explicitly constructed storage client.
///
/// Holds the connection pool for the lifetime of the process. Services take
/// it by reference; cloning is cheap and shares the same pool.
#[derive(Debug, Clone)]
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    /// Open a connection pool. Does not touch the schema.
    pub async fn open(config: &DbConfig) -> Result<Self, StartupError> {
        let pool = crate::create_pool(config)
            .await
            .map_err(StartupError::Connection)?;
        tracing::info!(
            max_connections = config.max_connections,
            "Database connection pool created"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests that receive a pool per case).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Verify the server answers queries.
    pub async fn health_check(&self) -> Result<(), StartupError> {
        crate::health_check(&self.pool)
            .await
            .map_err(StartupError::Connection)
    }

    /// Create or migrate the user, image, and tag tables.
    pub async fn ensure_schema(&self) -> Result<(), StartupError> {
        crate::run_migrations(&self.pool).await?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }

    /// Close every pooled connection. Later queries on clones fail.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database connection pool closed");
    }

    /// Fetch at most one row matching `filter`. No match is `Ok(None)`.
    pub async fn find_one_by<R: Record>(&self, filter: &Filter) -> DbResult<Option<R>> {
        let mut qb = filter.build::<R>(&format!("SELECT {}", R::COLUMNS))?;
        qb.push(" LIMIT 1");
        Ok(qb.build_query_as::<R>().fetch_optional(&self.pool).await?)
    }

    /// Fetch every row matching `filter`.
    pub async fn find_many_by<R: Record>(&self, filter: &Filter) -> DbResult<Vec<R>> {
        let mut qb = filter.build::<R>(&format!("SELECT {}", R::COLUMNS))?;
        Ok(qb.build_query_as::<R>().fetch_all(&self.pool).await?)
    }

    /// Count rows matching `filter`.
    pub async fn count_by<R: Record>(&self, filter: &Filter) -> DbResult<i64> {
        let mut qb = filter.build::<R>("SELECT COUNT(*)")?;
        let (count,) = qb
            .build_query_as::<(i64,)>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Whether a row with the given primary key exists.
    pub async fn exists<R: Record>(&self, id: DbId) -> DbResult<bool> {
        Ok(self.count_by::<R>(&Filter::new().eq("id", id)).await? > 0)
    }

    /// Work out why a version-guarded `UPDATE ... WHERE id = $1 AND version = $2`
    /// matched no row: the row is gone (`NotFound`) or moved on (`Conflict`).
    pub async fn explain_missed_update<R: Record>(&self, id: DbId) -> DbError {
        match self.exists::<R>(id).await {
            Ok(true) => {
                tracing::warn!(entity = R::ENTITY, id, "Rejected write with stale version");
                CoreError::stale_version(R::ENTITY, id).into()
            }
            Ok(false) => CoreError::not_found(R::ENTITY, id).into(),
            Err(err) => err,
        }
    }

    /// Delete a row by primary key. Returns `true` if a row was removed.
    pub async fn delete_by_id<R: Record>(&self, id: DbId) -> DbResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", R::TABLE))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Open storage, confirm it answers, and bring the schema up to date.
///
/// Any failure here is fatal: callers are expected to terminate rather than
/// serve traffic against a store that is unreachable or missing tables.
pub async fn initialize_storage(config: &DbConfig) -> Result<Storage, StartupError> {
    let storage = Storage::open(config).await?;
    storage.health_check().await?;
    tracing::info!("Database health check passed");
    storage.ensure_schema().await?;
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use sqlx::Execute;

    use super::*;
    use crate::models::repository_tag::RepositoryTag;

    #[test]
    fn builds_where_clause_with_placeholders() {
        let filter = Filter::new()
            .eq("namespace", "ns1")
            .eq("repository", "r1")
            .order_by("tag_name");
        let mut qb = filter.build::<RepositoryTag>("SELECT id").unwrap();
        let sql = qb.build().sql().to_string();
        assert_eq!(
            sql,
            "SELECT id FROM repository_tags WHERE namespace = $1 AND repository = $2 ORDER BY tag_name"
        );
    }

    #[test]
    fn empty_filter_has_no_where_clause() {
        let mut qb = Filter::new().build::<RepositoryTag>("SELECT id").unwrap();
        assert_eq!(qb.build().sql(), "SELECT id FROM repository_tags");
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let injected = Filter::new().eq("1 = 1; DROP TABLE users; --", "x");
        assert_matches!(
            injected.build::<RepositoryTag>("SELECT id").err(),
            Some(CoreError::Validation(msg)) if msg.contains("Unknown column")
        );

        let bad_order = Filter::new().order_by("password");
        assert!(bad_order.build::<RepositoryTag>("SELECT id").is_err());
    }

    #[test]
    fn column_lookup_ignores_whitespace() {
        assert!(RepositoryTag::has_column("tag_json"));
        assert!(RepositoryTag::has_column("updated_at"));
        assert!(!RepositoryTag::has_column("tag_json "));
    }
}
