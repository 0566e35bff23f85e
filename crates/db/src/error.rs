use dockyard_core::error::CoreError;

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL SQLSTATE for `check_violation`.
const CHECK_VIOLATION: &str = "23514";

/// Error returned by every per-call repository and service operation.
///
/// Wraps [`CoreError`] for domain failures and adds storage-specific
/// variants. Converting from [`sqlx::Error`] classifies constraint
/// violations so callers never have to inspect SQLSTATE codes.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A domain-level error from `dockyard_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A unique constraint rejected the write.
    #[error("Duplicate value violates unique constraint: {constraint}")]
    UniquenessViolation { constraint: String },

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// Convenience alias for repository and service results.
pub type DbResult<T> = Result<T, DbError>;

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                    tracing::debug!(%constraint, "Unique constraint violated");
                    return DbError::UniquenessViolation { constraint };
                }
                Some(CHECK_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("unknown");
                    return DbError::Core(CoreError::Validation(format!(
                        "Value violates check constraint: {constraint}"
                    )));
                }
                _ => {}
            }
        }
        DbError::Database(err)
    }
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::Core(CoreError::NotFound { .. }))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Core(CoreError::Conflict(_)))
    }
}

/// Lets callers move between the two shapes "not found" takes: an empty
/// `Option` from lookups and a typed [`CoreError::NotFound`] from services.
pub trait NotFoundExt<T> {
    /// Turn a typed not-found error into `Ok(None)`.
    fn optional(self) -> DbResult<Option<T>>;
}

impl<T> NotFoundExt<T> for DbResult<T> {
    fn optional(self) -> DbResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// The inverse of [`NotFoundExt::optional`].
pub trait RequiredExt<T> {
    /// Turn `Ok(None)` into a typed not-found error for `entity`/`key`.
    fn required(self, entity: &'static str, key: impl ToString) -> DbResult<T>;
}

impl<T> RequiredExt<T> for DbResult<Option<T>> {
    fn required(self, entity: &'static str, key: impl ToString) -> DbResult<T> {
        self?.ok_or_else(|| CoreError::not_found(entity, key).into())
    }
}

/// Fatal errors raised while bringing storage up at process start.
///
/// These are not retried: the bootstrap binary logs them and exits.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Failed to synchronise database schema: {0}")]
    SchemaSync(#[from] sqlx::migrate::MigrateError),
}
