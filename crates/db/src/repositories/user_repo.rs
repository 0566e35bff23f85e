//! Repository for the `users` table.

use sqlx::PgPool;

use crate::models::user::{CreateUser, User};
use crate::storage::Record;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, email, password_hash, token_hash, \
                        version, created_at, updated_at";

impl Record for User {
    const ENTITY: &'static str = "user";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = COLUMNS;
}

/// Provides insert, lookup, and guarded update for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Find a user by username and token hash.
    pub async fn find_by_token_hash(
        pool: &PgPool,
        username: &str,
        token_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1 AND token_hash = $2");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Write every mutable column of `user`, provided the stored version
    /// still equals `user.version`. Increments the version.
    ///
    /// Returns `None` if no row with that id and version exists.
    pub async fn update(pool: &PgPool, user: &User) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                username = $3,
                email = $4,
                password_hash = $5,
                token_hash = $6,
                version = version + 1
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(user.version)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.token_hash)
            .fetch_optional(pool)
            .await
    }
}
