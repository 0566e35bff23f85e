//! Registered registry user.

use dockyard_core::types::{DbId, RowVersion, Timestamp};
use sqlx::FromRow;

/// Full row from the `users` table.
///
/// Carries the password and token hashes, so it is deliberately not
/// `Serialize`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub token_hash: Option<String>,
    pub version: RowVersion,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Registration input. The password is plaintext here and is hashed before
/// it reaches the repository.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Insert payload for [`crate::repositories::UserRepo::create`].
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}
