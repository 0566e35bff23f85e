//! User lookup, credential and token verification, and guarded user updates.

use dockyard_core::error::CoreError;
use dockyard_core::password::{
    burn_verification, hash_password, validate_password_hash, validate_password_strength,
    verify_password,
};
use dockyard_core::tokens::{generate_token, hash_token};
use dockyard_core::validation::{validate_email, validate_username};

use crate::error::{DbResult, RequiredExt};
use crate::models::user::{CreateUser, NewUser, User};
use crate::repositories::UserRepo;
use crate::storage::{Filter, Record, Storage};

/// Message shared by every credential failure so callers cannot tell an
/// unknown user from a wrong password.
const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub struct AuthService<'a> {
    storage: &'a Storage,
}

impl<'a> AuthService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a user, hashing the supplied password.
    ///
    /// A duplicate username or email surfaces as
    /// [`DbError::UniquenessViolation`](crate::DbError::UniquenessViolation).
    #[tracing::instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register_user(&self, input: NewUser) -> DbResult<User> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        validate_password_strength(&input.password)?;

        let password_hash = hash_password(&input.password)
            .map_err(|e| CoreError::Internal(format!("Password hashing error: {e}")))?;
        let user = UserRepo::create(
            self.storage.pool(),
            &CreateUser {
                username: input.username,
                email: input.email,
                password_hash,
            },
        )
        .await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Look a user up by exact username.
    pub async fn lookup_user_by_name(&self, username: &str) -> DbResult<User> {
        self.storage
            .find_one_by::<User>(&Filter::new().eq("username", username))
            .await
            .required(User::ENTITY, username)
    }

    /// Look a user up by username and the plaintext token they presented.
    pub async fn lookup_user_by_token(&self, username: &str, token: &str) -> DbResult<User> {
        UserRepo::find_by_token_hash(self.storage.pool(), username, &hash_token(token))
            .await?
            .ok_or_else(|| CoreError::not_found(User::ENTITY, username).into())
    }

    /// Check a username/password pair, returning the user on success.
    ///
    /// The row is loaded by username alone and the password is checked with
    /// Argon2 in constant time. An unknown username still pays for one
    /// verification before failing.
    #[tracing::instrument(skip(self, password))]
    pub async fn verify_credentials(&self, username: &str, password: &str) -> DbResult<User> {
        let found = self
            .storage
            .find_one_by::<User>(&Filter::new().eq("username", username))
            .await?;

        let Some(user) = found else {
            burn_verification(password);
            tracing::debug!("Credential check for unknown user");
            return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()).into());
        };

        let valid = verify_password(password, &user.password_hash)
            .map_err(|e| CoreError::Internal(format!("Password verification error: {e}")))?;
        if !valid {
            tracing::debug!(user_id = user.id, "Password mismatch");
            return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()).into());
        }
        Ok(user)
    }

    /// Write back a full user record.
    ///
    /// `user.version` must be the version read when the record was loaded;
    /// if another writer got there first this fails with `Conflict`.
    #[tracing::instrument(skip(self, user), fields(user_id = user.id, version = user.version))]
    pub async fn update_user(&self, user: &User) -> DbResult<User> {
        validate_username(&user.username)?;
        validate_email(&user.email)?;
        validate_password_hash(&user.password_hash)?;

        match UserRepo::update(self.storage.pool(), user).await? {
            Some(updated) => Ok(updated),
            None => Err(self.storage.explain_missed_update::<User>(user.id).await),
        }
    }

    /// Replace a user's password.
    pub async fn change_password(&self, user: &User, new_password: &str) -> DbResult<User> {
        validate_password_strength(new_password)?;
        let password_hash = hash_password(new_password)
            .map_err(|e| CoreError::Internal(format!("Password hashing error: {e}")))?;
        self.update_user(&User {
            password_hash,
            ..user.clone()
        })
        .await
    }

    /// Issue a fresh API token, replacing any previous one.
    ///
    /// Returns the updated user and the plaintext token, which is not
    /// recoverable afterwards.
    pub async fn issue_token(&self, user: &User) -> DbResult<(User, String)> {
        let token = generate_token();
        let updated = self
            .update_user(&User {
                token_hash: Some(token.hash),
                ..user.clone()
            })
            .await?;
        tracing::info!(user_id = updated.id, "API token issued");
        Ok((updated, token.plaintext))
    }
}
