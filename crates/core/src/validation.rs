//! Field constraints for users, images, and tags.
//!
//! These mirror the storage-level constraints so bad input is rejected with
//! a readable message before it reaches the database.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Maximum email length (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum external image identifier length.
pub const MAX_IMAGE_ID_LENGTH: usize = 128;

/// Maximum namespace or repository length.
pub const MAX_REPOSITORY_PATH_LENGTH: usize = 255;

/// Maximum tag name length.
pub const MAX_TAG_NAME_LENGTH: usize = 128;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid username regex"));

static IMAGE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9:._-]+$").expect("valid image id regex"));

static REPOSITORY_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._/-]+$").expect("valid repository path regex"));

static TAG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]*$").expect("valid tag regex"));

fn check_length(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), CoreError> {
    check_length("username", username, MAX_USERNAME_LENGTH)?;
    if !USERNAME_RE.is_match(username) {
        return Err(CoreError::Validation(format!(
            "username '{username}' may only contain letters, digits, '.', '_' and '-'"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), CoreError> {
    check_length("email", email, MAX_EMAIL_LENGTH)?;
    let mut parts = email.split('@');
    let well_formed = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        _ => false,
    };
    if !well_formed {
        return Err(CoreError::Validation(format!(
            "email '{email}' is not a valid address"
        )));
    }
    Ok(())
}

pub fn validate_image_id(image_id: &str) -> Result<(), CoreError> {
    check_length("image_id", image_id, MAX_IMAGE_ID_LENGTH)?;
    if !IMAGE_ID_RE.is_match(image_id) {
        return Err(CoreError::Validation(format!(
            "image_id '{image_id}' contains invalid characters"
        )));
    }
    Ok(())
}

/// Validate a namespace or repository name. `field` names the component in
/// the error message.
pub fn validate_repository_path(field: &str, value: &str) -> Result<(), CoreError> {
    check_length(field, value, MAX_REPOSITORY_PATH_LENGTH)?;
    if !REPOSITORY_PATH_RE.is_match(value) {
        return Err(CoreError::Validation(format!(
            "{field} '{value}' may only contain lowercase letters, digits, '.', '_', '/' and '-'"
        )));
    }
    Ok(())
}

pub fn validate_tag_name(tag_name: &str) -> Result<(), CoreError> {
    check_length("tag_name", tag_name, MAX_TAG_NAME_LENGTH)?;
    if !TAG_NAME_RE.is_match(tag_name) {
        return Err(CoreError::Validation(format!(
            "tag_name '{tag_name}' is not a valid tag"
        )));
    }
    Ok(())
}
