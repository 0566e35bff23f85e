//! Entity structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - An update DTO carrying the expected `version` for guarded writes

pub mod image;
pub mod repository_tag;
pub mod user;
