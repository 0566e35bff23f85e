//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! a pool, connection, or executor as the first argument.

pub mod image_repo;
pub mod repository_tag_repo;
pub mod user_repo;

pub use image_repo::ImageRepo;
pub use repository_tag_repo::RepositoryTagRepo;
pub use user_repo::UserRepo;
