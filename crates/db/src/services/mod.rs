//! Operations the registry protocol layer calls.
//!
//! Each service borrows the shared [`Storage`](crate::Storage) and returns
//! [`DbResult`](crate::DbResult). Nothing here retries; a `Conflict` means
//! the caller should reload and try again.

pub mod auth;
pub mod images;
pub mod tags;

pub use auth::AuthService;
pub use images::ImageService;
pub use tags::TagService;
