//! Domain primitives for the Dockyard registry metadata layer.
//!
//! Nothing in this crate performs I/O. The `db` crate builds on these types
//! for persistence, and the protocol layer can use them directly.

pub mod error;
pub mod hashing;
pub mod image_state;
pub mod password;
pub mod tag_key;
pub mod tokens;
pub mod types;
pub mod validation;
