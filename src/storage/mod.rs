//! Storage management helpers
//!
//! - [`delete_file()`] - Delete a stored object and notify the user
//! - [`exists()`] - Check whether an object is stored at a path

pub mod crud;

pub use crud::{delete_file, exists};
