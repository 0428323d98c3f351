//! Upload helpers
//!
//! This module provides the file and image upload helpers together with the
//! payload, option and progress types they use.

pub mod operations;
pub mod types;

pub use operations::{upload_file, upload_image};
pub use types::{ProgressCallback, ProgressThrottle, UploadFile, UploadOptions, UploadProgress};
