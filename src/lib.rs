pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod notify;

pub mod storage;
pub mod upload;

pub use client::{
    LocalStorageClient, MemoryStorageClient, ObjectMetadata, StorageClient, StorageReference,
    TaskEvent, TaskSnapshot, TaskState, UploadMetadata, UploadTask,
};

pub use config::StorageConfig;

pub use context::StorageContext;

pub use error::{Result, StorageError};

pub use format::format_file_size;

pub use notify::{LogNotifier, Notification, NotificationLevel, NotificationLog, Notifier};

pub use storage::{delete_file, exists};

pub use upload::{
    upload_file, upload_image, ProgressCallback, UploadFile, UploadOptions, UploadProgress,
};
