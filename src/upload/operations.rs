//! Upload helpers
//!
//! Both helpers validate the payload before the storage client is touched,
//! then drive the client's resumable upload task to completion and resolve
//! the download URL of the stored object.

use crate::client::{TaskEvent, UploadMetadata};
use crate::context::StorageContext;
use crate::error::{Result, StorageError};
use crate::format::format_file_size;
use crate::upload::types::{ProgressThrottle, UploadFile, UploadOptions, UploadProgress};
use bytesize::ByteSize;
use futures::StreamExt;

const MSG_MISSING_INPUT: &str = "File and path are required";
const MSG_INIT_FAILED: &str = "Failed to initialize upload";
const MSG_UPLOAD_FAILED: &str = "Failed to upload file";
const MSG_URL_FAILED: &str = "Failed to get file download link";
const MSG_UPLOADED: &str = "File uploaded successfully";
const MSG_NOT_IMAGE: &str = "Only images can be uploaded";

/// Upload a file and return its download URL
///
/// The payload must be non-empty, the path must name an object, and the
/// payload may not exceed the configured size limit. Progress is reported
/// through `options.on_progress`, throttled to changes of at least
/// `progress_threshold` percentage points.
///
/// # Errors
///
/// Returns an error if:
/// - The path or the payload is empty
/// - The payload is larger than `max_file_size`
/// - The transfer fails or is cancelled
/// - The download URL cannot be resolved
///
/// Every failure is also logged and reported to the context's notifier.
pub async fn upload_file(
    ctx: &StorageContext,
    file: &UploadFile,
    path: &str,
    options: UploadOptions,
) -> Result<String> {
    validate_upload(ctx, file, path)?;

    let client = ctx.client();
    let notifier = ctx.notifier();
    let config = ctx.config();

    let reference = client.reference(path);
    let mut metadata = UploadMetadata::new(file.content_type.clone()).cache_control(
        options
            .cache_control
            .clone()
            .unwrap_or_else(|| config.cache_control.clone()),
    );
    metadata.custom_metadata = options.custom_metadata.clone();

    log::debug!(
        "Uploading {} ({}) to {}",
        file.name,
        ByteSize::b(file.size()),
        reference
    );

    let mut task = client
        .upload_resumable(&reference, file.data.clone(), metadata)
        .map_err(|e| {
            log::error!("Failed to start upload of {}: {}", file.name, e);
            notifier.error(MSG_INIT_FAILED);
            e
        })?;

    let mut throttle = ProgressThrottle::new(config.progress_threshold);

    while let Some(event) = task.next().await {
        match event {
            TaskEvent::Progress(snapshot) => {
                let progress = UploadProgress::from(&snapshot);
                if let Some(callback) = options.on_progress.as_ref() {
                    if throttle.should_report(progress.percentage) {
                        log::debug!("Upload of {}: {:.1}%", file.name, progress.percentage);
                        callback(progress);
                    }
                }
            }
            TaskEvent::Failed(err) => {
                log::error!("Upload of {} failed: {}", file.name, err);
                notifier.error(MSG_UPLOAD_FAILED);
                return Err(match err {
                    StorageError::Cancelled { .. } | StorageError::UploadError { .. } => err,
                    other => StorageError::upload_error(other.to_string()),
                });
            }
            TaskEvent::Completed(snapshot) => {
                return match client.download_url(&snapshot.reference).await {
                    Ok(url) => {
                        log::info!("Upload completed for {}", file.name);
                        notifier.success(MSG_UPLOADED);
                        Ok(url)
                    }
                    Err(err) => {
                        log::error!("Failed to get download URL for {}: {}", file.name, err);
                        notifier.error(MSG_URL_FAILED);
                        Err(match err {
                            StorageError::DownloadUrlError { .. } => err,
                            other => StorageError::download_url_error(other.to_string()),
                        })
                    }
                };
            }
        }
    }

    log::error!("Upload of {} ended without a result", file.name);
    notifier.error(MSG_UPLOAD_FAILED);
    Err(StorageError::upload_error(
        "Upload task ended without completing",
    ))
}

/// Upload a file whose declared media type is `image/*`
///
/// Anything else is rejected before the upload starts.
pub async fn upload_image(ctx: &StorageContext, file: &UploadFile, path: &str) -> Result<String> {
    if !file.is_image() {
        log::error!(
            "Rejected {}: content type '{}' is not an image",
            file.name,
            file.content_type
        );
        ctx.notifier().error(MSG_NOT_IMAGE);
        return Err(StorageError::invalid_file_type(file.content_type.clone()));
    }

    upload_file(ctx, file, path, UploadOptions::default()).await
}

fn validate_upload(ctx: &StorageContext, file: &UploadFile, path: &str) -> Result<()> {
    let notifier = ctx.notifier();

    if path.trim().is_empty() || file.is_empty() {
        let err = if file.is_empty() {
            StorageError::invalid_parameter("file", "File cannot be empty")
        } else {
            StorageError::invalid_parameter("path", "Path cannot be empty")
        };
        log::error!("Rejected upload of '{}': {}", file.name, err);
        notifier.error(MSG_MISSING_INPUT);
        return Err(err);
    }

    if ctx.client().reference(path).is_root() {
        let err = StorageError::invalid_parameter("path", "Path must name an object");
        log::error!("Rejected upload of '{}': {}", file.name, err);
        notifier.error(MSG_MISSING_INPUT);
        return Err(err);
    }

    let limit = ctx.config().max_file_size;
    if file.size() > limit {
        let err = StorageError::file_too_large(file.size(), limit);
        log::error!("Rejected upload of '{}': {}", file.name, err);
        notifier.error(&format!(
            "File is too large (maximum {})",
            format_file_size(limit)
        ));
        return Err(err);
    }

    Ok(())
}
