use crate::context::StorageContext;
use crate::error::{Result, StorageError};

const MSG_DELETED: &str = "File deleted successfully";
const MSG_DELETE_FAILED: &str = "Failed to delete file";

/// Delete the object stored at `path`
///
/// Reports the outcome to the context's notifier. A missing object is an
/// error.
pub async fn delete_file(ctx: &StorageContext, path: &str) -> Result<()> {
    let notifier = ctx.notifier();

    if path.trim().is_empty() {
        let err = StorageError::invalid_parameter("path", "Path cannot be empty");
        log::error!("Error deleting file: {}", err);
        notifier.error(MSG_DELETE_FAILED);
        return Err(err);
    }

    let reference = ctx.client().reference(path);

    match ctx.client().delete_object(&reference).await {
        Ok(()) => {
            log::info!("Deleted {}", reference);
            notifier.success(MSG_DELETED);
            Ok(())
        }
        Err(err) => {
            log::error!("Error deleting {}: {}", reference, err);
            notifier.error(MSG_DELETE_FAILED);
            Err(err)
        }
    }
}

/// Check whether an object is stored at `path`
pub async fn exists(ctx: &StorageContext, path: &str) -> Result<bool> {
    if path.trim().is_empty() {
        return Err(StorageError::invalid_parameter(
            "path",
            "Path cannot be empty",
        ));
    }

    let reference = ctx.client().reference(path);
    match ctx.client().metadata(&reference).await {
        Ok(_) => Ok(true),
        Err(StorageError::ObjectNotFound { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}
