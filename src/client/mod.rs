//! Object-storage client seam
//!
//! The helpers only talk to storage through [`StorageClient`]. Two clients
//! ship with the crate:
//!
//! - [`LocalStorageClient`] - a bucket backed by a directory on disk
//! - [`MemoryStorageClient`] - an in-process bucket with failure injection

pub mod local;
pub mod memory;
pub mod reference;
pub mod task;
pub mod types;

pub use local::LocalStorageClient;
pub use memory::MemoryStorageClient;
pub use reference::StorageReference;
pub use task::{TaskEvent, TaskHandle, TaskSnapshot, TaskState, UploadTask};
pub use types::{download_url, ObjectMetadata, UploadMetadata};

use crate::error::Result;
use futures::future::BoxFuture;

/// Operations the helpers need from an object store
pub trait StorageClient: Send + Sync {
    /// Bucket this client stores objects in
    fn bucket(&self) -> &str;

    /// Build a reference to `path` in this client's bucket
    fn reference(&self, path: &str) -> StorageReference {
        StorageReference::new(self.bucket(), path)
    }

    /// Start a resumable upload of `data` to `reference`
    ///
    /// Returns as soon as the transfer is scheduled; progress and the
    /// outcome arrive on the returned task.
    fn upload_resumable(
        &self,
        reference: &StorageReference,
        data: Vec<u8>,
        metadata: UploadMetadata,
    ) -> Result<UploadTask>;

    /// Resolve a download URL for a stored object
    fn download_url<'a>(&'a self, reference: &'a StorageReference) -> BoxFuture<'a, Result<String>>;

    /// Delete a stored object
    fn delete_object<'a>(&'a self, reference: &'a StorageReference) -> BoxFuture<'a, Result<()>>;

    /// Fetch the metadata recorded for a stored object
    fn metadata<'a>(
        &'a self,
        reference: &'a StorageReference,
    ) -> BoxFuture<'a, Result<ObjectMetadata>>;
}

/// Spawn the driver of an upload on the current tokio runtime
pub(crate) fn spawn_upload<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
        crate::error::StorageError::upload_error(format!("No async runtime available: {}", e))
    })?;
    runtime.spawn(future);
    Ok(())
}
