//! In-process storage client
//!
//! Objects live in a map guarded by a mutex. Uploads are driven on a tokio
//! task in `chunk_size` steps exactly like the local client, so progress
//! reporting behaves the same. Failures can be injected per operation.

use crate::client::reference::StorageReference;
use crate::client::task::{TaskHandle, UploadTask};
use crate::client::types::{download_url, ObjectMetadata, UploadMetadata};
use crate::client::{spawn_upload, StorageClient};
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    metadata: ObjectMetadata,
}

#[derive(Debug, Default, Clone, Copy)]
struct Failures {
    upload_after_bytes: Option<u64>,
    download_url: bool,
    delete: bool,
}

#[derive(Debug)]
struct Inner {
    bucket: String,
    download_base_url: String,
    chunk_size: usize,
    objects: Mutex<HashMap<String, StoredObject>>,
    failures: Mutex<Failures>,
    upload_attempts: AtomicUsize,
}

/// Storage client keeping objects in memory
#[derive(Debug, Clone)]
pub struct MemoryStorageClient {
    inner: Arc<Inner>,
}

impl Default for MemoryStorageClient {
    fn default() -> Self {
        Self::new(&StorageConfig::default())
    }
}

impl MemoryStorageClient {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                bucket: config.bucket.clone(),
                download_base_url: config.download_base_url.clone(),
                chunk_size: config.chunk_size.max(1),
                objects: Mutex::new(HashMap::new()),
                failures: Mutex::new(Failures::default()),
                upload_attempts: AtomicUsize::new(0),
            }),
        }
    }

    /// Make uploads fail once `bytes` have been transferred
    pub fn fail_uploads_after(&self, bytes: u64) {
        lock(&self.inner.failures).upload_after_bytes = Some(bytes);
    }

    pub fn fail_download_urls(&self, fail: bool) {
        lock(&self.inner.failures).download_url = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        lock(&self.inner.failures).delete = fail;
    }

    /// Clear all injected failures
    pub fn heal(&self) {
        *lock(&self.inner.failures) = Failures::default();
    }

    /// Number of uploads started on this client
    pub fn upload_attempts(&self) -> usize {
        self.inner.upload_attempts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, path: &str) -> bool {
        let reference = self.reference(path);
        lock(&self.inner.objects).contains_key(reference.full_path())
    }

    pub fn object_data(&self, path: &str) -> Option<Vec<u8>> {
        let reference = self.reference(path);
        lock(&self.inner.objects)
            .get(reference.full_path())
            .map(|object| object.data.clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner.objects).is_empty()
    }

    async fn drive_upload(
        inner: &Inner,
        handle: &mut TaskHandle,
        data: Vec<u8>,
        metadata: UploadMetadata,
    ) -> Result<()> {
        let reference = handle.snapshot().reference.clone();
        let fail_after = lock(&inner.failures).upload_after_bytes;

        for chunk in data.chunks(inner.chunk_size) {
            handle.checkpoint().await?;

            if let Some(limit) = fail_after {
                if handle.snapshot().bytes_transferred >= limit {
                    return Err(StorageError::upload_error(format!(
                        "Injected failure after {} bytes",
                        limit
                    )));
                }
            }

            handle.advance(chunk.len() as u64);
            tokio::task::yield_now().await;
        }

        let object_metadata = ObjectMetadata::for_upload(
            &inner.bucket,
            reference.full_path(),
            &data,
            &metadata,
        );
        lock(&inner.objects).insert(
            reference.full_path().to_string(),
            StoredObject {
                data,
                metadata: object_metadata,
            },
        );

        Ok(())
    }
}

impl StorageClient for MemoryStorageClient {
    fn bucket(&self) -> &str {
        &self.inner.bucket
    }

    fn upload_resumable(
        &self,
        reference: &StorageReference,
        data: Vec<u8>,
        metadata: UploadMetadata,
    ) -> Result<UploadTask> {
        if reference.is_root() {
            return Err(StorageError::root_operation("upload"));
        }

        self.inner.upload_attempts.fetch_add(1, Ordering::SeqCst);

        let (task, mut handle) = UploadTask::channel(reference.clone(), data.len() as u64);
        let inner = Arc::clone(&self.inner);

        spawn_upload(async move {
            match Self::drive_upload(&inner, &mut handle, data, metadata).await {
                Ok(()) => handle.complete(),
                Err(err) => handle.fail(err),
            }
        })?;

        Ok(task)
    }

    fn download_url<'a>(&'a self, reference: &'a StorageReference) -> BoxFuture<'a, Result<String>> {
        async move {
            if lock(&self.inner.failures).download_url {
                return Err(StorageError::download_url_error(
                    "Injected download URL failure",
                ));
            }

            let token = lock(&self.inner.objects)
                .get(reference.full_path())
                .map(|object| object.metadata.download_token.clone())
                .ok_or_else(|| StorageError::object_not_found(reference.full_path()))?;

            download_url(
                &self.inner.download_base_url,
                &self.inner.bucket,
                reference.full_path(),
                &token,
            )
        }
        .boxed()
    }

    fn delete_object<'a>(&'a self, reference: &'a StorageReference) -> BoxFuture<'a, Result<()>> {
        async move {
            if reference.is_root() {
                return Err(StorageError::root_operation("delete"));
            }

            if lock(&self.inner.failures).delete {
                return Err(StorageError::delete_error(
                    reference.full_path(),
                    "Injected delete failure",
                ));
            }

            lock(&self.inner.objects)
                .remove(reference.full_path())
                .map(|_| ())
                .ok_or_else(|| StorageError::object_not_found(reference.full_path()))
        }
        .boxed()
    }

    fn metadata<'a>(
        &'a self,
        reference: &'a StorageReference,
    ) -> BoxFuture<'a, Result<ObjectMetadata>> {
        async move {
            lock(&self.inner.objects)
                .get(reference.full_path())
                .map(|object| object.metadata.clone())
                .ok_or_else(|| StorageError::object_not_found(reference.full_path()))
        }
        .boxed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
