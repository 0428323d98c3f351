//! Filesystem-backed storage client
//!
//! Layout under the configured root directory:
//!
//! ```text
//! <root>/objects/<bucket>/<path>        object bytes
//! <root>/metadata/<bucket>/<path>.json  ObjectMetadata
//! <root>/uploads/<id>.part              in-flight uploads
//! ```
//!
//! Uploads are written chunk by chunk into a part file. Once complete, the
//! part file and a staged metadata file are renamed into place, object
//! first. A failed or cancelled upload never leaves a partial object or
//! orphaned metadata behind.

use crate::client::reference::StorageReference;
use crate::client::task::{TaskHandle, UploadTask};
use crate::client::types::{download_url, ObjectMetadata, UploadMetadata};
use crate::client::{spawn_upload, StorageClient};
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

static NEXT_UPLOAD_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct Inner {
    bucket: String,
    root_dir: PathBuf,
    download_base_url: String,
    chunk_size: usize,
    /// Serializes commits and deletes so an object and its metadata change together
    commit: tokio::sync::Mutex<()>,
}

impl Inner {
    fn object_path(&self, reference: &StorageReference) -> Result<PathBuf> {
        self.resolve("objects", reference, "")
    }

    fn metadata_path(&self, reference: &StorageReference) -> Result<PathBuf> {
        self.resolve("metadata", reference, ".json")
    }

    fn part_path(&self) -> PathBuf {
        let id = NEXT_UPLOAD_ID.fetch_add(1, Ordering::SeqCst);
        self.root_dir
            .join("uploads")
            .join(format!("{}-{}.part", std::process::id(), id))
    }

    fn resolve(&self, area: &str, reference: &StorageReference, suffix: &str) -> Result<PathBuf> {
        let mut path = self.root_dir.join(area).join(&self.bucket);
        let mut segments = reference.segments().peekable();

        while let Some(segment) = segments.next() {
            if segment == "." || segment == ".." || segment.contains(['\\', '\0']) {
                return Err(StorageError::invalid_parameter(
                    "path",
                    format!("Invalid path segment '{}'", segment),
                ));
            }

            if segments.peek().is_none() && !suffix.is_empty() {
                path.push(format!("{}{}", segment, suffix));
            } else {
                path.push(segment);
            }
        }

        Ok(path)
    }

    async fn read_metadata(&self, reference: &StorageReference) -> Result<ObjectMetadata> {
        let path = self.metadata_path(reference)?;
        let contents = fs::read(&path)
            .await
            .map_err(|e| not_found_or(e, reference))?;
        Ok(serde_json::from_slice(&contents)?)
    }
}

/// Storage client keeping a bucket in a local directory
#[derive(Debug, Clone)]
pub struct LocalStorageClient {
    inner: Arc<Inner>,
}

impl LocalStorageClient {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                bucket: config.bucket.clone(),
                root_dir: config.root_dir.clone(),
                download_base_url: config.download_base_url.clone(),
                chunk_size: config.chunk_size,
                commit: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.inner.root_dir
    }

    /// Location of the object's bytes on disk
    pub fn object_path(&self, path: &str) -> Result<PathBuf> {
        self.inner.object_path(&self.reference(path))
    }

    async fn drive_upload(
        inner: &Inner,
        handle: &mut TaskHandle,
        part_path: &Path,
        data: Vec<u8>,
        metadata: UploadMetadata,
    ) -> Result<()> {
        let reference = handle.snapshot().reference.clone();
        let object_path = inner.object_path(&reference)?;
        let metadata_path = inner.metadata_path(&reference)?;

        if let Some(parent) = part_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(part_path).await?;
        for chunk in data.chunks(inner.chunk_size) {
            handle.checkpoint().await?;
            file.write_all(chunk).await?;
            handle.advance(chunk.len() as u64);
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let object_metadata =
            ObjectMetadata::for_upload(&inner.bucket, reference.full_path(), &data, &metadata);
        let staged_metadata = staged_metadata_path(part_path);
        fs::write(&staged_metadata, serde_json::to_vec_pretty(&object_metadata)?).await?;

        let _commit = inner.commit.lock().await;
        for target in [&object_path, &metadata_path] {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::rename(part_path, &object_path).await?;
        if let Err(e) = fs::rename(&staged_metadata, &metadata_path).await {
            // Bytes without matching metadata would hand out a stale token
            remove_if_present(&object_path).await;
            remove_if_present(&metadata_path).await;
            return Err(e.into());
        }

        log::debug!(
            "Stored {} ({}) at {}",
            reference,
            object_metadata.size_string(),
            object_path.display()
        );

        Ok(())
    }
}

impl StorageClient for LocalStorageClient {
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
        // Reject bad paths before scheduling anything
        self.inner.object_path(reference)?;

        let (task, mut handle) = UploadTask::channel(reference.clone(), data.len() as u64);
        let inner = Arc::clone(&self.inner);
        let part_path = inner.part_path();

        spawn_upload(async move {
            match Self::drive_upload(&inner, &mut handle, &part_path, data, metadata).await {
                Ok(()) => handle.complete(),
                Err(err) => {
                    remove_if_present(&part_path).await;
                    remove_if_present(&staged_metadata_path(&part_path)).await;
                    handle.fail(err);
                }
            }
        })?;

        Ok(task)
    }

    fn download_url<'a>(&'a self, reference: &'a StorageReference) -> BoxFuture<'a, Result<String>> {
        async move {
            if reference.is_root() {
                return Err(StorageError::root_operation("download_url"));
            }

            let metadata = self.inner.read_metadata(reference).await?;
            download_url(
                &self.inner.download_base_url,
                &self.inner.bucket,
                reference.full_path(),
                &metadata.download_token,
            )
        }
        .boxed()
    }

    fn delete_object<'a>(&'a self, reference: &'a StorageReference) -> BoxFuture<'a, Result<()>> {
        async move {
            if reference.is_root() {
                return Err(StorageError::root_operation("delete"));
            }

            let object_path = self.inner.object_path(reference)?;
            let _commit = self.inner.commit.lock().await;
            fs::remove_file(&object_path)
                .await
                .map_err(|e| not_found_or(e, reference))?;

            let metadata_path = self.inner.metadata_path(reference)?;
            if let Err(e) = fs::remove_file(&metadata_path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(StorageError::delete_error(
                        reference.full_path(),
                        format!("Failed to remove metadata: {}", e),
                    ));
                }
            }

            Ok(())
        }
        .boxed()
    }

    fn metadata<'a>(
        &'a self,
        reference: &'a StorageReference,
    ) -> BoxFuture<'a, Result<ObjectMetadata>> {
        async move { self.inner.read_metadata(reference).await }.boxed()
    }
}

fn staged_metadata_path(part_path: &Path) -> PathBuf {
    part_path.with_extension("meta.json")
}

async fn remove_if_present(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

fn not_found_or(err: std::io::Error, reference: &StorageReference) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::object_not_found(reference.full_path())
    } else {
        StorageError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::task::{TaskEvent, TaskState};
    use futures::StreamExt;
    use tempfile::tempdir;

    fn client(root: &Path, chunk_size: usize) -> LocalStorageClient {
        let config = StorageConfig::new()
            .bucket("local")
            .root_dir(root)
            .chunk_size(chunk_size);
        LocalStorageClient::new(&config).unwrap()
    }

    async fn finish(mut task: UploadTask) -> std::result::Result<Vec<u64>, StorageError> {
        let mut progress = Vec::new();
        while let Some(event) = task.next().await {
            match event {
                TaskEvent::Progress(s) => progress.push(s.bytes_transferred),
                TaskEvent::Completed(_) => return Ok(progress),
                TaskEvent::Failed(e) => return Err(e),
            }
        }
        Err(StorageError::upload_error("stream ended early"))
    }

    #[tokio::test]
    async fn test_upload_writes_object_and_metadata() {
        let dir = tempdir().unwrap();
        let client = client(dir.path(), 3);
        let reference = client.reference("docs/notes.txt");

        let task = client
            .upload_resumable(&reference, b"hello world".to_vec(), UploadMetadata::new("text/plain"))
            .unwrap();
        let progress = finish(task).await.unwrap();

        assert_eq!(progress, vec![3, 6, 9, 11]);

        let object_path = client.object_path("docs/notes.txt").unwrap();
        assert_eq!(object_path, dir.path().join("objects/local/docs/notes.txt"));
        assert_eq!(std::fs::read(&object_path).unwrap(), b"hello world");

        let metadata = client.metadata(&reference).await.unwrap();
        assert_eq!(metadata.size, 11);
        assert_eq!(metadata.name, "notes.txt");

        let uploads = dir.path().join("uploads");
        assert_eq!(std::fs::read_dir(uploads).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_url_uses_stored_token() {
        let dir = tempdir().unwrap();
        let client = client(dir.path(), 1024);
        let reference = client.reference("a b/c.png");

        let task = client
            .upload_resumable(&reference, vec![7u8; 32], UploadMetadata::new("image/png"))
            .unwrap();
        finish(task).await.unwrap();

        let metadata = client.metadata(&reference).await.unwrap();
        let url = client.download_url(&reference).await.unwrap();
        assert_eq!(
            url,
            format!(
                "http://localhost:9199/v0/b/local/o/a%20b%2Fc.png?alt=media&token={}",
                metadata.download_token
            )
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempdir().unwrap();
        let client = client(dir.path(), 1024);
        let reference = client.reference("x.bin");

        let task = client
            .upload_resumable(&reference, vec![1, 2, 3], UploadMetadata::default())
            .unwrap();
        finish(task).await.unwrap();

        client.delete_object(&reference).await.unwrap();
        assert!(!client.object_path("x.bin").unwrap().exists());
        assert!(matches!(
            client.delete_object(&reference).await,
            Err(StorageError::ObjectNotFound { .. })
        ));
        assert!(matches!(
            client.download_url(&reference).await,
            Err(StorageError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_removes_part_file() {
        let dir = tempdir().unwrap();
        let client = client(dir.path(), 1);
        let reference = client.reference("big.bin");

        let mut task = client
            .upload_resumable(&reference, vec![0u8; 4096], UploadMetadata::default())
            .unwrap();
        assert!(task.pause());
        assert!(task.cancel());

        let mut failure = None;
        while let Some(event) = task.next().await {
            if let TaskEvent::Failed(e) = event {
                failure = Some(e);
            }
        }

        assert!(matches!(failure, Some(StorageError::Cancelled { .. })));
        assert_eq!(task.snapshot().state, TaskState::Canceled);
        assert!(!client.object_path("big.bin").unwrap().exists());
        let leftovers = std::fs::read_dir(dir.path().join("uploads"))
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempdir().unwrap();
        let client = client(dir.path(), 16);
        let reference = client.reference("../escape.txt");

        assert!(matches!(
            client.upload_resumable(&reference, vec![1], UploadMetadata::default()),
            Err(StorageError::InvalidParameter { .. })
        ));
        assert!(matches!(
            client.upload_resumable(&client.reference(""), vec![1], UploadMetadata::default()),
            Err(StorageError::RootOperation { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_metadata() {
        let dir = tempdir().unwrap();
        let client = client(dir.path(), 1024);

        let nested = client.reference("a/b");
        let task = client
            .upload_resumable(&nested, b"nested".to_vec(), UploadMetadata::default())
            .unwrap();
        finish(task).await.unwrap();

        // objects/<bucket>/a is now a directory, so the rename must fail
        let blocked = client.reference("a");
        let task = client
            .upload_resumable(&blocked, b"blocked".to_vec(), UploadMetadata::default())
            .unwrap();
        assert!(finish(task).await.is_err());

        assert!(matches!(
            client.metadata(&blocked).await,
            Err(StorageError::ObjectNotFound { .. })
        ));
        assert!(matches!(
            client.download_url(&blocked).await,
            Err(StorageError::ObjectNotFound { .. })
        ));
        assert!(!dir.path().join("metadata/local/a.json").exists());
        assert_eq!(std::fs::read_dir(dir.path().join("uploads")).unwrap().count(), 0);

        let metadata = client.metadata(&nested).await.unwrap();
        assert_eq!(metadata.size, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_uploads_keep_metadata_consistent() {
        use sha2::{Digest, Sha256};

        let dir = tempdir().unwrap();
        let client = client(dir.path(), 7);
        let reference = client.reference("shared.bin");

        let mut tasks = Vec::new();
        for i in 0..8u8 {
            let task = client
                .upload_resumable(&reference, vec![i; 100 + i as usize], UploadMetadata::default())
                .unwrap();
            tasks.push(tokio::spawn(finish(task)));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = std::fs::read(client.object_path("shared.bin").unwrap()).unwrap();
        let metadata = client.metadata(&reference).await.unwrap();
        assert_eq!(metadata.size, stored.len() as u64);
        assert_eq!(metadata.sha256, format!("{:x}", Sha256::digest(&stored)));
    }

    #[test]
    fn test_new_validates_config() {
        let config = StorageConfig::new().chunk_size(0);
        assert!(LocalStorageClient::new(&config).is_err());
    }
}
