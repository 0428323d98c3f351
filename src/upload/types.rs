use crate::client::TaskSnapshot;
use crate::error::{Result, StorageError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Payload handed to the upload helpers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    /// Declared media type, e.g. `image/png`
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk; the name is taken from the file name
    pub async fn from_path<P: AsRef<Path>>(
        path: P,
        content_type: impl Into<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StorageError::invalid_parameter(
                    "path",
                    format!("Path has no file name: {}", path.display()),
                )
            })?
            .to_string();
        let data = tokio::fs::read(path).await?;

        Ok(Self::new(name, content_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Progress of an upload as seen by the callback
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
    /// Percentage (0.0 to 100.0)
    pub percentage: f64,
}

impl UploadProgress {
    pub fn new(bytes_uploaded: u64, total_bytes: u64) -> Self {
        let percentage = if total_bytes > 0 {
            bytes_uploaded as f64 / total_bytes as f64 * 100.0
        } else {
            100.0
        };

        Self {
            bytes_uploaded,
            total_bytes,
            percentage: percentage.min(100.0),
        }
    }
}

impl From<&TaskSnapshot> for UploadProgress {
    fn from(snapshot: &TaskSnapshot) -> Self {
        Self::new(snapshot.bytes_transferred, snapshot.total_bytes)
    }
}

pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Suppresses progress reports smaller than a threshold
///
/// The last reported value starts at 0, so the first report happens once
/// the upload has moved at least `threshold` percentage points.
#[derive(Debug, Clone, Copy)]
pub struct ProgressThrottle {
    threshold: f64,
    last_reported: f64,
}

impl ProgressThrottle {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_reported: 0.0,
        }
    }

    /// Returns true, and remembers `percentage`, if it should be reported
    pub fn should_report(&mut self, percentage: f64) -> bool {
        if (percentage - self.last_reported).abs() >= self.threshold {
            self.last_reported = percentage;
            true
        } else {
            false
        }
    }

    pub fn last_reported(&self) -> f64 {
        self.last_reported
    }
}

#[derive(Clone, Default)]
pub struct UploadOptions {
    pub on_progress: Option<ProgressCallback>,
    /// Overrides the configured Cache-Control value
    pub cache_control: Option<String>,
    pub custom_metadata: BTreeMap<String, String>,
}

impl std::fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOptions")
            .field("on_progress", &self.on_progress.is_some())
            .field("cache_control", &self.cache_control)
            .field("custom_metadata", &self.custom_metadata)
            .finish()
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    pub fn custom_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_upload_file() {
        let file = UploadFile::new("cat.png", "image/png", vec![1, 2, 3]);
        assert_eq!(file.size(), 3);
        assert!(file.is_image());
        assert!(!file.is_empty());

        let file = UploadFile::new("notes.txt", "text/plain", Vec::new());
        assert!(!file.is_image());
        assert!(file.is_empty());

        // Prefix match only
        assert!(!UploadFile::new("x", "application/image/png", vec![1]).is_image());
    }

    #[test]
    fn test_upload_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();

        let file = tokio_test::block_on(UploadFile::from_path(&path, "image/jpeg")).unwrap();
        assert_eq!(file.name, "photo.jpg");
        assert_eq!(file.data, b"jpeg bytes");

        let missing = tokio_test::block_on(UploadFile::from_path(dir.path().join("nope"), "x/y"));
        assert!(matches!(missing, Err(StorageError::Io(_))));
    }

    #[test]
    fn test_upload_progress() {
        let progress = UploadProgress::new(500, 1000);
        assert_eq!(progress.percentage, 50.0);
        assert_eq!(UploadProgress::new(0, 0).percentage, 100.0);
        assert_eq!(UploadProgress::new(20, 10).percentage, 100.0);
    }

    #[test]
    fn test_throttle_reports_only_full_steps() {
        let mut throttle = ProgressThrottle::new(1.0);

        assert!(!throttle.should_report(0.0));
        assert!(!throttle.should_report(0.5));
        assert!(throttle.should_report(1.0));
        assert!(!throttle.should_report(1.99));
        assert!(throttle.should_report(2.5));
        assert!(!throttle.should_report(3.0));
        assert!(throttle.should_report(100.0));
        assert_eq!(throttle.last_reported(), 100.0);
    }

    #[test]
    fn test_upload_options() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let options = UploadOptions::new()
            .on_progress(move |p| sink.lock().unwrap().push(p.percentage))
            .cache_control("no-cache")
            .custom_metadata("owner", "bob");

        (options.on_progress.as_ref().unwrap())(UploadProgress::new(1, 4));
        assert_eq!(*seen.lock().unwrap(), vec![25.0]);
        assert_eq!(options.cache_control.as_deref(), Some("no-cache"));
        assert_eq!(options.custom_metadata.get("owner").unwrap(), "bob");
        assert!(format!("{:?}", options).contains("on_progress: true"));
    }
}
