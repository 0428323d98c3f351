//! Types exchanged with storage clients

use crate::config::DEFAULT_CACHE_CONTROL;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::Url;

/// Metadata sent along with an upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    #[serde(rename = "contentType")]
    pub content_type: String,
    #[serde(rename = "cacheControl")]
    pub cache_control: String,
    #[serde(rename = "customMetadata", default)]
    pub custom_metadata: BTreeMap<String, String>,
}

impl Default for UploadMetadata {
    fn default() -> Self {
        Self {
            content_type: "application/octet-stream".to_string(),
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
            custom_metadata: BTreeMap::new(),
        }
    }
}

impl UploadMetadata {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    pub fn cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = cache_control.into();
        self
    }

    pub fn custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_metadata.insert(key.into(), value.into());
        self
    }
}

/// Metadata recorded for a stored object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub bucket: String,
    #[serde(rename = "fullPath")]
    pub full_path: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "contentType")]
    pub content_type: String,
    #[serde(rename = "cacheControl")]
    pub cache_control: String,
    #[serde(rename = "customMetadata", default)]
    pub custom_metadata: BTreeMap<String, String>,
    #[serde(rename = "timeCreated")]
    pub time_created: DateTime<Utc>,
    /// Hex-encoded SHA-256 of the stored bytes
    pub sha256: String,
    /// Token embedded in download URLs
    #[serde(rename = "downloadToken")]
    pub download_token: String,
}

impl ObjectMetadata {
    /// Build the metadata record for freshly stored bytes
    pub fn for_upload(
        bucket: &str,
        full_path: &str,
        data: &[u8],
        metadata: &UploadMetadata,
    ) -> Self {
        let time_created = Utc::now();
        let sha256 = format!("{:x}", Sha256::digest(data));

        let mut token = Sha256::new();
        token.update(bucket.as_bytes());
        token.update(full_path.as_bytes());
        token.update(sha256.as_bytes());
        token.update(
            time_created
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_le_bytes(),
        );
        let download_token = format!("{:x}", token.finalize());

        Self {
            bucket: bucket.to_string(),
            full_path: full_path.to_string(),
            name: full_path.rsplit('/').next().unwrap_or("").to_string(),
            size: data.len() as u64,
            content_type: metadata.content_type.clone(),
            cache_control: metadata.cache_control.clone(),
            custom_metadata: metadata.custom_metadata.clone(),
            time_created,
            sha256,
            download_token,
        }
    }

    /// Get a human-readable size string
    pub fn size_string(&self) -> String {
        bytesize::ByteSize::b(self.size).to_string()
    }
}

/// Build `{base}/v0/b/{bucket}/o/{path}?alt=media&token={token}`
///
/// The object path is pushed as a single segment, so `/` is encoded as `%2F`.
pub fn download_url(base: &str, bucket: &str, full_path: &str, token: &str) -> Result<String> {
    let mut url = Url::parse(base)?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        segments
            .pop_if_empty()
            .extend(["v0", "b", bucket, "o", full_path]);
    }
    url.query_pairs_mut()
        .append_pair("alt", "media")
        .append_pair("token", token);

    Ok(url.to_string())
}
