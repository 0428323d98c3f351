//! References to objects in a bucket

use serde::{Deserialize, Serialize};

/// Location of an object: a bucket plus a normalized path
///
/// Empty path segments are dropped, so `"/images//cat.png/"` and
/// `"images/cat.png"` name the same object. The empty path is the bucket
/// root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageReference {
    bucket: String,
    path: String,
}

impl StorageReference {
    pub fn new(bucket: impl Into<String>, path: &str) -> Self {
        Self {
            bucket: bucket.into(),
            path: normalize(path),
        }
    }

    pub fn root(bucket: impl Into<String>) -> Self {
        Self::new(bucket, "")
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Normalized path within the bucket
    pub fn full_path(&self) -> &str {
        &self.path
    }

    /// Last path segment, empty for the root
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Parent reference, `None` for the root
    pub fn parent(&self) -> Option<StorageReference> {
        if self.is_root() {
            return None;
        }

        let parent = match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        };

        Some(Self {
            bucket: self.bucket.clone(),
            path: parent.to_string(),
        })
    }

    pub fn child(&self, child_path: &str) -> StorageReference {
        let child = normalize(child_path);
        let path = match (self.is_root(), child.is_empty()) {
            (_, true) => self.path.clone(),
            (true, false) => child,
            (false, false) => format!("{}/{}", self.path, child),
        };

        Self {
            bucket: self.bucket.clone(),
            path,
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }
}

impl std::fmt::Display for StorageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.path)
    }
}

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let reference = StorageReference::new("bucket", "/images//cat.png/");
        assert_eq!(reference.full_path(), "images/cat.png");
        assert_eq!(reference, StorageReference::new("bucket", "images/cat.png"));
        assert_eq!(reference.to_string(), "bucket/images/cat.png");
    }

    #[test]
    fn test_name_and_parent() {
        let reference = StorageReference::new("bucket", "a/b/c.txt");
        assert_eq!(reference.name(), "c.txt");

        let parent = reference.parent().unwrap();
        assert_eq!(parent.full_path(), "a/b");
        assert_eq!(parent.parent().unwrap().full_path(), "a");
        assert!(parent.parent().unwrap().parent().unwrap().is_root());
        assert!(StorageReference::root("bucket").parent().is_none());
    }

    #[test]
    fn test_child() {
        let root = StorageReference::root("bucket");
        assert_eq!(root.child("docs/").full_path(), "docs");
        assert_eq!(root.child("docs").child("/x/y").full_path(), "docs/x/y");
        assert_eq!(root.child("docs").child("").full_path(), "docs");
        assert_eq!(root.name(), "");
    }

    #[test]
    fn test_segments() {
        let reference = StorageReference::new("bucket", "a/b/c");
        assert_eq!(reference.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(StorageReference::root("bucket").segments().count(), 0);
    }
}
