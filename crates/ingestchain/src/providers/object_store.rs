use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::StorageError;
use crate::storage::{filesystem, FileStorage};

/// `s3://bucket/key`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUri {
    pub bucket: String,
    pub key: String,
}

impl ObjectUri {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Joins non-empty key segments with `/`, dropping stray slashes.
    pub fn from_segments(bucket: &str, segments: &[&str]) -> Self {
        let key = segments
            .iter()
            .map(|s| s.trim_matches('/'))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self::new(bucket, key)
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

impl FromStr for ObjectUri {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .trim()
            .strip_prefix("s3://")
            .ok_or_else(|| StorageError::InvalidUri(s.to_string()))?;

        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.trim_matches('/').is_empty() => {
                Ok(Self::new(bucket, key.trim_start_matches('/')))
            }
            _ => Err(StorageError::InvalidUri(s.to_string())),
        }
    }
}

/// Bucket/key blob storage.
pub trait ObjectStore: Send + Sync {
    fn put(&self, uri: &ObjectUri, content: &[u8]) -> Result<(), StorageError>;

    fn get(&self, uri: &ObjectUri) -> Result<Vec<u8>, StorageError>;

    fn put_file(&self, uri: &ObjectUri, path: &Path) -> Result<(), StorageError> {
        let content = filesystem::read(path)?;
        self.put(uri, &content)
    }
}

/// Object store laid out on the local filesystem as `<root>/<bucket>/<key>`.
/// Writes replace existing objects, so repeating one is idempotent.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    storage: FileStorage,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            storage: FileStorage::new(root),
        }
    }

    pub fn path_of(&self, uri: &ObjectUri) -> Result<PathBuf, StorageError> {
        self.storage.path_for(&Self::storage_key(uri)?)
    }

    fn storage_key(uri: &ObjectUri) -> Result<String, StorageError> {
        if uri.bucket.is_empty() || uri.bucket.contains('/') || uri.bucket == ".." {
            return Err(StorageError::InvalidUri(uri.to_string()));
        }
        Ok(format!("{}/{}", uri.bucket, uri.key))
    }
}

impl ObjectStore for LocalObjectStore {
    fn put(&self, uri: &ObjectUri, content: &[u8]) -> Result<(), StorageError> {
        self.storage.put(&Self::storage_key(uri)?, content)?;
        Ok(())
    }

    fn get(&self, uri: &ObjectUri) -> Result<Vec<u8>, StorageError> {
        self.storage
            .get(&Self::storage_key(uri)?)
            .map_err(|e| match e {
                StorageError::NotFound(_) => StorageError::NotFound(uri.to_string()),
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_uri() {
        let uri: ObjectUri = "s3://lake/raw/report.pdf".parse().unwrap();
        assert_eq!(uri.bucket, "lake");
        assert_eq!(uri.key, "raw/report.pdf");
        assert_eq!(uri.to_string(), "s3://lake/raw/report.pdf");
    }

    #[test]
    fn test_parse_invalid_uris() {
        for bad in ["lake/raw", "s3://", "s3://lake", "s3://lake/", "s3:///key"] {
            assert!(bad.parse::<ObjectUri>().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_from_segments_skips_empty() {
        let uri = ObjectUri::from_segments("lake", &["", "/category=finance/", "q1.txt"]);
        assert_eq!(uri.key, "category=finance/q1.txt");
    }

    #[test]
    fn test_local_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path());
        let uri = ObjectUri::new("lake", "a/b.txt");

        store.put(&uri, b"one").unwrap();
        store.put(&uri, b"two").unwrap();

        assert_eq!(store.get(&uri).unwrap(), b"two");
        assert!(temp_dir.path().join("lake/a/b.txt").is_file());
    }

    #[test]
    fn test_local_store_put_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.txt");
        std::fs::write(&source, "payload").unwrap();

        let store = LocalObjectStore::new(temp_dir.path().join("store"));
        let uri = ObjectUri::new("lake", "copy.txt");
        store.put_file(&uri, &source).unwrap();
        assert_eq!(store.get(&uri).unwrap(), b"payload");
    }

    #[test]
    fn test_local_store_missing_object() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path());
        let err = store.get(&ObjectUri::new("lake", "none.txt")).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(uri) if uri == "s3://lake/none.txt"));
    }
}
