use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::StorageError;
use crate::storage::filesystem;

/// Registry of catalogued assets.
pub trait Catalog: Send + Sync {
    fn register(&self, record: &Value) -> Result<(), StorageError>;
}

/// Appends one JSON document per line. Concurrent writers in this process are
/// serialized so lines never interleave.
pub struct JsonlCatalog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlCatalog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Catalog for JsonlCatalog {
    fn register(&self, record: &Value) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            filesystem::ensure_directory(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::WriteFile {
                path: self.path.clone(),
                source: e,
            })?;

        file.write_all(line.as_bytes())
            .map_err(|e| StorageError::WriteFile {
                path: self.path.clone(),
                source: e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_register_appends_lines() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = JsonlCatalog::new(temp_dir.path().join("nested/catalog.jsonl"));

        catalog.register(&json!({"title": "a"})).unwrap();
        catalog.register(&json!({"title": "b"})).unwrap();

        let content = std::fs::read_to_string(catalog.path()).unwrap();
        let titles: Vec<String> = content
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn test_concurrent_registrations_do_not_interleave() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(JsonlCatalog::new(temp_dir.path().join("catalog.jsonl")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let catalog = Arc::clone(&catalog);
                std::thread::spawn(move || {
                    for j in 0..10 {
                        catalog.register(&json!({"worker": i, "n": j})).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(catalog.path()).unwrap();
        assert_eq!(content.lines().count(), 80);
        for line in content.lines() {
            serde_json::from_str::<Value>(line).unwrap();
        }
    }
}
