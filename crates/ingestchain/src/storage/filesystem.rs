use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_directory(parent),
        _ => Ok(()),
    }
}

/// Writes `content` to `path`, replacing any previous file.
///
/// The bytes go to a sibling temp file first and are renamed into place, so
/// readers never observe a half-written file and repeating a write is
/// harmless.
pub fn write_replace(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    ensure_parent(path)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    std::fs::write(&tmp_path, content).map_err(|e| StorageError::WriteFile {
        path: tmp_path.clone(),
        source: e,
    })?;

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        StorageError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Creates a new file at `path`, or at `name_2.ext`, `name_3.ext`, ... when
/// the name is taken. Returns the path actually written.
pub fn write_unique(path: &Path, content: &[u8]) -> Result<PathBuf, StorageError> {
    ensure_parent(path)?;

    let dir_path = path.parent().unwrap_or_else(|| Path::new(""));
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");

    let (base, ext) = match filename.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => (&filename[..dot_pos], Some(&filename[dot_pos..])),
        _ => (filename, None),
    };

    for counter in 1..=1000 {
        let try_filename = if counter == 1 {
            filename.to_string()
        } else {
            match ext {
                Some(ext) => format!("{}_{}{}", base, counter, ext),
                None => format!("{}_{}", base, counter),
            }
        };

        let try_path = dir_path.join(&try_filename);

        // create_new is O_CREAT | O_EXCL, so two workers never share a name
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&try_path)
        {
            Ok(mut file) => {
                file.write_all(content)
                    .map_err(|e| StorageError::WriteFile {
                        path: try_path.clone(),
                        source: e,
                    })?;
                return Ok(try_path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(StorageError::WriteFile {
                    path: try_path,
                    source: e,
                });
            }
        }
    }

    Err(StorageError::FileExists(path.to_path_buf()))
}

pub fn read(path: &Path) -> Result<Vec<u8>, StorageError> {
    std::fs::read(path).map_err(|e| StorageError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })
}

/// A directory that relative keys are resolved under.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `key` under the root. Absolute keys and `..` segments are
    /// rejected so nothing lands outside the root.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.trim().is_empty() || escapes {
            return Err(StorageError::InvalidUri(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    pub fn put(&self, key: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.path_for(key)?;
        write_replace(&path, content)?;
        Ok(path)
    }

    pub fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        read(&path)
    }
}
