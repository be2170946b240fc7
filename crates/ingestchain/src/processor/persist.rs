//! Steps that move bytes between the working context, local storage and the
//! object store.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::error::{StepError, StorageError};
use crate::pipeline::RequestContext;
use crate::providers::{ObjectStore, ObjectUri};
use crate::sanitize::redact_path;
use crate::storage::filesystem;
use crate::step::{names, Step};

/// Writes `text` to `destination_path`, picking a fresh name if the file is
/// already there.
pub struct PersistLocal;

impl Step for PersistLocal {
    fn name(&self) -> &str {
        names::PERSIST_LOCAL
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let written = filesystem::write_unique(&ctx.destination_path, ctx.text.as_bytes())?;
        info!("Saved output to {}", redact_path(&written));

        ctx.merge_metadata("local_copy", json!(written.to_string_lossy()));
        ctx.destination_path = written;
        Ok(())
    }
}

/// Reads an `s3://bucket/key` object into `text`.
pub struct ObjectRead {
    store: Arc<dyn ObjectStore>,
}

impl ObjectRead {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl Step for ObjectRead {
    fn name(&self) -> &str {
        names::OBJECT_READ
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let uri: ObjectUri = ctx.source_path.parse()?;
        let bytes = self.store.get(&uri)?;

        ctx.text = String::from_utf8_lossy(&bytes).into_owned();
        ctx.merge_metadata("source_bytes", json!(bytes.len()));
        Ok(())
    }
}

/// Copies the raw input at `source_path` into the data-lake bucket under
/// `{prefix}/raw/`. Without a bucket the step does nothing.
pub struct ArchiveUpload {
    store: Arc<dyn ObjectStore>,
    bucket: Option<String>,
    prefix: String,
}

impl ArchiveUpload {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: Option<String>, prefix: String) -> Self {
        Self {
            store,
            bucket,
            prefix,
        }
    }
}

impl Step for ArchiveUpload {
    fn name(&self) -> &str {
        names::ARCHIVE_UPLOAD
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let Some(bucket) = self.bucket.as_deref().filter(|b| !b.is_empty()) else {
            debug!("No archive bucket configured, skipping upload");
            return Ok(());
        };

        let path = Path::new(&ctx.source_path);
        if !path.is_file() {
            return Err(StepError::Storage(StorageError::NotFound(
                ctx.source_path.clone(),
            )));
        }

        let file_name = ctx.file_name();
        let uri = ObjectUri::from_segments(bucket, &[&self.prefix, "raw", &file_name]);
        self.store.put_file(&uri, path)?;
        info!("Archived {} to {}", file_name, uri);

        ctx.merge_metadata("archive_uri", json!(uri.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::InputKind;
    use crate::providers::LocalObjectStore;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> Arc<dyn ObjectStore> {
        Arc::new(LocalObjectStore::new(temp_dir.path().join("objects")))
    }

    #[test]
    fn test_persist_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("output_report.txt");
        std::fs::write(&destination, "earlier run").unwrap();

        let mut ctx = RequestContext::new(InputKind::Pdf, "/in/report.pdf", destination.clone());
        ctx.text = "new text".to_string();
        PersistLocal.handle(&mut ctx).unwrap();

        assert_ne!(ctx.destination_path, destination);
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "earlier run");
        assert_eq!(std::fs::read_to_string(&ctx.destination_path).unwrap(), "new text");
        assert_eq!(
            ctx.metadata["local_copy"],
            json!(ctx.destination_path.to_string_lossy())
        );
    }

    #[test]
    fn test_object_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .put(&ObjectUri::new("lake", "docs/memo.txt"), b"memo body")
            .unwrap();

        let step = ObjectRead::new(Arc::clone(&store));
        let mut ctx = RequestContext::new(
            InputKind::ObjectStoreReference,
            "s3://lake/docs/memo.txt",
            temp_dir.path().join("out.txt"),
        );
        step.handle(&mut ctx).unwrap();

        assert_eq!(ctx.text, "memo body");
    }

    #[test]
    fn test_object_read_missing_and_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let step = ObjectRead::new(store(&temp_dir));

        let mut missing = RequestContext::new(
            InputKind::ObjectStoreReference,
            "s3://lake/none.txt",
            temp_dir.path().join("o"),
        );
        assert!(matches!(
            step.handle(&mut missing),
            Err(StepError::Storage(StorageError::NotFound(_)))
        ));

        let mut invalid = RequestContext::new(
            InputKind::ObjectStoreReference,
            "not-a-uri",
            temp_dir.path().join("o"),
        );
        assert!(matches!(
            step.handle(&mut invalid),
            Err(StepError::Storage(StorageError::InvalidUri(_)))
        ));
    }

    #[test]
    fn test_archive_upload() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("talk.mp3");
        std::fs::write(&source, b"audio").unwrap();
        let store = store(&temp_dir);

        let step = ArchiveUpload::new(Arc::clone(&store), Some("lake".into()), "ingest".into());
        let mut ctx = RequestContext::new(
            InputKind::LocalMedia,
            source.to_string_lossy(),
            temp_dir.path().join("o"),
        );
        step.handle(&mut ctx).unwrap();

        assert_eq!(ctx.metadata["archive_uri"], "s3://lake/ingest/raw/talk.mp3");
        assert_eq!(
            store.get(&ObjectUri::new("lake", "ingest/raw/talk.mp3")).unwrap(),
            b"audio"
        );
    }

    #[test]
    fn test_archive_without_bucket_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let step = ArchiveUpload::new(store(&temp_dir), None, "ingest".into());
        let mut ctx = RequestContext::new(InputKind::LocalMedia, "/missing.mp3", temp_dir.path().join("o"));

        step.handle(&mut ctx).unwrap();
        assert!(ctx.metadata.is_empty());
    }
}
