//! Writes catalogued records to their destinations.
//!
//! Every write is attempted independently. A failed write becomes a
//! [`PipelineWarning::PublishFailed`] on the record and the remaining writes
//! still run.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::config::DatalakeConfig;
use crate::error::StorageError;
use crate::pipeline::{file_name_of, InputKind, PipelineWarning, RequestContext};
use crate::providers::{Catalog, ObjectStore, ObjectUri};

use super::record::{IngestRecord, Locations};

/// Deterministic destinations for one input, derived from its kind, category
/// and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    /// `None` for sources that stay where they are (remote video).
    pub original: Option<ObjectUri>,
    /// Local file copied to `original`.
    pub upload_from: Option<PathBuf>,
    pub transcript: ObjectUri,
    pub metadata: ObjectUri,
    pub locations: Locations,
}

pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    catalog: Arc<dyn Catalog>,
    config: DatalakeConfig,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>, catalog: Arc<dyn Catalog>, config: DatalakeConfig) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    pub fn bucket(&self) -> Option<&str> {
        self.config.bucket.as_deref().filter(|b| !b.is_empty())
    }

    /// Destinations for `ctx`, or `None` when no data-lake bucket is
    /// configured.
    ///
    /// Local files keep their file name. Remote pages, wiki documents and
    /// objects are named after `title`. Remote video keeps its URL as the
    /// original and only gets a transcript.
    pub fn plan(
        &self,
        ctx: &RequestContext,
        locator: &str,
        category: &str,
        title: Option<&str>,
    ) -> Option<PublishPlan> {
        let bucket = self.bucket()?;
        let category_segment = format!("category={}", category);
        let object = |name: &str| {
            ObjectUri::from_segments(bucket, &[&self.config.prefix, &category_segment, name])
        };

        let file_name = file_name_of(locator);
        let title = title
            .map(sanitize_title)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| file_name.clone());

        let (original, upload_from, transcript_name, doc_name) = match ctx.kind {
            InputKind::RemoteVideo => (None, None, format!("{}_transcript.txt", title), title),
            kind if kind.is_remote() => (
                Some(object(&format!("{}.txt", title))),
                Some(ctx.destination_path.clone()),
                format!("{}_transcript.txt", title),
                title,
            ),
            _ => (
                Some(object(&file_name)),
                Some(PathBuf::from(locator)),
                format!("{}_transcript.txt", file_name),
                file_name.clone(),
            ),
        };

        let transcript = object(&transcript_name);
        let metadata = ObjectUri::from_segments(
            bucket,
            &[&self.config.metadata_prefix, &format!("metadata_{}.json", doc_name)],
        );
        let locations = Locations {
            original_file: original
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| locator.to_string()),
            transcript_file: transcript.to_string(),
        };

        Some(PublishPlan {
            original,
            upload_from,
            transcript,
            metadata,
            locations,
        })
    }

    /// Writes original, transcript and metadata document, then registers the
    /// record with the catalog.
    pub fn publish(&self, plan: &PublishPlan, record: &mut IngestRecord, transcript: &str) {
        if let (Some(uri), Some(path)) = (&plan.original, &plan.upload_from) {
            self.attempt(record, uri.to_string(), || self.store.put_file(uri, path));
        }

        self.attempt(record, plan.transcript.to_string(), || {
            self.store.put(&plan.transcript, transcript.as_bytes())
        });

        let document = serde_json::to_vec_pretty(&record_document(record));
        self.attempt(record, plan.metadata.to_string(), || {
            self.store.put(&plan.metadata, &document?)
        });

        let entry = json!({
            "id": record.id,
            "source": record.source,
            "kind": record.kind,
            "category": record.category,
            "metadata_file": plan.metadata.to_string(),
            "metadata": record.metadata,
        });
        match self.catalog.register(&entry) {
            Ok(()) => debug!("Registered {} in catalog", record.id),
            Err(e) => record.push_warning(PipelineWarning::PublishFailed {
                destination: "catalog".to_string(),
                error: e.to_string(),
            }),
        }

        info!(
            "Published {} object(s) for category {}",
            record.published.len(),
            record.category
        );
    }

    fn attempt<F>(&self, record: &mut IngestRecord, destination: String, write: F)
    where
        F: FnOnce() -> Result<(), StorageError>,
    {
        match write() {
            Ok(()) => record.published.push(destination),
            Err(e) => record.push_warning(PipelineWarning::PublishFailed {
                destination,
                error: e.to_string(),
            }),
        }
    }
}

fn record_document(record: &IngestRecord) -> serde_json::Value {
    json!({
        "id": record.id,
        "category": record.category,
        "metadata": record.metadata,
    })
}

/// Titles become object names, so path separators are replaced.
fn sanitize_title(title: &str) -> String {
    title.trim().replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{JsonlCatalog, LocalObjectStore};
    use serde_json::Map;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        store: Arc<LocalObjectStore>,
        catalog: Arc<JsonlCatalog>,
        publisher: Publisher,
        dir: PathBuf,
    }

    fn fixture(bucket: Option<&str>) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();
        let store = Arc::new(LocalObjectStore::new(dir.join("objects")));
        let catalog = Arc::new(JsonlCatalog::new(dir.join("catalog.jsonl")));
        let config = DatalakeConfig {
            bucket: bucket.map(str::to_string),
            prefix: "ingest".to_string(),
            ..DatalakeConfig::default()
        };
        let publisher = Publisher::new(store.clone(), catalog.clone(), config);
        Fixture {
            _temp_dir: temp_dir,
            store,
            catalog,
            publisher,
            dir,
        }
    }

    #[test]
    fn test_plan_without_bucket() {
        let f = fixture(None);
        let ctx = RequestContext::new(InputKind::Pdf, "/in/report.pdf", f.dir.join("o.txt"));
        assert!(f.publisher.plan(&ctx, "/in/report.pdf", "finance", None).is_none());
    }

    #[test]
    fn test_plan_for_local_file() {
        let f = fixture(Some("lake"));
        let ctx = RequestContext::new(InputKind::Pdf, "/in/report.pdf", f.dir.join("o.txt"));
        let plan = f
            .publisher
            .plan(&ctx, "/in/report.pdf", "finance", Some("Ignored title"))
            .unwrap();

        assert_eq!(
            plan.original.unwrap().to_string(),
            "s3://lake/ingest/category=finance/report.pdf"
        );
        assert_eq!(plan.upload_from, Some(PathBuf::from("/in/report.pdf")));
        assert_eq!(
            plan.transcript.to_string(),
            "s3://lake/ingest/category=finance/report.pdf_transcript.txt"
        );
        assert_eq!(plan.metadata.to_string(), "s3://lake/metadata/metadata_report.pdf.json");
    }

    #[test]
    fn test_plan_for_remote_sources() {
        let f = fixture(Some("lake"));

        let page = RequestContext::new(InputKind::HttpPage, "https://example.com/a", f.dir.join("p.txt"));
        let plan = f
            .publisher
            .plan(&page, "https://example.com/a", "news", Some("Launch / Recap"))
            .unwrap();
        assert_eq!(
            plan.locations.original_file,
            "s3://lake/ingest/category=news/Launch _ Recap.txt"
        );
        assert_eq!(plan.upload_from, Some(f.dir.join("p.txt")));

        let video = RequestContext::new(InputKind::RemoteVideo, "https://youtu.be/x", f.dir.join("v.txt"));
        let plan = f
            .publisher
            .plan(&video, "https://youtu.be/x", "talks", Some("Keynote"))
            .unwrap();
        assert!(plan.original.is_none());
        assert_eq!(plan.locations.original_file, "https://youtu.be/x");
        assert_eq!(
            plan.locations.transcript_file,
            "s3://lake/ingest/category=talks/Keynote_transcript.txt"
        );
    }

    #[test]
    fn test_publish_writes_everything() {
        let f = fixture(Some("lake"));
        let source = f.dir.join("memo.txt");
        std::fs::write(&source, "raw memo").unwrap();
        let locator = source.to_string_lossy().to_string();

        let ctx = RequestContext::new(InputKind::PlainTextOrJson, &locator, f.dir.join("out.txt"));
        let plan = f.publisher.plan(&ctx, &locator, "notes", None).unwrap();
        let mut record = IngestRecord::parsed(&ctx, &locator, &plan.locations, Map::new());

        f.publisher.publish(&plan, &mut record, "transcript text");

        assert!(record.warnings.is_empty(), "{:?}", record.warnings);
        assert_eq!(record.published.len(), 3);
        assert_eq!(f.store.get(plan.original.as_ref().unwrap()).unwrap(), b"raw memo");
        assert_eq!(f.store.get(&plan.transcript).unwrap(), b"transcript text");

        let doc: serde_json::Value =
            serde_json::from_slice(&f.store.get(&plan.metadata).unwrap()).unwrap();
        assert_eq!(doc["metadata"]["file_type"], "plain-text-or-json");

        let lines = std::fs::read_to_string(f.catalog.path()).unwrap();
        assert_eq!(lines.lines().count(), 1);
    }

    #[test]
    fn test_failed_write_keeps_record() {
        let f = fixture(Some("lake"));
        let locator = f.dir.join("missing.pdf").to_string_lossy().to_string();
        let ctx = RequestContext::new(InputKind::Pdf, &locator, f.dir.join("out.txt"));
        let plan = f.publisher.plan(&ctx, &locator, "finance", None).unwrap();
        let mut record = IngestRecord::parsed(&ctx, &locator, &plan.locations, Map::new());

        f.publisher.publish(&plan, &mut record, "text");

        assert_eq!(record.warnings.len(), 1);
        assert!(matches!(
            &record.warnings[0],
            PipelineWarning::PublishFailed { destination, .. } if destination.ends_with("missing.pdf")
        ));
        assert_eq!(record.published.len(), 2);
        assert_eq!(record.metadata["file_type"], "pdf");
    }
}
