//! Test harness for isolated pipeline runs.
//!
//! The `TestHarness` owns a temporary directory with an input folder, a
//! storage folder, a local object store root and a catalog file, plus a
//! `Config` pointing at all of them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

use ingestchain::config::Config;
use ingestchain::processor::{self, Collaborators, StepSettings};
use ingestchain::providers::{LocalObjectStore, TextModel};
use ingestchain::step::StepRegistry;
use ingestchain::Pipeline;

use super::stubs::{EchoStep, FixedModel};

pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub config: Config,
}

impl TestHarness {
    /// Harness without a data-lake bucket.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let input_dir = base.join("input");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");

        let mut config = Config::default();
        config.storage_dir = base.join("store").to_string_lossy().to_string();
        config.object_store.root = base.join("objects").to_string_lossy().to_string();
        config.datalake.catalog_path = base.join("catalog.jsonl").to_string_lossy().to_string();
        config.anonymize = false;

        Self {
            temp_dir,
            input_dir,
            config,
        }
    }

    pub fn with_bucket(bucket: &str) -> Self {
        let mut harness = Self::new();
        harness.config.datalake.bucket = Some(bucket.to_string());
        harness.config.datalake.prefix = "ingest".to_string();
        harness
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn storage_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.storage_dir)
    }

    pub fn write_input(&self, filename: &str, content: &[u8]) -> PathBuf {
        let path = self.input_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }

    pub fn object_store(&self) -> LocalObjectStore {
        LocalObjectStore::new(&self.config.object_store.root)
    }

    fn collaborators(&self, model: Arc<dyn TextModel>) -> Collaborators {
        Collaborators {
            model,
            object_store: Arc::new(self.object_store()),
        }
    }

    /// Pipeline with the built-in steps and a model that always answers
    /// `reply`.
    pub fn pipeline(&self, reply: &str) -> Arc<Pipeline> {
        self.pipeline_with_model(Arc::new(FixedModel::new(reply)))
    }

    pub fn pipeline_with_model(&self, model: Arc<dyn TextModel>) -> Arc<Pipeline> {
        let pipeline = Pipeline::with_collaborators(&self.config, self.collaborators(model))
            .expect("Failed to build pipeline");
        Arc::new(pipeline)
    }

    /// Pipeline whose registry also holds the `echo` stub step.
    pub fn pipeline_with_echo(&self) -> Arc<Pipeline> {
        let collaborators = self.collaborators(Arc::new(FixedModel::new("unused")));
        let settings = StepSettings::from_config(&self.config).expect("Failed to read settings");

        let mut registry = StepRegistry::new();
        processor::register_builtin(&mut registry, &settings, &collaborators);
        registry.register("echo", || EchoStep);
        registry.seal();

        let table = ingestchain::pipeline::ChainTable::default();
        let publisher = ingestchain::metadata::Publisher::new(
            Arc::clone(&collaborators.object_store),
            Arc::new(ingestchain::providers::JsonlCatalog::new(
                &self.config.datalake.catalog_path,
            )),
            self.config.datalake.clone(),
        );

        Arc::new(Pipeline::new(
            Arc::new(ingestchain::pipeline::PipelineConfig::from_config(&self.config)),
            Arc::new(registry),
            table,
            publisher,
        ))
    }
}

/// A one-page PDF whose text layer holds `lines`.
pub fn pdf_with_lines(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![50.into(), 700.into()]),
        Operation::new("TL", vec![14.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("Failed to encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Resources" => resources_id,
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to save PDF");
    bytes
}
