use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use crate::config::Config;
use crate::error::{BuildError, IngestError};
use crate::metadata::record::category_of;
use crate::metadata::{parse_model_output, IngestRecord, Locations, ParseOutcome, Publisher};
use crate::processor::{self, Collaborators, StepSettings};
use crate::providers::JsonlCatalog;
use crate::sanitize;
use crate::step::{names, StepRegistry};

use super::chain::{ChainBuilder, ChainTable};
use super::config::PipelineConfig;
use super::context::{file_name_of, RequestContext};
use super::error::PipelineWarning;
use super::executor::{self, ChainStatus};
use super::kind::InputKind;
use super::options::ChainOptions;
use super::progress::ProgressReporter;

/// Prompt template the catalogue enrichment runs with.
pub const META_PROMPT: &str = "meta";

/// Fixed enrichment run after ingestion in catalogue mode.
pub const ENRICHMENT: &[&str] = &[
    names::PII_DETECT,
    names::PII_TOKENIZE,
    names::PROMPT_BUILD,
    names::SUMMARIZE,
    names::PII_DETOKENIZE,
];

/// What a run does with each input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Build and run the chain for the input.
    #[default]
    Process,
    /// Ingest, enrich with model metadata and publish to the data lake.
    Catalog,
}

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    registry: Arc<StepRegistry>,
    table: ChainTable,
    publisher: Publisher,
}

impl Pipeline {
    /// Production constructor: discovers the built-in steps and wires the
    /// configured collaborators.
    pub fn from_config(config: &Config) -> Result<Self, IngestError> {
        let collaborators = Collaborators::from_config(config)?;
        Self::with_collaborators(config, collaborators)
    }

    /// Like [`Pipeline::from_config`] with caller-supplied collaborators.
    pub fn with_collaborators(
        config: &Config,
        collaborators: Collaborators,
    ) -> Result<Self, IngestError> {
        let settings = StepSettings::from_config(config)?;
        let registry = processor::discover(&settings, &collaborators);
        let table = ChainTable::with_overrides(&config.chains)?;
        let catalog = Arc::new(JsonlCatalog::new(&config.datalake.catalog_path));
        let publisher = Publisher::new(
            Arc::clone(&collaborators.object_store),
            catalog,
            config.datalake.clone(),
        );

        Ok(Self::new(
            Arc::new(PipelineConfig::from_config(config)),
            Arc::new(registry),
            table,
            publisher,
        ))
    }

    pub fn new(
        config: Arc<PipelineConfig>,
        registry: Arc<StepRegistry>,
        table: ChainTable,
        publisher: Publisher,
    ) -> Self {
        Self {
            config,
            registry,
            table,
            publisher,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn builder(&self) -> ChainBuilder<'_> {
        ChainBuilder::new(&self.registry, &self.table, self.config.clipboard_copy)
    }

    /// Options seeded from configuration.
    pub fn default_options(&self) -> ChainOptions {
        ChainOptions::new().anonymize(self.config.anonymize)
    }

    /// Checks that every step the table and `options` can produce is
    /// registered. Failures here are fatal for the whole run.
    pub fn validate(&self, options: &ChainOptions, mode: RunMode) -> Result<(), IngestError> {
        if options.custom.as_ref().is_some_and(Vec::is_empty) {
            return Err(BuildError::EmptyCustomChain.into());
        }

        let builder = self.builder();
        let mut reachable = builder.reachable_steps(options);
        // A custom chain applies to every kind, listed in the table or not.
        if let Some(custom) = &options.custom {
            reachable.extend(custom.iter().cloned());
        }
        if mode == RunMode::Catalog {
            reachable.extend(ENRICHMENT.iter().map(|s| s.to_string()));
        }
        self.registry
            .ensure_registered(reachable.iter().map(String::as_str))?;
        Ok(())
    }

    /// `{storage_dir}/output_{name}_{timestamp}.txt`
    pub fn destination_for(&self, locator: &str) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        self.config
            .storage_dir
            .join(format!("output_{}_{}.txt", file_name_of(locator), timestamp))
    }

    pub fn context_for(&self, locator: &str, kind: InputKind, options: &ChainOptions) -> RequestContext {
        let mut ctx = RequestContext::new(kind, locator, self.destination_for(locator))
            .with_extract_media(self.config.extract_media);
        if let Some(prompt) = &options.prompt_name {
            ctx.prompt_name = prompt.clone();
        }
        ctx
    }

    /// Runs the full chain for one input and returns its final context.
    pub fn process(
        &self,
        locator: &str,
        kind: InputKind,
        options: &ChainOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<RequestContext, IngestError> {
        let mut ctx = self.context_for(locator, kind, options);
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.id,
            kind = %kind,
            source = %sanitize::redact_locator(locator),
        )
        .entered();

        let chain = self.builder().build(kind, options)?;
        debug!("Chain: {:?}", chain);

        if let ChainStatus::Halted { after } = executor::run(&chain, &mut ctx, progress)? {
            info!("Stopped after {}: {:?}", after, ctx.recommendation);
        }
        Ok(ctx)
    }

    /// Ingests one input, asks the model for catalogue metadata and publishes
    /// original, transcript and metadata.
    ///
    /// Model output that cannot be parsed yields a `broken` record instead of
    /// an error. Publishing failures become warnings on the record. Media
    /// extraction is always off here.
    pub fn catalog(
        &self,
        locator: &str,
        kind: InputKind,
        options: &ChainOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<IngestRecord, IngestError> {
        let mut ctx = self.context_for(locator, kind, options);
        ctx.extract_media = false;
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.id,
            kind = %kind,
            source = %sanitize::redact_locator(locator),
        )
        .entered();

        let builder = self.builder();

        {
            let _step = info_span!("ingest").entered();
            let ingestion = builder.build_base(kind, options)?;
            if let ChainStatus::Halted { .. } = executor::run(&ingestion, &mut ctx, progress)? {
                return Ok(IngestRecord::halted(&ctx, locator));
            }
        }

        let transcript = ctx.text.clone();

        {
            let _step = info_span!("enrich").entered();
            ctx.prompt_name = META_PROMPT.to_string();
            let enrichment = builder.build_named(ENRICHMENT)?;
            executor::run(&enrichment, &mut ctx, progress)?;
        }

        let _step = info_span!("publish").entered();
        let fields = match parse_model_output(&ctx.text) {
            ParseOutcome::Parsed(fields) => fields,
            ParseOutcome::Degraded { reason } => {
                warn!("Model metadata unusable, marking as broken: {}", reason);
                return Ok(IngestRecord::degraded(&ctx, locator, reason));
            }
        };

        let category = category_of(&fields);
        let title = fields
            .get("title")
            .or_else(|| ctx.metadata.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let record = match self
            .publisher
            .plan(&ctx, locator, &category, title.as_deref())
        {
            Some(plan) => {
                let mut record = IngestRecord::parsed(&ctx, locator, &plan.locations, fields);
                self.publisher.publish(&plan, &mut record, &transcript);
                record
            }
            None => {
                let mut record =
                    IngestRecord::parsed(&ctx, locator, &Locations::default(), fields);
                record.push_warning(PipelineWarning::PublishFailed {
                    destination: "datalake".to_string(),
                    error: "no data-lake bucket configured".to_string(),
                });
                record
            }
        };

        Ok(record)
    }
}
