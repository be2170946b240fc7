//! Document and media ingestion through dynamically assembled step chains.
//!
//! An input locator is classified into an [`InputKind`], a chain of named
//! steps is built for it from the registry, and the chain runs over a
//! [`pipeline::RequestContext`]. Batches fan out over worker threads with
//! per-input failure isolation ([`Dispatcher`]). Catalogue runs additionally
//! ask the model for metadata, repair its output and publish to the data lake.

pub mod config;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod processor;
pub mod providers;
pub mod sanitize;
pub mod secrets;
pub mod step;
pub mod storage;
pub mod telemetry;
pub mod worker;

pub use config::{load_config, Config};
pub use error::{
    BuildError, ConfigError, ExecutionError, IngestError, RegistryError, Result, StepError,
    StorageError, WorkerError,
};
pub use metadata::IngestRecord;
pub use pipeline::{ChainOptions, ChatMode, InputKind, Pipeline, RequestContext, RunMode};
pub use step::{Step, StepRegistry};
pub use worker::{collect_inputs, Dispatcher, Outcome};
