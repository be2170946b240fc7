pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod kind;
pub mod options;
pub mod progress;
pub mod runner;

pub use chain::{Chain, ChainBuilder, ChainTable, Link};
pub use config::PipelineConfig;
pub use context::{file_name_of, RequestContext, DEFAULT_PROMPT};
pub use error::PipelineWarning;
pub use executor::{run, ChainStatus};
pub use kind::InputKind;
pub use options::{ChainOptions, ChatMode};
pub use progress::{CollectingProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::{Pipeline, RunMode, ENRICHMENT, META_PROMPT};
