//! Post-processing of model output into catalogued records.

pub mod publish;
pub mod record;
pub mod repair;

pub use publish::{PublishPlan, Publisher};
pub use record::{IngestRecord, Locations, BROKEN_CATEGORY};
pub use repair::{parse_model_output, repair_json, ParseOutcome};
