use serde::{Deserialize, Serialize};

/// Non-fatal problems collected on a result instead of failing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// A persistence destination rejected the write.
    PublishFailed { destination: String, error: String },
    /// Model output could not be parsed, even after repair.
    MetadataDegraded { reason: String },
    /// Placeholders went missing between tokenization and restoration.
    PiiIntegrity { missing: usize },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::PublishFailed { destination, error } => {
                write!(f, "publishing to {} failed: {}", destination, error)
            }
            PipelineWarning::MetadataDegraded { reason } => {
                write!(f, "model output unusable: {}", reason)
            }
            PipelineWarning::PiiIntegrity { missing } => {
                write!(f, "{} PII placeholder(s) lost before restoration", missing)
            }
        }
    }
}
