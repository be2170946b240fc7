use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IngestError, StorageError};
use crate::metadata::IngestRecord;
use crate::pipeline::{InputKind, RequestContext};
use crate::storage::filesystem;

/// One input of a batch, as handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub index: usize,
    pub input: String,
}

impl Job {
    pub fn new(index: usize, input: impl Into<String>) -> Self {
        Self {
            index,
            input: input.into(),
        }
    }
}

/// What happened to one input. Exactly one per submitted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Position of the input in the submitted list.
    pub index: usize,
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<InputKind>,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Processed {
        /// Where `persist` wrote the text. Absent when the chain never
        /// persisted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<PathBuf>,
        text: String,
        text_chars: usize,
        metadata: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recommendation: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        reasons: Vec<String>,
    },
    Catalogued {
        record: Box<IngestRecord>,
    },
    Failed {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<String>,
    },
}

impl OutcomeStatus {
    pub fn processed(ctx: RequestContext) -> Self {
        let destination = ctx
            .metadata
            .get("local_copy")
            .and_then(Value::as_str)
            .map(PathBuf::from);
        OutcomeStatus::Processed {
            destination,
            text_chars: ctx.text.chars().count(),
            text: ctx.text,
            metadata: ctx.metadata,
            recommendation: ctx.recommendation,
            reasons: ctx.reasons,
        }
    }

    pub fn catalogued(record: IngestRecord) -> Self {
        OutcomeStatus::Catalogued {
            record: Box::new(record),
        }
    }

    pub fn failed(error: &IngestError) -> Self {
        let step = match error {
            IngestError::Execution(e) => e.step().map(str::to_string),
            _ => None,
        };
        OutcomeStatus::Failed {
            error: error.to_string(),
            step,
        }
    }
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self.status, OutcomeStatus::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Writes the outcome list as a pretty-printed JSON array.
pub fn write_outcomes(path: &Path, outcomes: &[Outcome]) -> Result<(), StorageError> {
    let document = serde_json::to_vec_pretty(outcomes)?;
    filesystem::write_replace(path, &document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecutionError, StepError};
    use serde_json::json;
    use tempfile::TempDir;

    fn failed_outcome() -> Outcome {
        let error = IngestError::Execution(ExecutionError::StepExecution {
            step: "pdf-extract".to_string(),
            source: StepError::Extraction("Failed to load PDF".to_string()),
        });
        Outcome {
            index: 2,
            input: "/in/bad.pdf".to_string(),
            kind: Some(InputKind::Pdf),
            duration_ms: 4,
            status: OutcomeStatus::failed(&error),
        }
    }

    #[test]
    fn test_failed_outcome_names_step() {
        let outcome = failed_outcome();
        assert!(!outcome.is_success());
        assert!(outcome.error().unwrap().contains("pdf-extract"));
        assert!(matches!(
            &outcome.status,
            OutcomeStatus::Failed { step: Some(step), .. } if step == "pdf-extract"
        ));
    }

    #[test]
    fn test_processed_outcome_from_context() {
        let mut ctx = RequestContext::new(InputKind::PlainTextOrJson, "a.txt", PathBuf::from("/out/a.txt"));
        ctx.text = "héllo".to_string();
        ctx.merge_metadata("local_copy", json!("/out/a.txt"));
        let status = OutcomeStatus::processed(ctx);

        match status {
            OutcomeStatus::Processed {
                destination,
                text,
                text_chars,
                ..
            } => {
                assert_eq!(destination, Some(PathBuf::from("/out/a.txt")));
                assert_eq!(text, "héllo");
                assert_eq!(text_chars, 5);
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn test_processed_outcome_without_persist_has_no_destination() {
        let mut ctx = RequestContext::new(InputKind::HttpPage, "https://example.com", PathBuf::from("/out/page.txt"));
        ctx.text = "summary of the page".to_string();

        let value = serde_json::to_value(OutcomeStatus::processed(ctx)).unwrap();
        assert_eq!(value["status"], "processed");
        assert_eq!(value["text"], "summary of the page");
        assert!(value.get("destination").is_none());
    }

    #[test]
    fn test_write_outcomes_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.json");
        write_outcomes(&path, &[failed_outcome()]).unwrap();

        let value: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value[0]["status"], "failed");
        assert_eq!(value[0]["step"], "pdf-extract");
        assert_eq!(value[0]["kind"], "pdf");
        assert_eq!(value[0]["index"], 2);

        let parsed: Vec<Outcome> = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, vec![failed_outcome()]);
    }
}
