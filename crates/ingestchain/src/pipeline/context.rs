use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::InputKind;

pub const DEFAULT_PROMPT: &str = "default_prompt";

/// The mutable record threaded through every step of one chain.
///
/// Owned by exactly one worker for the lifetime of one input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub id: String,
    pub kind: InputKind,
    /// Origin locator. Reader steps may repoint it at a derived local file.
    pub source_path: String,
    /// Working payload, overwritten by extraction and transformed by later steps.
    pub text: String,
    pub destination_path: PathBuf,
    pub extract_media: bool,
    pub prompt_name: String,
    /// Additive annotations; see [`RequestContext::merge_metadata`].
    pub metadata: Map<String, Value>,
    pub recommendation: Option<String>,
    pub reasons: Vec<String>,
}

impl RequestContext {
    pub fn new(kind: InputKind, source_path: impl Into<String>, destination_path: PathBuf) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            source_path: source_path.into(),
            text: String::new(),
            destination_path,
            extract_media: true,
            prompt_name: DEFAULT_PROMPT.to_string(),
            metadata: Map::new(),
            recommendation: None,
            reasons: Vec::new(),
        }
    }

    pub fn with_prompt(mut self, prompt_name: impl Into<String>) -> Self {
        self.prompt_name = prompt_name.into();
        self
    }

    pub fn with_extract_media(mut self, extract_media: bool) -> Self {
        self.extract_media = extract_media;
        self
    }

    /// Adds `value` under `key` without discarding what earlier steps wrote.
    ///
    /// Objects merge key-wise (recursively), arrays are appended, anything
    /// else replaces the previous value.
    pub fn merge_metadata(&mut self, key: &str, value: Value) {
        match self.metadata.get_mut(key) {
            Some(existing) => merge_value(existing, value),
            None => {
                self.metadata.insert(key.to_string(), value);
            }
        }
    }

    /// Stops the chain after the current step.
    pub fn halt(&mut self, recommendation: impl Into<String>, reasons: Vec<String>) {
        self.recommendation = Some(recommendation.into());
        self.reasons.extend(reasons);
    }

    pub fn is_halted(&self) -> bool {
        self.recommendation.is_some()
    }

    pub fn file_name(&self) -> String {
        file_name_of(&self.source_path)
    }
}

/// Last path segment of a locator, ignoring any query string.
pub fn file_name_of(locator: &str) -> String {
    let without_query = locator.split(['?', '#']).next().unwrap_or(locator);
    without_query
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("input")
        .to_string()
}

fn merge_value(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(current), Value::Object(new)) => {
            for (k, v) in new {
                match current.get_mut(&k) {
                    Some(slot) => merge_value(slot, v),
                    None => {
                        current.insert(k, v);
                    }
                }
            }
        }
        (Value::Array(current), Value::Array(new)) => current.extend(new),
        (slot, new) => *slot = new,
    }
}
