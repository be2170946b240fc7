//! Personal data detection and reversible anonymisation.
//!
//! [`PiiTokenize`] swaps every detected value for a placeholder such as
//! `[PII_EMAIL_1]` and keeps the mapping in the `pii_tokens` metadata entry.
//! [`PiiDetokenize`] puts the values back and drops the mapping, so a model
//! only ever sees placeholders.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::StepError;
use crate::pipeline::RequestContext;
use crate::step::{names, Step};

pub const TOKENS_KEY: &str = "pii_tokens";

/// Entity types in match order. Earlier types claim overlapping text.
static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "EMAIL",
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
        ),
        ("SSN", Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap()),
        (
            "CREDIT_DEBIT_NUMBER",
            Regex::new(r"\b(?:\d{4}[ -]?){3}\d{4}\b").unwrap(),
        ),
        (
            "PHONE",
            Regex::new(r"(?:\+\d{1,3}[ .-]?)?\(?\b\d{3}\)?[ .-]?\d{3}[ .-]\d{4}\b").unwrap(),
        ),
    ]
});

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[PII_[A-Z_]+_\d+\]").unwrap());

/// Entity types present in `text`, in match order, without duplicates.
pub fn detect(text: &str) -> Vec<&'static str> {
    PATTERNS
        .iter()
        .filter(|(_, regex)| regex.is_match(text))
        .map(|(kind, _)| *kind)
        .collect()
}

/// Replaces detected values with placeholders. Equal values share one
/// placeholder. Returns the text and the placeholder-to-value mapping.
pub fn tokenize(text: &str) -> (String, BTreeMap<String, String>) {
    let mut mapping: BTreeMap<String, String> = BTreeMap::new();
    let mut by_value: BTreeMap<String, String> = BTreeMap::new();
    let mut output = text.to_string();

    for (kind, regex) in PATTERNS.iter() {
        let mut counter = 0usize;
        output = regex
            .replace_all(&output, |caps: &regex::Captures<'_>| {
                let value = caps[0].to_string();
                by_value
                    .entry(value.clone())
                    .or_insert_with(|| {
                        counter += 1;
                        let placeholder = format!("[PII_{}_{}]", kind, counter);
                        mapping.insert(placeholder.clone(), value);
                        placeholder
                    })
                    .clone()
            })
            .into_owned();
    }

    (output, mapping)
}

/// Puts original values back. Returns the text and the placeholders that no
/// longer occur in it.
pub fn detokenize(text: &str, mapping: &BTreeMap<String, String>) -> (String, Vec<String>) {
    let mut output = text.to_string();
    let mut missing = Vec::new();

    for (placeholder, value) in mapping {
        if output.contains(placeholder.as_str()) {
            output = output.replace(placeholder.as_str(), value);
        } else {
            missing.push(placeholder.clone());
        }
    }

    (output, missing)
}

/// Flags whether `text` contains personal data and which kinds. Kinds found
/// by earlier steps are kept.
pub struct PiiDetect;

impl Step for PiiDetect {
    fn name(&self) -> &str {
        names::PII_DETECT
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let found = detect(&ctx.text);
        ctx.merge_metadata("detected_pii", json!(found));

        let mut seen = BTreeSet::new();
        let is_pii = match ctx.metadata.get_mut("detected_pii") {
            Some(Value::Array(kinds)) => {
                kinds.retain(|kind| seen.insert(kind.to_string()));
                !kinds.is_empty()
            }
            _ => !found.is_empty(),
        };
        ctx.merge_metadata("is_pii", json!(is_pii));
        Ok(())
    }
}

pub struct PiiTokenize;

impl Step for PiiTokenize {
    fn name(&self) -> &str {
        names::PII_TOKENIZE
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let (text, mapping) = tokenize(&ctx.text);
        if mapping.is_empty() {
            return Ok(());
        }

        tracing::debug!("Replaced {} values with placeholders", mapping.len());
        let tokens: Map<String, Value> = mapping
            .into_iter()
            .map(|(placeholder, value)| (placeholder, Value::String(value)))
            .collect();
        ctx.merge_metadata(TOKENS_KEY, Value::Object(tokens));
        ctx.text = text;
        Ok(())
    }
}

pub struct PiiDetokenize;

impl Step for PiiDetokenize {
    fn name(&self) -> &str {
        names::PII_DETOKENIZE
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let Some(tokens) = ctx.metadata.remove(TOKENS_KEY) else {
            return Ok(());
        };

        let mapping: BTreeMap<String, String> = tokens
            .as_object()
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let (text, missing) = detokenize(&ctx.text, &mapping);
        let unknown = PLACEHOLDER
            .find_iter(&text)
            .filter(|m| !mapping.contains_key(m.as_str()))
            .count();

        if !missing.is_empty() {
            warn!(
                "{} of {} placeholders were not found in the output",
                missing.len(),
                mapping.len()
            );
        }

        ctx.merge_metadata(
            "pii_integrity",
            json!({
                "expected": mapping.len(),
                "restored": mapping.len() - missing.len(),
                "missing": missing.len(),
                "unknown": unknown,
            }),
        );
        ctx.text = text;
        Ok(())
    }
}
