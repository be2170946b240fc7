use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::pipeline::{InputKind, PipelineWarning, RequestContext};

pub const BROKEN_CATEGORY: &str = "broken";
pub const UNCATEGORIZED: &str = "uncategorized";

/// Where the original and the transcript of an input end up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locations {
    pub original_file: String,
    pub transcript_file: String,
}

/// The merged, catalogue-ready result of one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRecord {
    pub id: String,
    pub source: String,
    pub kind: InputKind,
    pub category: String,
    pub metadata: Map<String, Value>,
    /// Object-store URIs written while publishing.
    #[serde(default)]
    pub published: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PipelineWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl IngestRecord {
    fn base(ctx: &RequestContext, source: &str, category: String, metadata: Map<String, Value>) -> Self {
        let mut record = Self {
            id: ctx.id.clone(),
            source: source.to_string(),
            kind: ctx.kind,
            category,
            metadata,
            published: Vec::new(),
            warnings: Vec::new(),
            recommendation: ctx.recommendation.clone(),
            reasons: ctx.reasons.clone(),
        };

        let missing = ctx
            .metadata
            .get("pii_integrity")
            .and_then(|v| v.get("missing"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if missing > 0 {
            record.warnings.push(PipelineWarning::PiiIntegrity {
                missing: missing as usize,
            });
        }
        record
    }

    /// Record for an input whose ingestion chain stopped early.
    pub fn halted(ctx: &RequestContext, source: &str) -> Self {
        Self::base(ctx, source, UNCATEGORIZED.to_string(), Map::new())
    }

    /// Record for model output that could not be parsed: category
    /// `broken`, no metadata.
    pub fn degraded(ctx: &RequestContext, source: &str, reason: String) -> Self {
        let mut record = Self::base(ctx, source, BROKEN_CATEGORY.to_string(), Map::new());
        record.warnings.push(PipelineWarning::MetadataDegraded { reason });
        record
    }

    /// Record for parsed model output, merged over what the chain learned.
    pub fn parsed(
        ctx: &RequestContext,
        source: &str,
        locations: &Locations,
        model_fields: Map<String, Value>,
    ) -> Self {
        let category = category_of(&model_fields);
        let metadata = merge(ctx, locations, model_fields);
        Self::base(ctx, source, category, metadata)
    }

    pub fn push_warning(&mut self, warning: PipelineWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Lowercase category from the model fields, safe for use as a path
/// segment.
pub fn category_of(model_fields: &Map<String, Value>) -> String {
    let raw = model_fields
        .get("category")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_lowercase();

    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('_');

    if cleaned.is_empty() {
        UNCATEGORIZED.to_string()
    } else {
        cleaned.to_string()
    }
}

/// File classification, locations, PII flags and media inventory, then the
/// model fields on top. Model fields win on key collision.
pub fn merge(
    ctx: &RequestContext,
    locations: &Locations,
    model_fields: Map<String, Value>,
) -> Map<String, Value> {
    let annotation = |key: &str, default: Value| ctx.metadata.get(key).cloned().unwrap_or(default);

    let mut merged = Map::new();
    merged.insert("file_type".into(), json!(ctx.kind.as_str()));
    merged.insert("original_file".into(), json!(locations.original_file));
    merged.insert("transcript_file".into(), json!(locations.transcript_file));
    merged.insert("is_pii".into(), annotation("is_pii", json!(false)));
    merged.insert("detected_pii".into(), annotation("detected_pii", json!([])));
    merged.insert("media_files".into(), annotation("media_files", json!([])));

    merged.extend(model_fields);
    merged
}
