//! Turning model output into a JSON object.
//!
//! Models asked for JSON often wrap it in a code fence, add chatter around
//! it, leave trailing commas or stop mid-object. [`parse_model_output`]
//! tries a strict parse, then one repair pass, and otherwise reports
//! [`ParseOutcome::Degraded`] instead of failing.

use serde_json::{Map, Value};

/// Result of coercing model output into metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Map<String, Value>),
    Degraded { reason: String },
}

impl ParseOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ParseOutcome::Degraded { .. })
    }
}

pub fn parse_model_output(raw: &str) -> ParseOutcome {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) {
        return ParseOutcome::Parsed(map);
    }

    let Some(repaired) = repair_json(raw) else {
        return ParseOutcome::Degraded {
            reason: "no recoverable JSON object in model output".to_string(),
        };
    };

    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(map)) => ParseOutcome::Parsed(map),
        Ok(other) => ParseOutcome::Degraded {
            reason: format!("expected a JSON object, got {}", type_name(&other)),
        },
        Err(e) => ParseOutcome::Degraded {
            reason: format!("repaired output still invalid: {}", e),
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Best-effort syntactic repair of a JSON object embedded in `raw`.
///
/// Strips code fences and surrounding commentary, drops trailing commas,
/// fills dangling values with `null`, closes an unterminated string and
/// balances open brackets. Returns `None` when there is no object to start
/// from or brackets close in the wrong order. Text that is already a valid
/// object comes back unchanged.
pub fn repair_json(raw: &str) -> Option<String> {
    let body = strip_fence(raw.trim());
    let start = body.find('{')?;

    let mut out = String::with_capacity(body.len() - start + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in body[start..].chars() {
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    out.push(c);
                }
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => {}
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                stack.push(c);
                out.push(c);
            }
            '}' | ']' => {
                let open = stack.pop()?;
                if (open == '{') != (c == '}') {
                    return None;
                }
                settle_dangling(&mut out);
                out.push(c);
                if stack.is_empty() {
                    return Some(out);
                }
            }
            ',' => {
                settle_dangling(&mut out);
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    // Output stopped mid-object.
    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    while let Some(open) = stack.pop() {
        settle_dangling(&mut out);
        out.push(if open == '{' { '}' } else { ']' });
    }
    Some(out)
}

/// Inside a ```` ``` ```` fence, if there is one.
fn strip_fence(text: &str) -> &str {
    for marker in ["```json", "```"] {
        if let Some(start) = text.find(marker) {
            let after_fence = &text[start + marker.len()..];
            return match after_fence.find("```") {
                Some(end) => after_fence[..end].trim(),
                None => after_fence.trim(),
            };
        }
    }
    text
}

/// Drops a trailing comma and gives a dangling `"key":` a `null` value.
fn settle_dangling(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);

    if out.ends_with(',') {
        out.pop();
        let trimmed_len = out.trim_end().len();
        out.truncate(trimmed_len);
    }
    if out.ends_with(':') {
        out.push_str(" null");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn parsed(raw: &str) -> Value {
        match parse_model_output(raw) {
            ParseOutcome::Parsed(map) => Value::Object(map),
            ParseOutcome::Degraded { reason } => panic!("degraded: {}", reason),
        }
    }

    #[test]
    fn test_valid_object_parses_directly() {
        assert_eq!(
            parsed(r#"{"title": "X", "keywords": ["a", "b"]}"#),
            json!({"title": "X", "keywords": ["a", "b"]})
        );
    }

    #[test]
    fn test_dangling_value_becomes_null() {
        assert_eq!(
            repair_json(r#"{"title": "X", "category": }"#).unwrap(),
            r#"{"title": "X", "category": null}"#
        );
        assert_eq!(
            parsed(r#"{"title": "X", "category": }"#),
            json!({"title": "X", "category": null})
        );
    }

    #[test]
    fn test_unclosable_structure_degrades() {
        assert!(parse_model_output(r#"{"title": "X", "tags": ["a", "b"}"#).is_degraded());
        assert!(parse_model_output("I could not find any metadata, sorry.").is_degraded());
        assert!(parse_model_output("").is_degraded());
    }

    #[test]
    fn test_fenced_output_with_commentary() {
        let raw = "Here you go:\n```json\n{\"title\": \"Q3 plan\", \"category\": \"finance\",}\n```\nLet me know!";
        assert_eq!(parsed(raw), json!({"title": "Q3 plan", "category": "finance"}));
    }

    #[test]
    fn test_trailing_commentary_is_cut() {
        let raw = r#"Sure! {"title": "Memo", "keywords": ["a",]} Hope this {helps}"#;
        assert_eq!(parsed(raw), json!({"title": "Memo", "keywords": ["a"]}));
    }

    #[test]
    fn test_truncated_output_is_closed() {
        let raw = r#"{"title": "Roadmap", "description": "Plans for the next quar"#;
        assert_eq!(
            parsed(raw),
            json!({"title": "Roadmap", "description": "Plans for the next quar"})
        );

        let raw = r#"{"title": "Roadmap", "keywords": ["q3", "okr", "#;
        assert_eq!(parsed(raw), json!({"title": "Roadmap", "keywords": ["q3", "okr"]}));
    }

    #[test]
    fn test_raw_newline_in_string() {
        let raw = "{\"description\": \"line one\nline two\"";
        assert_eq!(parsed(raw), json!({"description": "line one\nline two"}));
    }

    #[test]
    fn test_non_object_json_degrades() {
        assert!(parse_model_output("[1, 2, 3]").is_degraded());
    }

    proptest! {
        #[test]
        fn prop_repair_leaves_valid_objects_alone(
            entries in proptest::collection::btree_map("[a-z]{1,8}", "[a-zA-Z0-9 ,:]{0,12}", 0..6),
            count in 0u32..1000,
        ) {
            let mut map = Map::new();
            for (k, v) in entries {
                map.insert(k, Value::String(v));
            }
            map.insert("count".to_string(), json!(count));
            let text = serde_json::to_string(&Value::Object(map.clone())).unwrap();

            prop_assert_eq!(repair_json(&text), Some(text.clone()));
            prop_assert_eq!(parse_model_output(&text), ParseOutcome::Parsed(map));
        }

        #[test]
        fn prop_repair_is_idempotent(raw in "[ -~]{0,40}") {
            if let Some(once) = repair_json(&raw) {
                prop_assert_eq!(repair_json(&once), Some(once.clone()));
            }
        }
    }
}
