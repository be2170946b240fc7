//! Helpers for sanitizing locators before they enter tracing span attributes.
//!
//! Inputs can be signed URLs, wiki links carrying tokens, or paths under a
//! user's home directory. Spans only ever see the redacted form.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Redacts an input locator for logging.
///
/// - `https://user:pw@host/a/b?sig=..` → `https://****@host/a/b`
/// - `s3://bucket/key/report.pdf` → `s3://bucket/key/report.pdf` (no change)
/// - `/home/me/docs/report.pdf` → `report.pdf`
pub fn redact_locator(locator: &str) -> String {
    if let Some(scheme_end) = locator.find("://") {
        let scheme = &locator[..scheme_end + 3];
        let mut rest = &locator[scheme_end + 3..];

        // Query strings routinely carry signatures and tokens
        if let Some(q) = rest.find(['?', '#']) {
            rest = &rest[..q];
        }

        let authority_end = rest.find('/').unwrap_or(rest.len());
        if let Some(at_pos) = rest[..authority_end].find('@') {
            return format!("{}****@{}", scheme, &rest[at_pos + 1..]);
        }
        return format!("{}{}", scheme, rest);
    }

    redact_path(Path::new(locator))
}
