use std::path::Path;

use serde_json::json;

use crate::error::StepError;
use crate::pipeline::RequestContext;
use crate::step::{names, Step};

/// Pattern for Identity-H Unimplemented errors (common with CID fonts).
const IDENTITY_H_PATTERN: &str = "?Identity-H Unimplemented?";

/// Extracts the embedded text layer of a PDF with `lopdf`.
pub struct PdfExtract;

impl Step for PdfExtract {
    fn name(&self) -> &str {
        names::PDF_EXTRACT
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let path = Path::new(&ctx.source_path);
        let pdf_bytes = std::fs::read(path).map_err(|e| StepError::ReadInput {
            path: path.to_path_buf(),
            source: e,
        })?;

        let doc = lopdf::Document::load_mem(&pdf_bytes)
            .map_err(|e| StepError::Extraction(format!("Failed to load PDF: {}", e)))?;

        let (text, pages) = extract_text_from_pdf(&doc);
        if text.trim().is_empty() {
            tracing::warn!(
                "{} has no text layer ({} pages); it may need OCR",
                ctx.file_name(),
                pages
            );
        }

        ctx.text = text;
        ctx.merge_metadata("pages", json!(pages));
        Ok(())
    }
}

/// Page text in page order, with font-encoding error markers dropped.
fn extract_text_from_pdf(doc: &lopdf::Document) -> (String, usize) {
    let pages = doc.get_pages();
    let mut text = String::new();

    for page_num in pages.keys() {
        if let Ok(page_text) = doc.extract_text(&[*page_num]) {
            text.push_str(&page_text.replace(IDENTITY_H_PATTERN, ""));
            text.push('\n');
        }
    }

    (text, pages.len())
}
