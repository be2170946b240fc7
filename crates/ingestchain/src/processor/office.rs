//! OOXML readers: Word documents, PowerPoint decks and Excel workbooks.
//!
//! Documents and decks are zip archives of XML parts, read with `zip` and
//! streamed with `quick-xml`. Workbooks go through `calamine`.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Reader as _};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;
use serde_json::json;
use tracing::warn;

use crate::error::StepError;
use crate::pipeline::RequestContext;
use crate::step::{names, Step};

pub struct WordExtract;

impl Step for WordExtract {
    fn name(&self) -> &str {
        names::WORD_EXTRACT
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let mut archive = open_archive(Path::new(&ctx.source_path))?;
        let xml = read_part(&mut archive, "word/document.xml")?;
        ctx.text = paragraphs_text(&xml, b"t", b"p")?;
        Ok(())
    }
}

pub struct SlidesExtract;

impl Step for SlidesExtract {
    fn name(&self) -> &str {
        names::SLIDES_EXTRACT
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let mut archive = open_archive(Path::new(&ctx.source_path))?;

        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slides.sort_by_key(|(n, _)| *n);

        let mut text = String::new();
        for (number, part) in &slides {
            let xml = read_part(&mut archive, part)?;
            text.push_str(&format!("--- Slide {} ---\n", number));
            text.push_str(&paragraphs_text(&xml, b"t", b"p")?);
        }

        ctx.text = text;
        ctx.merge_metadata("slides", json!(slides.len()));
        Ok(())
    }
}

/// `ppt/slides/slide12.xml` -> 12
fn slide_number(part: &str) -> Option<u32> {
    part.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Writes each worksheet as a `# Sheet: <name>` header followed by its
/// non-empty rows, cells separated by tabs.
pub struct SpreadsheetRead;

impl Step for SpreadsheetRead {
    fn name(&self) -> &str {
        names::SPREADSHEET_READ
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let path = Path::new(&ctx.source_path);
        let data = std::fs::read(path).map_err(|e| StepError::ReadInput {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(data)).map_err(|e| {
            StepError::Extraction(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let mut text = String::new();
        let mut sheet_names = Vec::new();
        for name in workbook.sheet_names().to_vec() {
            let range = match workbook.worksheet_range(&name) {
                Ok(range) => range,
                Err(e) => {
                    warn!("Skipping sheet '{}': {}", name, e);
                    continue;
                }
            };

            text.push_str(&format!("# Sheet: {}\n", name));
            for row in range.rows() {
                let cells: Vec<String> = row.iter().map(cell_text).collect();
                if cells.iter().all(String::is_empty) {
                    continue;
                }
                text.push_str(&cells.join("\t"));
                text.push('\n');
            }
            sheet_names.push(name);
        }

        ctx.text = text;
        ctx.merge_metadata("sheets", json!(sheet_names));
        Ok(())
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        other => other.to_string(),
    }
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>, StepError> {
    let file = File::open(path).map_err(|e| StepError::ReadInput {
        path: path.to_path_buf(),
        source: e,
    })?;

    zip::ZipArchive::new(file)
        .map_err(|e| StepError::Extraction(format!("Failed to open {}: {}", path.display(), e)))
}

fn read_part<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<String, StepError> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| StepError::Extraction(format!("Failed to find {}: {}", name, e)))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| StepError::Extraction(format!("Failed to read {}: {}", name, e)))?;
    Ok(xml)
}

fn xml_error(e: impl std::fmt::Display) -> StepError {
    StepError::Extraction(format!("XML parsing error: {}", e))
}

/// Concatenates the text of `text_tag` elements, ending a line at every
/// closing `paragraph_tag`. Namespace prefixes are ignored. Whitespace inside
/// text elements is kept as written.
fn paragraphs_text(xml: &str, text_tag: &[u8], paragraph_tag: &[u8]) -> Result<String, StepError> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == text_tag => {
                in_text_element = true;
            }
            Ok(Event::End(ref e)) => {
                let local_name = e.local_name();
                if local_name.as_ref() == text_tag {
                    in_text_element = false;
                } else if local_name.as_ref() == paragraph_tag {
                    text.push('\n');
                }
            }
            Ok(Event::Text(e)) if in_text_element => {
                text.push_str(&e.decode().map_err(xml_error)?);
            }
            Ok(Event::GeneralRef(e)) if in_text_element => {
                push_reference(&mut text, &e)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(text)
}

/// Appends the character an entity or character reference stands for.
/// Unknown entities are kept literally.
fn push_reference(text: &mut String, reference: &BytesRef<'_>) -> Result<(), StepError> {
    if let Some(ch) = reference.resolve_char_ref().map_err(xml_error)? {
        text.push(ch);
        return Ok(());
    }

    let name = reference.decode().map_err(xml_error)?;
    match resolve_predefined_entity(&name) {
        Some(value) => text.push_str(value),
        None => {
            text.push('&');
            text.push_str(&name);
            text.push(';');
        }
    }
    Ok(())
}
