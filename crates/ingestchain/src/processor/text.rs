use std::path::Path;

use serde_json::json;

use crate::error::StepError;
use crate::pipeline::RequestContext;
use crate::step::{names, Step};

/// Reads a local file into `text`.
///
/// Non-UTF-8 files (images handed on to OCR, for example) leave `text`
/// untouched and only record their size.
pub struct LocalRead;

impl Step for LocalRead {
    fn name(&self) -> &str {
        names::LOCAL_READ
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let path = Path::new(&ctx.source_path);
        let bytes = std::fs::read(path).map_err(|e| StepError::ReadInput {
            path: path.to_path_buf(),
            source: e,
        })?;

        let size = bytes.len();
        match String::from_utf8(bytes) {
            Ok(text) => ctx.text = text,
            Err(_) => {
                tracing::debug!("{} is binary, leaving text unchanged", ctx.file_name());
                ctx.merge_metadata("binary_input", json!(true));
            }
        }
        ctx.merge_metadata("source_bytes", json!(size));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::InputKind;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn ctx_for(path: &Path) -> RequestContext {
        RequestContext::new(
            InputKind::PlainTextOrJson,
            path.to_string_lossy(),
            PathBuf::from("out.txt"),
        )
    }

    #[test]
    fn test_reads_text_file() {
        let mut temp_file = NamedTempFile::with_suffix(".txt").unwrap();
        write!(temp_file, "Test content").unwrap();

        let mut ctx = ctx_for(temp_file.path());
        LocalRead.handle(&mut ctx).unwrap();

        assert_eq!(ctx.text, "Test content");
        assert_eq!(ctx.metadata["source_bytes"], 12);
    }

    #[test]
    fn test_binary_file_keeps_text() {
        let mut temp_file = NamedTempFile::with_suffix(".png").unwrap();
        temp_file.write_all(&[0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe]).unwrap();

        let mut ctx = ctx_for(temp_file.path());
        ctx.text = "earlier".to_string();
        LocalRead.handle(&mut ctx).unwrap();

        assert_eq!(ctx.text, "earlier");
        assert_eq!(ctx.metadata["binary_input"], true);
    }

    #[test]
    fn test_missing_file() {
        let mut ctx = ctx_for(Path::new("/nonexistent/file.txt"));
        let err = LocalRead.handle(&mut ctx).unwrap_err();
        match err {
            StepError::ReadInput { path, .. } => {
                assert_eq!(path.to_str().unwrap(), "/nonexistent/file.txt")
            }
            other => panic!("Expected ReadInput error, got {:?}", other),
        }
    }
}
