use std::path::Path;

use crate::error::StepError;
use crate::pipeline::RequestContext;
use crate::providers::CommandRunner;
use crate::step::{names, Step};

/// Recognises text in an image with an external OCR tool (`tesseract` by
/// default) and replaces `text` with its output.
pub struct Ocr {
    runner: CommandRunner,
}

impl Ocr {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

impl Step for Ocr {
    fn name(&self) -> &str {
        names::OCR
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let _span = tracing::info_span!("processor.ocr", tool = self.runner.program()).entered();

        if !Path::new(&ctx.source_path).is_file() {
            return Err(StepError::MissingInput(format!(
                "image '{}' not found",
                ctx.file_name()
            )));
        }

        let text = self.runner.run(&ctx.source_path, "")?;
        ctx.text = text.trim().to_string();
        Ok(())
    }
}
