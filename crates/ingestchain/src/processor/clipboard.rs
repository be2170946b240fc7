use crate::error::StepError;
use crate::pipeline::RequestContext;
use crate::providers::CommandRunner;
use crate::step::{names, Step};

/// Pipes `text` into the system clipboard tool.
pub struct ClipboardExport {
    runner: CommandRunner,
}

impl ClipboardExport {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

impl Step for ClipboardExport {
    fn name(&self) -> &str {
        names::CLIPBOARD_EXPORT
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        self.runner.run_with_stdin(ctx.text.as_bytes())?;
        tracing::debug!("Copied {} bytes to clipboard", ctx.text.len());
        Ok(())
    }
}
