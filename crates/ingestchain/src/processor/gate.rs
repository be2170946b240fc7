use crate::error::StepError;
use crate::pipeline::RequestContext;
use crate::step::{names, Step};

pub const NO_RELEVANT_DATA: &str = "no relevant data found";

/// Halts the chain when there is nothing left to work on.
pub struct RelevanceGate;

impl Step for RelevanceGate {
    fn name(&self) -> &str {
        names::RELEVANCE_GATE
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        if ctx.text.trim().is_empty() {
            ctx.halt(
                NO_RELEVANT_DATA,
                vec![format!("{} produced no text", ctx.file_name())],
            );
        }
        Ok(())
    }
}
