use tracing::{debug, info_span};

use crate::error::ExecutionError;

use super::chain::Chain;
use super::context::RequestContext;
use super::progress::{ProgressEvent, ProgressReporter};

/// How a chain run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    /// Every step ran.
    Completed,
    /// A step set the short-circuit signal; the named step was the last to run.
    Halted { after: String },
}

/// Drives `chain` against `ctx`, one step at a time.
///
/// The halt signal is checked after every step. A failing step aborts the
/// chain and its error is returned tagged with the step name; `ctx` keeps
/// whatever earlier steps wrote.
pub fn run(
    chain: &Chain,
    ctx: &mut RequestContext,
    progress: &dyn ProgressReporter,
) -> Result<ChainStatus, ExecutionError> {
    if chain.is_empty() {
        return Err(ExecutionError::EmptyChain);
    }

    let total = chain.len();
    for (index, link) in chain.iter().enumerate() {
        let _step = info_span!("step", name = %link.name).entered();
        progress.report(ProgressEvent::StepStarted {
            step: link.name.clone(),
            index,
            total,
        });

        if let Err(source) = link.step.handle(ctx) {
            progress.report(ProgressEvent::Failed {
                step: link.name.clone(),
                error: source.to_string(),
            });
            return Err(ExecutionError::StepExecution {
                step: link.name.clone(),
                source,
            });
        }

        if let Some(recommendation) = &ctx.recommendation {
            debug!("Short-circuit set by '{}'", link.name);
            progress.report(ProgressEvent::Halted {
                step: link.name.clone(),
                recommendation: recommendation.clone(),
            });
            return Ok(ChainStatus::Halted {
                after: link.name.clone(),
            });
        }
    }

    progress.report(ProgressEvent::Completed { steps_run: total });
    Ok(ChainStatus::Completed)
}
