//! The step abstraction and the registry that hands out step instances.

pub mod names;
pub mod registry;

pub use registry::StepRegistry;

use crate::error::StepError;
use crate::pipeline::RequestContext;

/// One unit of work in a chain.
///
/// Steps are shared between chains and workers, so they must not keep state
/// between calls: everything an invocation needs comes from the context.
/// A step mutates the context and either lets the chain continue or sets the
/// short-circuit signal with [`RequestContext::halt`].
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError>;
}
