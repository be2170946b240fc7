//! Batch execution: expanding batch arguments into inputs and fanning them
//! out over worker threads.

pub mod batch;
pub mod job;
pub mod pool;

pub use batch::{collect_inputs, read_list};
pub use job::{write_outcomes, Job, Outcome, OutcomeStatus};
pub use pool::{Dispatcher, KindResolver};
