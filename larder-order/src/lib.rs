pub mod builder;
pub mod fulfillment;
pub mod orchestrator;
pub mod submitter;

pub use builder::{CartBuilder, ItemOutcome, ResolveError};
pub use orchestrator::{Pipeline, PipelineError};
pub use submitter::{OrderSubmitter, SubmissionOutcome};
