//! Submission and background processing of tasks

mod describe;
mod dispatcher;
mod retrieval;
mod worker;

pub use describe::describe;
pub use dispatcher::TaskDispatcher;
pub use retrieval::build_context;
pub use worker::{PipelineDeps, PipelineStage, TaskOutcome, TaskPipeline, WorkerPool};
