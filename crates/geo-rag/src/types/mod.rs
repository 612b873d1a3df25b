//! Core types for the task pipeline

pub mod task;

pub use task::{object_path, TaskId, TaskMessage, TaskState, TaskStatus};
