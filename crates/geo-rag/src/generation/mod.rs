//! Prompt construction for summarization

pub mod prompt;

pub use prompt::PromptBuilder;
