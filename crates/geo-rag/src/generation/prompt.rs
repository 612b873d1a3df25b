//! Prompt templates for summarization

/// Prompt builder for summarizer backends
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the summarization prompt around retrieved context
    pub fn build_summary_prompt(context: &str) -> String {
        format!(
            "Summarize the following geospatial data:\n\n{}\n\nSummary:",
            context
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_wraps_context() {
        let prompt = PromptBuilder::build_summary_prompt("Text representation for task ID x.");
        assert!(prompt.starts_with("Summarize the following geospatial data:\n\n"));
        assert!(prompt.contains("Text representation for task ID x."));
        assert!(prompt.ends_with("\n\nSummary:"));
    }
}
