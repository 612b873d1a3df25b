//! Summarizer input assembled from the task and its nearest neighbors

use crate::providers::VectorMatch;
use crate::types::TaskId;

/// Build the context passed to the summarizer.
///
/// The task's own description comes first, then one line per neighbor in
/// the order the index returned them, separated by blank lines.
pub fn build_context(task_id: &TaskId, description: &str, neighbors: &[VectorMatch]) -> String {
    let mut sections = Vec::with_capacity(neighbors.len() + 1);
    sections.push(format!("Task {}\n{}", task_id, description));

    for neighbor in neighbors {
        sections.push(format!(
            "Text representation for task ID {} (similarity {:.3}).",
            neighbor.id, neighbor.score
        ));
    }

    sections.join("\n\n")
}
