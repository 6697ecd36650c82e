use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::task::{Priority, MAX_TASK_NAME_CHARS};
use crate::errors::DomainError;

/// Sentinel task name used when the source text carried no recognizable
/// action. Mirrors the placeholder the model is instructed to emit.
pub const TASK_NAME_SENTINEL: &str = "-";

/// A structured, schema-valid task record produced by extraction, prior to
/// persistence. Constructed fresh per request and never mutated after
/// return; downstream persistence assigns identity and ownership.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCandidate {
    pub task_name: String,
    pub assignee: String,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub confidence: f64,
}

impl TaskCandidate {
    pub fn validate(&self) -> Result<(), DomainError> {
        let name_chars = self.task_name.chars().count();
        if name_chars == 0 || name_chars > MAX_TASK_NAME_CHARS {
            return Err(DomainError::InvalidTaskNameLength(name_chars));
        }
        if self.assignee.is_empty() {
            return Err(DomainError::InvariantViolation("assignee must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DomainError::ConfidenceOutOfRange(self.confidence));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{TaskCandidate, TASK_NAME_SENTINEL};
    use crate::domain::task::Priority;

    #[test]
    fn sentinel_named_candidate_is_schema_valid() {
        let candidate = TaskCandidate {
            task_name: TASK_NAME_SENTINEL.to_string(),
            assignee: "Alex".to_string(),
            due_date: Utc::now(),
            priority: Priority::P3,
            confidence: 0.3,
        };

        assert!(candidate.validate().is_ok());
    }

    #[test]
    fn wire_format_uses_camel_case_field_names() {
        let candidate = TaskCandidate {
            task_name: "Finish report".to_string(),
            assignee: "Sam".to_string(),
            due_date: Utc::now(),
            priority: Priority::P1,
            confidence: 0.9,
        };

        let json = serde_json::to_value(&candidate).expect("serialize");
        assert!(json.get("taskName").is_some());
        assert!(json.get("dueDate").is_some());
        assert_eq!(json.get("priority").and_then(|value| value.as_str()), Some("P1"));
    }
}
