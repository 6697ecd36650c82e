use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use taskmint_core::config::ExtractionConfig;
use taskmint_core::domain::candidate::TaskCandidate;
use taskmint_core::domain::user::ContactAlias;
use taskmint_core::errors::DomainError;
use taskmint_core::timezone::ReferenceZone;

use crate::llm::LlmClient;
use crate::normalize::{normalize_response, NormalizeContext};
use crate::prompt::{render_extraction_prompt, PromptContext};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("input text is {chars} characters, above the {max} limit")]
    InputTooLong { chars: usize, max: usize },
    #[error("completion request failed")]
    Completion(#[source] anyhow::Error),
    #[error("model response was not valid JSON")]
    ResponseNotJson {
        #[source]
        source: serde_json::Error,
    },
    #[error("model response was not a JSON array")]
    ResponseNotArray,
    #[error("response element {index} is not an object")]
    ElementNotObject { index: usize },
    #[error("repaired candidate failed validation")]
    InvalidCandidate(#[from] DomainError),
}

impl ExtractionError {
    /// Whether the caller's input, rather than the model or transport, was
    /// at fault.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::InputTooLong { .. })
    }
}

/// One-shot extraction orchestrator: build the prompt, make exactly one
/// completion call, repair what comes back. No retries; the http client's
/// timeout is the only bound on the call.
pub struct TaskExtractor {
    llm: Arc<dyn LlmClient>,
    zone: ReferenceZone,
    max_input_chars: usize,
}

impl TaskExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, config: &ExtractionConfig) -> Self {
        Self {
            llm,
            zone: config.reference_zone().unwrap_or_default(),
            max_input_chars: config.max_input_chars,
        }
    }

    pub fn reference_zone(&self) -> ReferenceZone {
        self.zone
    }

    pub async fn extract(
        &self,
        text: &str,
        acting_user_name: &str,
        contacts: &[ContactAlias],
    ) -> Result<Vec<TaskCandidate>, ExtractionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ExtractionError::EmptyInput);
        }
        let chars = trimmed.chars().count();
        if chars > self.max_input_chars {
            return Err(ExtractionError::InputTooLong { chars, max: self.max_input_chars });
        }

        let now = Utc::now();
        let prompt = render_extraction_prompt(
            trimmed,
            &PromptContext { now, zone: self.zone, user_name: acting_user_name, contacts },
        );

        let raw = self.llm.complete(&prompt).await.map_err(ExtractionError::Completion)?;

        let candidates = normalize_response(
            &raw,
            &NormalizeContext { fallback_assignee: acting_user_name, now, zone: self.zone },
        )?;
        for candidate in &candidates {
            candidate.validate()?;
        }
        Ok(candidates)
    }
}
