//! Extraction pipeline - natural language in, structured task candidates out
//!
//! This crate turns free-form text ("remind ravi to send the deck by friday")
//! into validated `TaskCandidate` records:
//!
//! 1. **Prompt Construction** (`prompt`) - Embed time, user, and contact
//!    context into a single instruction block
//! 2. **Completion** (`llm`) - One call through the pluggable `LlmClient`
//!    trait (Gemini or Ollama behind the same seam)
//! 3. **Normalization** (`normalize`) - Repair the untrusted JSON the model
//!    returns, field by field, with confidence capping
//!
//! # Key Types
//!
//! - `TaskExtractor` - Main orchestrator (see `extractor` module)
//! - `LlmClient` - Pluggable completion trait
//! - `ExtractionError` - Why an extraction run produced nothing
//!
//! # Trust Principle
//!
//! The model output is never trusted. Every field is checked and repaired
//! deterministically; a repair that loses information lowers the candidate's
//! confidence, and a response that is not a JSON array of objects is a hard
//! failure rather than a guess.

pub mod extractor;
pub mod llm;
pub mod normalize;
pub mod prompt;

pub use extractor::{ExtractionError, TaskExtractor};
pub use llm::{build_llm_client, GeminiClient, LlmClient, OllamaClient};
