//! Language-model boundary for the intent pipeline.
//!
//! The model is strictly a translator: it turns transcripts and free-text
//! queries into loosely shaped JSON. Everything that reaches a persisted
//! record or a ranking decision goes through the repair and validation
//! layer in this crate first.
//!
//! - `llm` - the `LlmClient` capability and its Gemini, Ollama and scripted providers
//! - `prompt` - prompt construction for both call analysis and query extraction
//! - `repair` - JSON recovery and lenient field coercion
//! - `normalizer` - transcript to `CallAnalysis`
//! - `extraction` - recommendation query to `ExtractedProductIntent`
//! - `runtime` - the pair of the above sharing one client

pub mod extraction;
pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod repair;
pub mod runtime;

pub use extraction::ProductIntentExtractor;
pub use llm::{client_from_config, GeminiClient, LlmClient, OllamaClient, ScriptedLlmClient};
pub use normalizer::{IntentNormalizer, NormalizeRequest};
pub use runtime::AgentRuntime;
