use std::sync::Arc;

use anyhow::Result;

use callcart_core::config::LlmConfig;

use crate::extraction::ProductIntentExtractor;
use crate::llm::{client_from_config, LlmClient};
use crate::normalizer::IntentNormalizer;

/// Call analysis and query extraction sharing one capability client.
pub struct AgentRuntime {
    pub normalizer: IntentNormalizer,
    pub extractor: ProductIntentExtractor,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            normalizer: IntentNormalizer::new(llm.clone()),
            extractor: ProductIntentExtractor::new(llm),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::new(client_from_config(config)?))
    }
}
