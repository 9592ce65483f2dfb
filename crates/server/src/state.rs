use std::sync::Arc;

use secrecy::SecretString;

use callcart_agent::AgentRuntime;
use callcart_core::config::{AppConfig, Environment, RecommendationConfig, WebhookConfig};
use callcart_core::domain::merchant::MerchantId;
use callcart_core::signature::WebhookVerifier;
use callcart_db::Repositories;

#[derive(Debug)]
pub struct WebhookSettings {
    /// `None` when no shared secret is configured; signatures are then not checked.
    pub verifier: Option<WebhookVerifier>,
    pub signature_header: String,
    pub timestamp_header: String,
    pub default_merchant_id: MerchantId,
}

impl WebhookSettings {
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self {
            verifier: config
                .secret
                .clone()
                .map(|secret| WebhookVerifier::new(secret, config.tolerance_secs)),
            signature_header: config.signature_header.clone(),
            timestamp_header: config.timestamp_header.clone(),
            default_merchant_id: MerchantId(config.default_merchant_id.clone()),
        }
    }
}

#[derive(Debug)]
pub struct RecommendationSettings {
    pub api_key: Option<SecretString>,
    pub max_results: usize,
}

impl RecommendationSettings {
    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self { api_key: config.api_key.clone(), max_results: config.max_results }
    }
}

/// Shared handler state. Cloned per request; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub repositories: Repositories,
    pub agent: Arc<AgentRuntime>,
    pub webhook: Arc<WebhookSettings>,
    pub recommendation: Arc<RecommendationSettings>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(config: &AppConfig, repositories: Repositories, agent: Arc<AgentRuntime>) -> Self {
        Self {
            repositories,
            agent,
            webhook: Arc::new(WebhookSettings::from_config(&config.webhook)),
            recommendation: Arc::new(RecommendationSettings::from_config(&config.recommendation)),
            environment: config.server.environment,
        }
    }
}
