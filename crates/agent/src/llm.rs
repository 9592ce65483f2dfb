use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use callcart_core::config::{LlmConfig, LlmProvider};

/// Maximum number of characters of an error body carried into an error message.
const ERROR_BODY_PREVIEW: usize = 500;

/// Single-shot text completion. Implementations never retry.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Builds the configured provider.
pub fn client_from_config(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::from_config(config)?),
        LlmProvider::Ollama => Arc::new(OllamaClient::from_config(config)?),
    };
    Ok(client)
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .context("failed to build HTTP client")
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

impl GeminiResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|text| !text.trim().is_empty())
    }
}

/// Google Generative Language `generateContent` over REST.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("llm.api_key is required for the gemini provider"))?;
        let model = config.model().to_string();
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url().trim_end_matches('/'),
            model
        );

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            endpoint,
            model,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn request<'a>(&self, prompt: &'a str) -> GeminiRequest<'a> {
        GeminiRequest {
            contents: [GeminiContent { role: "user", parts: [GeminiPart { text: prompt }] }],
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.request(prompt))
            .send()
            .await
            .context("gemini request failed")?;

        let status = response.status();
        debug!(event_name = "agent.llm.response", provider = "gemini", model = %self.model, status = %status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("gemini returned {status}: {}", preview(&body));
        }

        let body: GeminiResponse =
            response.json().await.context("failed to decode gemini response")?;
        body.first_text().ok_or_else(|| anyhow!("empty response from gemini"))
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

/// Local Ollama `/api/generate`, non-streaming.
#[derive(Debug)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            endpoint: format!("{}/api/generate", config.base_url().trim_end_matches('/')),
            model: config.model().to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn request<'a>(&'a self, prompt: &'a str) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request(prompt))
            .send()
            .await
            .context("ollama request failed")?;

        let status = response.status();
        debug!(event_name = "agent.llm.response", provider = "ollama", model = %self.model, status = %status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("ollama returned {status}: {}", preview(&body));
        }

        let body: OllamaResponse =
            response.json().await.context("failed to decode ollama response")?;
        if body.response.trim().is_empty() {
            bail!("empty response from ollama");
        }
        Ok(body.response)
    }
}

/// Replays queued responses in order and records every prompt it receives.
#[derive(Default)]
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|text| Ok(text.into())).collect()),
            prompts: Mutex::default(),
        }
    }

    pub async fn push_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(Ok(text.into()));
    }

    pub async fn push_failure(&self, message: impl Into<String>) {
        self.responses.lock().await.push_back(Err(message.into()));
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().await.push(prompt.to_string());
        match self.responses.lock().await.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted response left")),
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use callcart_core::config::{LlmConfig, LlmProvider};

    use super::{
        client_from_config, GeminiClient, GeminiResponse, LlmClient, OllamaClient,
        ScriptedLlmClient,
    };

    fn config(provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: None,
            base_url: None,
            model: None,
            timeout_secs: 5,
            temperature: 0.0,
            max_output_tokens: 500,
        }
    }

    #[test]
    fn gemini_requires_an_api_key() {
        assert!(GeminiClient::from_config(&config(LlmProvider::Gemini)).is_err());
        assert!(client_from_config(&config(LlmProvider::Ollama)).is_ok());
    }

    #[test]
    fn gemini_request_uses_generate_content_shape() {
        let mut cfg = config(LlmProvider::Gemini);
        cfg.api_key = Some(SecretString::from("key-123".to_string()));
        cfg.base_url = Some("https://example.test/v1beta/".to_string());
        let client = GeminiClient::from_config(&cfg).expect("gemini client");

        let body = serde_json::to_value(client.request("hello")).expect("serialize request");

        assert_eq!(client.endpoint, "https://example.test/v1beta/models/gemini-2.5-flash:generateContent");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 500);
        assert!(!format!("{client:?}").contains("key-123"));
    }

    #[test]
    fn gemini_response_takes_first_candidate_text() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":1}"},{"text":"ignored"}]}}]}"#,
        )
        .expect("parse response");
        assert_eq!(response.first_text().as_deref(), Some("{\"a\":1}"));

        let empty: GeminiResponse =
            serde_json::from_str(r#"{"candidates":[]}"#).expect("parse response");
        assert!(empty.first_text().is_none());
    }

    #[test]
    fn ollama_request_disables_streaming() {
        let mut cfg = config(LlmProvider::Ollama);
        cfg.model = Some("qwen2.5".to_string());
        let client = OllamaClient::from_config(&cfg).expect("ollama client");

        let body = serde_json::to_value(client.request("hi")).expect("serialize request");

        assert_eq!(client.endpoint, "http://localhost:11434/api/generate");
        assert_eq!(body["model"], "qwen2.5");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 500);
    }

    #[tokio::test]
    async fn scripted_client_replays_in_order_then_fails() {
        let client = ScriptedLlmClient::with_responses(["first"]);
        client.push_failure("model offline").await;

        assert_eq!(client.complete("p1").await.expect("first"), "first");
        assert!(client.complete("p2").await.is_err());
        assert!(client.complete("p3").await.is_err());
        assert_eq!(client.prompts().await, vec!["p1", "p2", "p3"]);
    }
}
