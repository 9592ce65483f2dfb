use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ranking::MAX_RESULTS;
use crate::signature::DEFAULT_TOLERANCE_SECS;

pub const DEFAULT_MERCHANT_ID: &str = "merchant_001";
pub const DEFAULT_SIGNATURE_HEADER: &str = "elevenlabs-signature";
pub const DEFAULT_TIMESTAMP_HEADER: &str = "x-elevenlabs-timestamp";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub webhook: WebhookConfig,
    pub recommendation: RecommendationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl LlmConfig {
    /// Configured model, or the provider's default.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub environment: Environment,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub secret: Option<SecretString>,
    pub signature_header: String,
    pub timestamp_header: String,
    pub tolerance_secs: u64,
    pub default_merchant_id: String,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub api_key: Option<SecretString>,
    pub max_results: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::Ollama => "llama3.1",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

/// Deployment environment. Gates how much error detail reaches HTTP clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn exposes_error_detail(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub server_port: Option<u16>,
    pub environment: Option<Environment>,
    pub webhook_secret: Option<String>,
    pub recommendation_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://callcart.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: None,
                timeout_secs: 30,
                temperature: 0.0,
                max_output_tokens: 2048,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
                environment: Environment::Development,
                cors_allowed_origins: vec!["*".to_string()],
            },
            webhook: WebhookConfig {
                secret: None,
                signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
                timestamp_header: DEFAULT_TIMESTAMP_HEADER.to_string(),
                tolerance_secs: DEFAULT_TOLERANCE_SECS,
                default_merchant_id: DEFAULT_MERCHANT_ID.to_string(),
            },
            recommendation: RecommendationConfig { api_key: None, max_results: MAX_RESULTS },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

/// Empty secrets disable the check they guard.
fn optional_secret(value: String) -> Option<SecretString> {
    (!value.trim().is_empty()).then(|| secret_value(value))
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::Validation(format!(
                "unsupported server environment `{other}` (expected development|production)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("callcart.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = optional_secret(api_key);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = Some(model);
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_output_tokens) = llm.max_output_tokens {
                self.llm.max_output_tokens = max_output_tokens;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(environment) = server.environment {
                self.server.environment = environment;
            }
            if let Some(origins) = server.cors_allowed_origins {
                self.server.cors_allowed_origins = origins;
            }
        }

        if let Some(webhook) = patch.webhook {
            if let Some(secret) = webhook.secret {
                self.webhook.secret = optional_secret(secret);
            }
            if let Some(signature_header) = webhook.signature_header {
                self.webhook.signature_header = signature_header;
            }
            if let Some(timestamp_header) = webhook.timestamp_header {
                self.webhook.timestamp_header = timestamp_header;
            }
            if let Some(tolerance_secs) = webhook.tolerance_secs {
                self.webhook.tolerance_secs = tolerance_secs;
            }
            if let Some(default_merchant_id) = webhook.default_merchant_id {
                self.webhook.default_merchant_id = default_merchant_id;
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(api_key) = recommendation.api_key {
                self.recommendation.api_key = optional_secret(api_key);
            }
            if let Some(max_results) = recommendation.max_results {
                self.recommendation.max_results = max_results;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CALLCART_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CALLCART_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("CALLCART_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CALLCART_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CALLCART_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CALLCART_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("CALLCART_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CALLCART_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("CALLCART_LLM_MODEL") {
            self.llm.model = Some(value);
        }
        if let Some(value) = read_env("CALLCART_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CALLCART_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CALLCART_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("CALLCART_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("CALLCART_LLM_MAX_OUTPUT_TOKENS") {
            self.llm.max_output_tokens = parse_u32("CALLCART_LLM_MAX_OUTPUT_TOKENS", &value)?;
        }

        if let Some(value) = read_env("CALLCART_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CALLCART_SERVER_PORT") {
            self.server.port = parse_u16("CALLCART_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CALLCART_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("CALLCART_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("CALLCART_SERVER_ENVIRONMENT") {
            self.server.environment = value.parse()?;
        }
        if let Some(value) = read_env("CALLCART_SERVER_CORS_ALLOWED_ORIGINS") {
            self.server.cors_allowed_origins = split_list(&value);
        }

        if let Some(value) = read_env("CALLCART_WEBHOOK_SECRET") {
            self.webhook.secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("CALLCART_WEBHOOK_SIGNATURE_HEADER") {
            self.webhook.signature_header = value;
        }
        if let Some(value) = read_env("CALLCART_WEBHOOK_TIMESTAMP_HEADER") {
            self.webhook.timestamp_header = value;
        }
        if let Some(value) = read_env("CALLCART_WEBHOOK_TOLERANCE_SECS") {
            self.webhook.tolerance_secs = parse_u64("CALLCART_WEBHOOK_TOLERANCE_SECS", &value)?;
        }
        if let Some(value) = read_env("CALLCART_WEBHOOK_DEFAULT_MERCHANT_ID") {
            self.webhook.default_merchant_id = value;
        }

        if let Some(value) = read_env("CALLCART_RECOMMENDATION_API_KEY") {
            self.recommendation.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CALLCART_RECOMMENDATION_MAX_RESULTS") {
            self.recommendation.max_results =
                parse_usize("CALLCART_RECOMMENDATION_MAX_RESULTS", &value)?;
        }

        let log_level =
            read_env("CALLCART_LOGGING_LEVEL").or_else(|| read_env("CALLCART_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CALLCART_LOGGING_FORMAT").or_else(|| read_env("CALLCART_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = Some(llm_model);
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(environment) = overrides.environment {
            self.server.environment = environment;
        }
        if let Some(secret) = overrides.webhook_secret {
            self.webhook.secret = optional_secret(secret);
        }
        if let Some(api_key) = overrides.recommendation_api_key {
            self.recommendation.api_key = optional_secret(api_key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_webhook(&self.webhook)?;
        validate_recommendation(&self.recommendation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Effective configuration with secrets replaced by a presence marker.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "database": {
                "url": self.database.url,
                "max_connections": self.database.max_connections,
                "timeout_secs": self.database.timeout_secs,
            },
            "llm": {
                "provider": self.llm.provider.as_str(),
                "api_key": redact(self.llm.api_key.as_ref()),
                "base_url": self.llm.base_url(),
                "model": self.llm.model(),
                "timeout_secs": self.llm.timeout_secs,
                "temperature": self.llm.temperature,
                "max_output_tokens": self.llm.max_output_tokens,
            },
            "server": {
                "bind_address": self.server.bind_address,
                "port": self.server.port,
                "graceful_shutdown_secs": self.server.graceful_shutdown_secs,
                "environment": self.server.environment.as_str(),
                "cors_allowed_origins": self.server.cors_allowed_origins,
            },
            "webhook": {
                "secret": redact(self.webhook.secret.as_ref()),
                "signature_header": self.webhook.signature_header,
                "timestamp_header": self.webhook.timestamp_header,
                "tolerance_secs": self.webhook.tolerance_secs,
                "default_merchant_id": self.webhook.default_merchant_id,
            },
            "recommendation": {
                "api_key": redact(self.recommendation.api_key.as_ref()),
                "max_results": self.recommendation.max_results,
            },
            "logging": {
                "level": self.logging.level,
                "format": self.logging.format,
            },
        })
    }
}

fn redact(secret: Option<&SecretString>) -> Option<&'static str> {
    secret.map(|_| "[REDACTED]")
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("callcart.toml"), PathBuf::from("config/callcart.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_output_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_output_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.provider == LlmProvider::Gemini {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for the gemini provider (set CALLCART_LLM_API_KEY)"
                    .to_string(),
            ));
        }
    }

    let base_url = llm.base_url();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if server.cors_allowed_origins.iter().any(|origin| origin.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "server.cors_allowed_origins must not contain empty entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_webhook(webhook: &WebhookConfig) -> Result<(), ConfigError> {
    for (key, value) in [
        ("webhook.signature_header", &webhook.signature_header),
        ("webhook.timestamp_header", &webhook.timestamp_header),
    ] {
        if header_name_is_invalid(value) {
            return Err(ConfigError::Validation(format!(
                "{key} must be a non-empty HTTP header name"
            )));
        }
    }

    if webhook.tolerance_secs == 0 {
        return Err(ConfigError::Validation(
            "webhook.tolerance_secs must be greater than zero".to_string(),
        ));
    }

    if webhook.default_merchant_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "webhook.default_merchant_id must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn header_name_is_invalid(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || !value.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_')
}

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    if !(1..=MAX_RESULTS).contains(&recommendation.max_results) {
        return Err(ConfigError::Validation(format!(
            "recommendation.max_results must be in range 1..={MAX_RESULTS}"
        )));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    webhook: Option<WebhookPatch>,
    recommendation: Option<RecommendationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    environment: Option<Environment>,
    cors_allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPatch {
    secret: Option<String>,
    signature_header: Option<String>,
    timestamp_header: Option<String>,
    tolerance_secs: Option<u64>,
    default_merchant_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    api_key: Option<String>,
    max_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
