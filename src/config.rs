use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::agent::types::DEFAULT_MAX_ITERATIONS;
use crate::llm::{http::HttpCompletion, ollama, openai, traits::LLM};
use crate::memory::DEFAULT_HISTORY_CAPACITY;
use crate::tools::DuplicatePolicy;


#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
    #[error("Failed to read configuration: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub on_duplicate_tool: DuplicatePolicy,
}

fn default_name() -> String {
    "assistant".into()
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            history_capacity: default_history_capacity(),
            max_iterations: default_max_iterations(),
            request_timeout_secs: None,
            system_prompt: None,
            on_duplicate_tool: DuplicatePolicy::default(),
        }
    }
}

impl AgentSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Which completion service to talk to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Ollama {
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_ollama_port")]
        port: u16,
    },
    #[serde(rename = "openai")]
    OpenAI {
        model: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<u32>,
    },
    Http {
        model: String,
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

fn default_ollama_model() -> String {
    ollama::DEFAULT_MODEL.into()
}

fn default_ollama_host() -> String {
    ollama::DEFAULT_HOST.into()
}

fn default_ollama_port() -> u16 {
    ollama::DEFAULT_PORT
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Ollama {
            model: default_ollama_model(),
            host: default_ollama_host(),
            port: default_ollama_port(),
        }
    }
}

impl BackendConfig {
    pub fn model(&self) -> &str {
        match self {
            BackendConfig::Ollama { model, .. }
            | BackendConfig::OpenAI { model, .. }
            | BackendConfig::Http { model, .. } => model,
        }
    }

    fn set_model(&mut self, value: String) {
        match self {
            BackendConfig::Ollama { model, .. }
            | BackendConfig::OpenAI { model, .. }
            | BackendConfig::Http { model, .. } => *model = value,
        }
    }

    pub fn build(&self) -> Result<Arc<dyn LLM>, ConfigError> {
        let llm: Arc<dyn LLM> = match self {
            BackendConfig::Ollama { model, host, port } => {
                Arc::new(ollama::Ollama::connect(host.clone(), *port).with_model(model.clone()))
            }
            BackendConfig::OpenAI { model, base_url, api_key, temperature, max_tokens } => {
                let mut config = openai::OpenAIConfig::new();
                if let Some(url) = base_url {
                    config = config.with_api_base(url.clone());
                }
                if let Some(key) = api_key {
                    config = config.with_api_key(key.clone());
                }
                let options = openai::CompletionOptions {
                    model: model.clone(),
                    max_tokens: *max_tokens,
                    temperature: *temperature,
                };
                Arc::new(openai::OpenAI::with_config(config, model.clone()).with_options(options))
            }
            BackendConfig::Http { model, endpoint, api_key } => {
                let mut llm = HttpCompletion::new(endpoint.clone(), model.clone())
                    .map_err(|e| ConfigError::InvalidConfig(format!("http client: {e}")))?;
                if let Some(key) = api_key {
                    llm = llm.with_api_key(key.clone());
                }
                Arc::new(llm)
            }
        };
        Ok(llm)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Load `path` if it exists (defaults otherwise), then apply `MINI_CHAT_*` overrides.
    pub fn from_env_or_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut cfg = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        cfg.apply_overrides(|key| env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from a key lookup (the process environment in practice).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(model) = lookup("MINI_CHAT_MODEL") {
            self.backend.set_model(model);
        }
        if let Some(key) = lookup("MINI_CHAT_API_KEY") {
            match &mut self.backend {
                BackendConfig::OpenAI { api_key, .. } | BackendConfig::Http { api_key, .. } => {
                    *api_key = Some(key);
                }
                BackendConfig::Ollama { .. } => {}
            }
        }
        if let Some(url) = lookup("MINI_CHAT_BASE_URL") {
            match &mut self.backend {
                BackendConfig::Ollama { host, .. } => *host = url,
                BackendConfig::OpenAI { base_url, .. } => *base_url = Some(url),
                BackendConfig::Http { endpoint, .. } => *endpoint = url,
            }
        }
        if let Some(raw) = lookup("MINI_CHAT_HISTORY") {
            self.agent.history_capacity = raw
                .parse()
                .map_err(|_| ConfigError::InvalidConfig(format!("MINI_CHAT_HISTORY is not a number: {raw}")))?;
        }
        if let Some(raw) = lookup("MINI_CHAT_TIMEOUT_SECS") {
            let secs = raw
                .parse()
                .map_err(|_| ConfigError::InvalidConfig(format!("MINI_CHAT_TIMEOUT_SECS is not a number: {raw}")))?;
            self.agent.request_timeout_secs = Some(secs);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.name.trim().is_empty() {
            return Err(ConfigError::MissingConfig("agent.name".into()));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::InvalidConfig("agent.max_iterations must be at least 1".into()));
        }
        if self.agent.request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidConfig("agent.request_timeout_secs must be positive".into()));
        }
        if self.backend.model().trim().is_empty() {
            return Err(ConfigError::MissingConfig("backend.model".into()));
        }
        match &self.backend {
            BackendConfig::Ollama { host, .. } if host.trim().is_empty() => {
                Err(ConfigError::MissingConfig("backend.host".into()))
            }
            BackendConfig::OpenAI { base_url: Some(url), .. } if url.trim().is_empty() => {
                Err(ConfigError::InvalidConfig("backend.base_url is empty".into()))
            }
            BackendConfig::Http { endpoint, .. } if endpoint.trim().is_empty() => {
                Err(ConfigError::MissingConfig("backend.endpoint".into()))
            }
            _ => Ok(()),
        }
    }
}
