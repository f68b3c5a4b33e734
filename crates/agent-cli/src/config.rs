//! CLI Configuration
//!
//! Everything the terminal front end reads from the environment. The core
//! crates never touch environment variables; this is the only place that does.

use std::str::FromStr;
use std::time::Duration;

use agent_core::{AgentConfig, GenerationOptions};
use agent_runtime::{OllamaConfig, OpenAiConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

fn invalid(var: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.into(),
    }
}

/// Which model backend drives decisions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelBackend {
    Ollama,
    OpenAi,
}

impl ModelBackend {
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Ollama => "llama3.2",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

impl FromStr for ModelBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(invalid("AGENT_MODEL_BACKEND", format!("unknown backend '{other}'"))),
        }
    }
}

/// A remote HTTP tool provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteProvider {
    pub id: String,
    pub url: String,
}

/// Parse `id=url,id=url`
fn parse_providers(value: &str) -> Result<Vec<RemoteProvider>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, url) = entry
                .split_once('=')
                .ok_or_else(|| invalid("AGENT_PROVIDERS", format!("expected id=url, got '{entry}'")))?;
            let (id, url) = (id.trim(), url.trim());
            if id.is_empty() || url.is_empty() {
                return Err(invalid("AGENT_PROVIDERS", format!("expected id=url, got '{entry}'")));
            }
            Ok(RemoteProvider {
                id: id.into(),
                url: url.into(),
            })
        })
        .collect()
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(var, format!("expected a positive integer, got '{value}'"))),
    }
}

/// Terminal front end configuration
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub backend: ModelBackend,
    pub model: String,
    pub ollama: OllamaConfig,
    pub openai: OpenAiConfig,
    pub providers: Vec<RemoteProvider>,
    pub builtin_providers: bool,
    pub max_iterations: usize,
    pub tool_timeout: Duration,
    pub model_timeout: Duration,
    pub show_tool_results: bool,
}

impl CliConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = get("AGENT_MODEL_BACKEND")
            .map_or(Ok(ModelBackend::Ollama), |v| v.parse())?;
        let model = get("AGENT_MODEL").unwrap_or_else(|| backend.default_model().into());

        let mut ollama = OllamaConfig::default();
        if let Some(host) = get("OLLAMA_HOST") {
            ollama.host = host;
        }
        if let Some(port) = get("OLLAMA_PORT") {
            ollama.port = port
                .trim()
                .parse()
                .map_err(|_| invalid("OLLAMA_PORT", format!("expected a port number, got '{port}'")))?;
        }

        let mut openai = OpenAiConfig::default();
        if let Some(key) = get("OPENAI_API_KEY") {
            openai.api_key = key;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            openai.base_url = url;
        }

        let providers = get("AGENT_PROVIDERS").map_or(Ok(Vec::new()), |v| parse_providers(&v))?;
        let builtin_providers = get("AGENT_BUILTIN_PROVIDERS")
            .map_or(Ok(providers.is_empty()), |v| parse_bool("AGENT_BUILTIN_PROVIDERS", &v))?;

        let max_iterations = get("AGENT_MAX_ITERATIONS")
            .map_or(Ok(10), |v| parse_positive("AGENT_MAX_ITERATIONS", &v))?;
        let tool_timeout = get("AGENT_TOOL_TIMEOUT_SECS")
            .map_or(Ok(30), |v| parse_positive("AGENT_TOOL_TIMEOUT_SECS", &v))?;
        let model_timeout = get("AGENT_MODEL_TIMEOUT_SECS")
            .map_or(Ok(120), |v| parse_positive("AGENT_MODEL_TIMEOUT_SECS", &v))?;
        let show_tool_results = get("AGENT_SHOW_TOOLS")
            .map_or(Ok(false), |v| parse_bool("AGENT_SHOW_TOOLS", &v))?;

        Ok(Self {
            backend,
            model,
            ollama,
            openai,
            providers,
            builtin_providers,
            max_iterations: usize::try_from(max_iterations).unwrap_or(usize::MAX),
            tool_timeout: Duration::from_secs(tool_timeout),
            model_timeout: Duration::from_secs(model_timeout),
            show_tool_results,
        })
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_iterations: self.max_iterations,
            tool_timeout: self.tool_timeout,
            model_timeout: self.model_timeout,
            ..AgentConfig::default()
        }
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            ..GenerationOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<CliConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).into(), (*v).into())).collect();
        CliConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.backend, ModelBackend::Ollama);
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.ollama.port, 11434);
        assert!(config.providers.is_empty());
        assert!(config.builtin_providers);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
        assert_eq!(config.agent_config().model_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_openai_and_remote_providers() {
        let config = load(&[
            ("AGENT_MODEL_BACKEND", "OpenAI"),
            ("OPENAI_API_KEY", "sk-test"),
            ("AGENT_PROVIDERS", "db=http://127.0.0.1:8001, gdrive=http://127.0.0.1:8002"),
            ("AGENT_MAX_ITERATIONS", "4"),
        ])
        .unwrap();

        assert_eq!(config.backend, ModelBackend::OpenAi);
        assert_eq!(config.generation_options().model, "gpt-4o-mini");
        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(
            config.providers,
            vec![
                RemoteProvider { id: "db".into(), url: "http://127.0.0.1:8001".into() },
                RemoteProvider { id: "gdrive".into(), url: "http://127.0.0.1:8002".into() },
            ]
        );
        assert!(!config.builtin_providers);
        assert_eq!(config.agent_config().max_iterations, 4);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        for (var, value) in [
            ("AGENT_MODEL_BACKEND", "gemini"),
            ("AGENT_PROVIDERS", "db"),
            ("AGENT_PROVIDERS", "=http://x"),
            ("AGENT_MAX_ITERATIONS", "0"),
            ("AGENT_TOOL_TIMEOUT_SECS", "soon"),
            ("OLLAMA_PORT", "99999"),
            ("AGENT_BUILTIN_PROVIDERS", "maybe"),
        ] {
            let err = load(&[(var, value)]).err().unwrap();
            assert!(err.to_string().starts_with(var), "{var}={value}: {err}");
        }
    }
}
