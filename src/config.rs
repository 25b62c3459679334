//! Configuration system for the workforce
//!
//! One TOML file describes the LLM backend, selector tuning, the optional
//! planner and the worker roster. Secrets are never stored in the file; the
//! `[llm]` section names the environment variable that holds the API key.

use crate::error::WorkforceResult;
use crate::llm::provider::LlmProvider;
use crate::routing::agent_selector::SelectorConfig;
use crate::routing::workforce::Workforce;
use crate::worker::{LlmWorker, Worker};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Main workforce configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkforceConfig {
    pub llm: LlmSection,
    #[serde(default)]
    pub selector: SelectorConfig,
    /// Worker used to decompose tasks and synthesize results (optional)
    pub planner: Option<WorkerSection>,
    #[serde(default)]
    pub workers: Vec<WorkerSection>,
}

/// LLM backend shared by every configured worker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name; "openai" covers any OpenAI-compatible endpoint
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Environment variable containing API key
    pub api_key_env: Option<String>,
    /// Optional temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Optional max tokens
    pub max_tokens: Option<u32>,
    /// HTTP request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// A worker (or the planner) backed by the shared LLM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerSection {
    /// Worker name (must match [a-zA-Z0-9._-]+)
    pub name: String,
    pub description: String,
    /// System prompt for this worker
    pub directive: String,
    /// Per-worker model override
    pub model: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_base_url() -> String {
    crate::llm::providers::DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorkforceConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: WorkforceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "At least one [[workers]] entry is required".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for worker in &self.workers {
            validate_worker_name(&worker.name)?;
            if !names.insert(worker.name.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "Duplicate worker name '{}'",
                    worker.name
                )));
            }
        }

        if let Some(planner) = &self.planner {
            validate_worker_name(&planner.name)?;
            if names.contains(planner.name.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "Planner name '{}' must differ from every worker name",
                    planner.name
                )));
            }
        }

        self.selector
            .validate()
            .map_err(|e| ConfigError::InvalidConfig(format!("[selector] {e}")))?;

        if self.llm.provider != "openai" {
            return Err(ConfigError::InvalidConfig(format!(
                "Unsupported LLM provider '{}' (supported: openai)",
                self.llm.provider
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "llm.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature must be between 0.0 and 2.0, got {temperature}"
                )));
            }
        }

        Ok(())
    }

    /// Get LLM API key from environment variable, if one is configured
    pub fn get_llm_api_key(&self) -> Result<Option<String>, ConfigError> {
        match &self.llm.api_key_env {
            Some(name) => std::env::var(name)
                .map(Some)
                .map_err(|_| ConfigError::EnvVarNotFound(name.clone())),
            None => Ok(None),
        }
    }

    /// Build a workforce whose workers all talk to `provider`
    pub fn build_workforce(&self, provider: Arc<dyn LlmProvider>) -> WorkforceResult<Workforce> {
        let workers: Vec<Arc<dyn Worker>> = self
            .workers
            .iter()
            .map(|section| self.build_worker(section, provider.clone()))
            .collect();

        let planner = self
            .planner
            .as_ref()
            .map(|section| self.build_worker(section, provider.clone()));

        Workforce::with_selector_config(workers, planner, self.selector.clone())
    }

    fn build_worker(
        &self,
        section: &WorkerSection,
        provider: Arc<dyn LlmProvider>,
    ) -> Arc<dyn Worker> {
        let model = section.model.as_deref().unwrap_or(self.llm.model.as_str());
        let mut worker = LlmWorker::new(
            section.name.clone(),
            section.description.clone(),
            section.directive.clone(),
            provider,
            model,
        );

        if let Some(temperature) = self.llm.temperature {
            worker = worker.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.llm.max_tokens {
            worker = worker.with_max_tokens(max_tokens);
        }

        Arc::new(worker)
    }
}

/// Validate worker name format
fn validate_worker_name(name: &str) -> Result<(), ConfigError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if name.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidConfig(format!(
            "Worker name '{name}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[llm]
model = "gpt-4o-mini"

[[workers]]
name = "researcher"
description = "Finds information"
directive = "You research topics."
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = WorkforceConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.llm.api_key_env, None);
        assert_eq!(config.selector, SelectorConfig::default());
        assert!(config.planner.is_none());
        assert_eq!(config.workers.len(), 1);
    }

    #[test]
    fn test_worker_name_validation() {
        assert!(validate_worker_name("content_writer-2.0").is_ok());
        assert!(validate_worker_name("bad name").is_err());
        assert!(validate_worker_name("").is_err());
    }

    #[test]
    fn test_no_workers_rejected() {
        let result = WorkforceConfig::from_toml_str("[llm]\nmodel = \"m\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_planner_name_collision_rejected() {
        let toml_content = format!(
            "{MINIMAL}\n[planner]\nname = \"researcher\"\ndescription = \"Plans\"\ndirective = \"Plan.\"\n"
        );
        let result = WorkforceConfig::from_toml_str(&toml_content);
        assert!(matches!(result, Err(ConfigError::InvalidConfig(msg)) if msg.contains("Planner")));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = WorkforceConfig::from_toml_str(MINIMAL).unwrap();
        config.llm.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_configured_is_none() {
        let config = WorkforceConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.get_llm_api_key().unwrap(), None);
    }

    #[test]
    fn test_missing_api_key_env_var() {
        let mut config = WorkforceConfig::from_toml_str(MINIMAL).unwrap();
        config.llm.api_key_env = Some("WORKFORCE_TEST_KEY_THAT_IS_NEVER_SET".to_string());

        assert!(matches!(
            config.get_llm_api_key(),
            Err(ConfigError::EnvVarNotFound(name)) if name == "WORKFORCE_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }
}
