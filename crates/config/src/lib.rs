//! Configuration loading, validation, and management for Quill.
//!
//! Loads configuration from the first of `./quill.toml`, `./config.toml`, or
//! `~/.quill/config.toml`, then applies `.env` and environment variable
//! overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder in the system prompt replaced by the project's `AGENTS.md`.
pub const AGENTS_PLACEHOLDER: &str = "{{AGENTS}}";

const DEFAULT_SYSTEM_PROMPT: &str = r#"
You are a senior software engineer working inside the user's terminal, in their
current project directory. You write clear, correct, maintainable code and give
direct, practical answers.

Guidelines:
- Inspect before you change: read the relevant files and search the codebase
  before proposing or making edits.
- Prefer small, targeted edits (edit_file) over rewriting whole files.
- Follow the conventions already present in the project.
- Consider edge cases, error handling, and security.
- When a command or check can answer a question, run it instead of guessing.
- Summarize what you did and anything the user still needs to do.

Tools available to you: bash, read_file, write_file, edit_file, git, github_pr,
grep, glob, list_directory.

{{AGENTS}}
"#;

/// The root configuration structure.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// System prompt configuration
    #[serde(default)]
    pub system: SystemConfig,

    /// Generation service configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Orchestration loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Terminal display and input history
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// "gemini", "openai", "openai-compatible", or "mock"
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Endpoint override (required for "openai-compatible")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            name: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Optional ceiling on generation steps per utterance. Unset = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default = "default_flush_threshold_chars")]
    pub flush_threshold_chars: usize,

    /// Defaults to `~/.config/quill/input_history`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_file: Option<PathBuf>,

    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_flush_interval_ms() -> u64 {
    100
}
fn default_flush_threshold_chars() -> usize {
    100
}
fn default_max_history() -> usize {
    1000
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval_ms(),
            flush_threshold_chars: default_flush_threshold_chars(),
            history_file: None,
            max_history: default_max_history(),
        }
    }
}

impl UiConfig {
    pub fn history_path(&self) -> PathBuf {
        self.history_file.clone().unwrap_or_else(|| {
            dirs_home()
                .join(".config")
                .join("quill")
                .join("input_history")
        })
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("system", &self.system)
            .field("model", &self.model)
            .field("agent", &self.agent)
            .field("ui", &self.ui)
            .finish()
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("name", &self.name)
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration for the current working directory.
    ///
    /// `explicit` (from `--config`) must exist; otherwise the first existing
    /// candidate file is used, or defaults if there is none. Then `.env` is
    /// loaded and these environment variables are applied:
    /// - `QUILL_API_KEY`, `GEMINI_API_KEY`, `OPENAI_API_KEY` (first set wins)
    /// - `QUILL_MODEL`, `GEMINI_MODEL`
    /// - `QUILL_PROVIDER`
    /// - `USE_MOCK_MODEL=true`
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    reason: "file does not exist".into(),
                });
            }
            Some(path) => Self::load_from(path)?,
            None => match Self::candidate_paths().into_iter().find(|p| p.exists()) {
                Some(path) => Self::load_from(&path)?,
                None => {
                    tracing::info!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            tracing::warn!(error = %e, "Failed to load .env file");
        }

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Files searched for configuration, in priority order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_default();
        vec![
            cwd.join("quill.toml"),
            cwd.join("config.toml"),
            Self::config_dir().join("config.toml"),
        ]
    }

    /// Get the user-level configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quill")
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = ["QUILL_API_KEY", "GEMINI_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|k| lookup(k).filter(|v| !v.is_empty()))
        {
            self.model.api_key = Some(key);
        }

        if let Some(provider) = lookup("QUILL_PROVIDER").filter(|v| !v.is_empty()) {
            self.model.provider = provider;
        }

        if let Some(model) = ["QUILL_MODEL", "GEMINI_MODEL"]
            .iter()
            .find_map(|k| lookup(k).filter(|v| !v.is_empty()))
        {
            self.model.name = model;
        }

        if lookup("USE_MOCK_MODEL").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            self.model.provider = "mock".into();
        }

        // A LiteLLM-style routing prefix is meaningless to the endpoint itself.
        if let Some(stripped) = self.model.name.strip_prefix("gemini/") {
            self.model.name = stripped.to_string();
        }
    }

    /// The system prompt with `{{AGENTS}}` replaced by `<dir>/AGENTS.md`.
    pub fn system_prompt(&self, dir: &Path) -> String {
        let agents = std::fs::read_to_string(dir.join("AGENTS.md"))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        self.system
            .prompt
            .replace(AGENTS_PLACEHOLDER, &agents)
            .trim()
            .to_string()
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.model.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model.name must not be empty".into(),
            ));
        }

        if self.agent.max_steps == Some(0) {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1 when set".into(),
            ));
        }

        if self.ui.flush_interval_ms == 0 || self.ui.flush_threshold_chars == 0 {
            return Err(ConfigError::ValidationError(
                "ui.flush_interval_ms and ui.flush_threshold_chars must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
