//! Configuration for Goalpost.

use crate::error::{GoalpostError, Result};
use crate::logging;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "goalpost.toml";
const OLLAMA_URL_ENV: &str = "GOALPOST_OLLAMA_URL";

/// Goalpost configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the goals database.
    pub data_dir: PathBuf,
    /// File name of the goals database inside `data_dir`.
    pub database_file: String,
    /// Seed the three sample goals into an empty store.
    pub seed_samples: bool,
    pub logging: LoggingSettings,
    pub ollama: OllamaSettings,
    pub conversation: ConversationSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("goalpost");

        Self {
            data_dir,
            database_file: "goals.db".to_string(),
            seed_samples: true,
            logging: LoggingSettings::default(),
            ollama: OllamaSettings::default(),
            conversation: ConversationSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration with fallback chain.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_without_env(config_path)?;
        config.apply_env();
        Ok(config)
    }

    fn load_without_env(config_path: Option<&Path>) -> Result<Self> {
        // Explicit path must load or the caller hears about it
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        // Primary location: ~/.config/goalpost/goalpost.toml
        if let Some(config_dir) = dirs::config_dir() {
            let primary = config_dir.join("goalpost").join(CONFIG_FILE_NAME);
            if primary.exists() {
                match Self::load_from_file(&primary) {
                    Ok(config) => return Ok(config),
                    Err(e) => logging::log_error(
                        None,
                        &format!("Failed to load config from {}: {}", primary.display(), e),
                    ),
                }
            }
        }

        // Fallback: ./goalpost.toml
        let fallback = PathBuf::from(CONFIG_FILE_NAME);
        if fallback.exists() {
            match Self::load_from_file(&fallback) {
                Ok(config) => return Ok(config),
                Err(e) => logging::log_error(
                    None,
                    &format!("Failed to load config from {}: {}", fallback.display(), e),
                ),
            }
        }

        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        Self::from_toml_str(&content).map_err(|e| {
            GoalpostError::Config(format!("{}: {}", path.as_ref().display(), e))
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| GoalpostError::Config(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(OLLAMA_URL_ENV) {
            if !url.trim().is_empty() {
                self.ollama.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
    }

    /// Full path of the goals database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

/// Log file settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: PathBuf,
    /// Daily log files older than this are removed at startup.
    pub retention_days: i64,
    /// Echo every log line to stderr.
    pub echo: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        let dir = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("goalpost")
            .join("logs");

        Self {
            dir,
            retention_days: 7,
            echo: false,
        }
    }
}

/// Local model runtime settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    /// Model that writes persona responses.
    pub primary_model: String,
    /// Model that proposes new goals after a response.
    pub suggestion_model: String,
    /// Model that describes attached images.
    pub vision_model: String,
    /// Model that drafts strategic notes before the persona answers.
    pub thinking_model: String,
    /// Model that writes follow-up rounds.
    pub follow_up_model: String,
    /// Model that decides whether an idle thread gets another follow-up.
    pub decision_model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
    pub num_predict: u32,
    pub request_timeout_secs: u64,
    /// Ask the suggestion model for goal proposals after each turn.
    pub suggest_goals: bool,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            primary_model: "gemma3n:e4b".to_string(),
            suggestion_model: "gemma3:1b".to_string(),
            vision_model: "gemma3n:e4b".to_string(),
            thinking_model: "qwen3:0.6b".to_string(),
            follow_up_model: "gemma3:1b".to_string(),
            decision_model: "qwen3:1.7b".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
            num_predict: 2500,
            request_timeout_secs: 300,
            suggest_goals: true,
        }
    }
}

/// Per-turn extras around the persona response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConversationSettings {
    /// Run the thinking pass and fold its notes into the prompt.
    pub thinking: bool,
    /// Recent exchanges repeated in each prompt.
    pub memory_turns: usize,
    /// Entries kept in the thread before the oldest are dropped.
    pub thread_capacity: usize,
    /// Roll recent turns into permanent memory every this many turns. 0 disables it.
    pub rollup_every: usize,
    /// Follow-up rounds after each response, at most 4. 0 disables them.
    pub follow_up_rounds: u32,
    /// Keep an idle thread going with model-approved follow-ups.
    pub auto_continue: bool,
    pub auto_continue_interval_secs: u64,
    /// Idle time after which the thread is left alone.
    pub auto_continue_max_idle_secs: u64,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            thinking: true,
            memory_turns: 3,
            thread_capacity: 50,
            rollup_every: 5,
            follow_up_rounds: 0,
            auto_continue: false,
            auto_continue_interval_secs: 60,
            auto_continue_max_idle_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = AppConfig::from_toml_str("seed_samples = false\n").unwrap();
        assert!(!config.seed_samples);
        assert_eq!(config.database_file, "goals.db");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.logging.retention_days, 7);
    }

    #[test]
    fn test_nested_sections_override() {
        let toml = r#"
            data_dir = "/var/lib/goalpost"

            [ollama]
            primary_model = "llama3.2:3b"
            temperature = 0.2
            suggest_goals = false
        "#;
        let config = AppConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/goalpost/goals.db"));
        assert_eq!(config.ollama.primary_model, "llama3.2:3b");
        assert!((config.ollama.temperature - 0.2).abs() < f32::EPSILON);
        assert!(!config.ollama.suggest_goals);
        // untouched keys keep their defaults
        assert_eq!(config.ollama.top_k, 40);
        assert_eq!(config.ollama.thinking_model, "qwen3:0.6b");
    }

    #[test]
    fn test_follow_ups_are_opt_in() {
        let config = AppConfig::default();
        assert_eq!(config.conversation.follow_up_rounds, 0);
        assert!(!config.conversation.auto_continue);
        assert!(config.conversation.thinking);

        let config = AppConfig::from_toml_str(
            "[conversation]\nfollow_up_rounds = 4\nauto_continue = true\nthinking = false\n",
        )
        .unwrap();
        assert_eq!(config.conversation.follow_up_rounds, 4);
        assert!(config.conversation.auto_continue);
        assert!(!config.conversation.thinking);
        assert_eq!(config.conversation.auto_continue_interval_secs, 60);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml_str("data_dir = [").unwrap_err();
        assert!(matches!(err, GoalpostError::Config(_)));
    }

    #[test]
    fn test_explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "database_file = \"custom.db\"\n").unwrap();

        let config = AppConfig::load_without_env(Some(&path)).unwrap();
        assert_eq!(config.database_file, "custom.db");
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load_without_env(Some(&missing)).is_err());
    }
}
