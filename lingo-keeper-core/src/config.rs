//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/lingo-keeper/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/lingo-keeper/` (~/.config/lingo-keeper/)
//! - Data: `$XDG_DATA_HOME/lingo-keeper/` (~/.local/share/lingo-keeper/)
//! - State/Logs: `$XDG_STATE_HOME/lingo-keeper/` (~/.local/state/lingo-keeper/)

use crate::error::{Error, Result};
use crate::types::JlptLevel;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "lingo-keeper";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Level classification thresholds
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Story reading behaviour
    #[serde(default)]
    pub story: StoryConfig,

    /// Recommendation settings
    #[serde(default)]
    pub recommendation: RecommendationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Story id to level overrides, applied on top of the catalog
    #[serde(default)]
    pub story_levels: BTreeMap<String, JlptLevel>,
}

/// What the classifier does with an attempt whose story has no level.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedStoryPolicy {
    /// Count the attempt toward the easiest level
    #[default]
    Easiest,
    /// Fail classification with [`Error::UnmappedStory`]
    Strict,
}

/// Thresholds for [`crate::analytics::LevelClassifier`]
#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Attempts needed at a level before it can count as attained
    #[serde(default = "default_min_attempts")]
    pub min_attempts: u32,

    /// Accuracy percentage needed at a level before it can count as attained
    #[serde(default = "default_mastery_accuracy")]
    pub mastery_accuracy: u8,

    /// Attempts at the current level for confidence to reach 100
    #[serde(default = "default_confidence_full_at")]
    pub confidence_full_at: u32,

    #[serde(default)]
    pub unmapped_story: UnmappedStoryPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_attempts: default_min_attempts(),
            mastery_accuracy: default_mastery_accuracy(),
            confidence_full_at: default_confidence_full_at(),
            unmapped_story: UnmappedStoryPolicy::default(),
        }
    }
}

fn default_min_attempts() -> u32 {
    3
}

fn default_mastery_accuracy() -> u8 {
    80
}

fn default_confidence_full_at() -> u32 {
    10
}

/// Story reading configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoryConfig {
    /// Chapter number authors give terminal chapters; mismatches are logged
    #[serde(default = "default_final_chapter_number")]
    pub final_chapter_number: u32,

    /// Step count behind the progress bar approximation
    #[serde(default = "default_assumed_total_steps")]
    pub assumed_total_steps: u32,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            final_chapter_number: default_final_chapter_number(),
            assumed_total_steps: default_assumed_total_steps(),
        }
    }
}

fn default_final_chapter_number() -> u32 {
    5
}

fn default_assumed_total_steps() -> u32 {
    5
}

/// Recommendation configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RecommendationConfig {
    /// Fixed RNG seed; entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,

    /// Size of the "recommended for you" list
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_suggestions: default_max_suggestions(),
        }
    }
}

fn default_max_suggestions() -> usize {
    3
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.classifier.min_attempts == 0 {
            return Err(Error::Config(
                "classifier.min_attempts must be at least 1".to_string(),
            ));
        }
        if self.classifier.mastery_accuracy > 100 {
            return Err(Error::Config(
                "classifier.mastery_accuracy must be between 0 and 100".to_string(),
            ));
        }
        if self.classifier.confidence_full_at == 0 {
            return Err(Error::Config(
                "classifier.confidence_full_at must be at least 1".to_string(),
            ));
        }
        if self.story.assumed_total_steps == 0 {
            return Err(Error::Config(
                "story.assumed_total_steps must be at least 1".to_string(),
            ));
        }
        if self.recommendation.max_suggestions == 0 {
            return Err(Error::Config(
                "recommendation.max_suggestions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/lingo-keeper/config.toml` (~/.config/lingo-keeper/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join(APP_DIR).join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/lingo-keeper/` (~/.local/share/lingo-keeper/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join(APP_DIR)
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/lingo-keeper/` (~/.local/state/lingo-keeper/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/lingo-keeper/data.db` (~/.local/share/lingo-keeper/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/lingo-keeper/lingo-keeper.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("lingo-keeper.log")
    }
}
