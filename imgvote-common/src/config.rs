//! Survey configuration loading and path resolution

use crate::types::{ModelName, VotingMode};
use crate::{Error, Result};
use chrono::Duration;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "IMGVOTE_CONFIG";

/// Survey-wide settings, fixed for the lifetime of the process
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurveyConfig {
    /// Item representation this deployment votes on
    pub mode: VotingMode,

    /// Participating models; prompt-mode items carry one image per entry
    pub models: Vec<ModelName>,

    /// Completed sessions wanted per chunk before assignment turns uniform
    pub completion_goal: i64,

    /// Inactivity after which an unfinished active session counts as abandoned
    pub abandon_after_hours: i64,

    /// Allow sessions over the whole catalog when no chunks have been built
    pub allow_unpartitioned: bool,

    /// Shared secret for the admin summary; `None` makes it fail closed
    pub admin_secret: Option<String>,

    /// CORS origins; empty means no CORS layer
    pub allowed_origins: Vec<String>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            mode: VotingMode::default(),
            models: ModelName::ALL.to_vec(),
            completion_goal: 10,
            abandon_after_hours: 24,
            allow_unpartitioned: false,
            admin_secret: None,
            allowed_origins: Vec::new(),
        }
    }
}

impl SurveyConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SurveyConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded survey config from {}", path.display());
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(Error::Config("models must not be empty".to_string()));
        }

        let unique: HashSet<_> = self.models.iter().collect();
        if unique.len() != self.models.len() {
            return Err(Error::Config("models contains duplicates".to_string()));
        }

        if self.mode == VotingMode::Pair && self.models.len() < 2 {
            return Err(Error::Config(
                "pair mode needs at least two models".to_string(),
            ));
        }

        if self.completion_goal < 1 {
            return Err(Error::Config(format!(
                "completion_goal must be at least 1, got {}",
                self.completion_goal
            )));
        }

        if self.abandon_after_hours < 1 {
            return Err(Error::Config(format!(
                "abandon_after_hours must be at least 1, got {}",
                self.abandon_after_hours
            )));
        }

        Ok(())
    }

    pub fn abandon_after(&self) -> Duration {
        Duration::hours(self.abandon_after_hours)
    }

    /// Images a prompt-mode item must resolve to
    pub fn expected_image_count(&self) -> usize {
        match self.mode {
            VotingMode::Pair => 2,
            VotingMode::Prompt => self.models.len(),
        }
    }

    pub fn is_participating(&self, model: ModelName) -> bool {
        self.models.contains(&model)
    }
}

/// Config file resolution in priority order:
/// 1. Command-line argument
/// 2. `IMGVOTE_CONFIG` environment variable
/// 3. `<user config dir>/imgvote/config.toml`, if it exists
///
/// Returns `None` when nothing applies; callers then use defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("imgvote").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load the resolved config file, or defaults when none is found
pub fn load_survey_config(cli_arg: Option<&Path>) -> Result<SurveyConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => SurveyConfig::load(&path),
        None => {
            info!("No config file found, using defaults");
            Ok(SurveyConfig::default())
        }
    }
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("imgvote").join("imgvote.db"))
        .unwrap_or_else(|| PathBuf::from("./imgvote_data/imgvote.db"))
}
