//! deskmate configuration.
//!
//! Loaded from ~/.config/deskmate/config.toml, with `DESKMATE_*` environment
//! variables taking precedence over the file.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{DeskmateError, DeskmateResult};

static DEFAULT_DATA_DIR: &str = "~/.local/share/deskmate";
static DEFAULT_CALENDAR_ID: &str = "primary";

const CALENDAR_DB: &str = "calendar_events.db";
const HISTORY_DB: &str = "history.db";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeskmateConfig {
    /// Where the SQLite databases live
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Calendar provider name (e.g. "google"). Local-only when unset.
    #[serde(default)]
    pub calendar_provider: Option<String>,

    /// Remote calendar to sync with
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    #[serde(default)]
    pub youtube_api_key: Option<String>,

    #[serde(default)]
    pub news_api_key: Option<String>,
}

impl Default for DeskmateConfig {
    fn default() -> Self {
        DeskmateConfig {
            data_dir: default_data_dir(),
            calendar_provider: None,
            calendar_id: default_calendar_id(),
            youtube_api_key: None,
            news_api_key: None,
        }
    }
}

impl DeskmateConfig {
    pub fn config_path() -> DeskmateResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DeskmateError::Config("Could not determine config directory".into()))?
            .join("deskmate");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the user's config, writing a commented default file on first run.
    pub fn load() -> DeskmateResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from a specific file (missing file is fine) plus the environment.
    pub fn load_from(path: &Path) -> DeskmateResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("DESKMATE").try_parsing(true))
            .build()
            .map_err(|e| DeskmateError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| DeskmateError::Config(e.to_string()))
    }

    /// `data_dir` with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();
        PathBuf::from(full_path_str)
    }

    pub fn calendar_db_path(&self) -> PathBuf {
        self.data_path().join(CALENDAR_DB)
    }

    pub fn history_db_path(&self) -> PathBuf {
        self.data_path().join(HISTORY_DB)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> DeskmateResult<()> {
        let contents = format!(
            "\
# deskmate configuration

# Where the local databases live:
# data_dir = \"{}\"

# Remote calendar provider (leave unset to stay local-only):
# calendar_provider = \"google\"
# calendar_id = \"{}\"

# API keys for content search (placeholder results are used without them):
# youtube_api_key = \"\"
# news_api_key = \"\"
",
            DEFAULT_DATA_DIR, DEFAULT_CALENDAR_ID
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DeskmateError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| DeskmateError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
