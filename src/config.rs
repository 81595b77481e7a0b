use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

pub const MAX_BATCH: usize = 25;
pub const DEFAULT_CHARACTER_API_URL: &str = "https://hp-api.onrender.com/api/characters";

/// Number of rows a single invocation may persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimit(usize);

impl BatchLimit {
    /// Values outside `1..=25` fall back to 25.
    pub fn clamped(value: i64) -> Self {
        if (1..=MAX_BATCH as i64).contains(&value) {
            Self(value as usize)
        } else {
            Self(MAX_BATCH)
        }
    }

    /// Rejects values outside `1..=25`; used for limits typed by the user.
    pub fn strict(value: i64) -> Result<Self> {
        if (1..=MAX_BATCH as i64).contains(&value) {
            Ok(Self(value as usize))
        } else {
            Err(AppError::InvalidLimit(value))
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for BatchLimit {
    fn default() -> Self {
        Self(MAX_BATCH)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_character_db")]
    pub character_db: String,

    #[serde(default = "default_video_db")]
    pub video_db: String,

    #[serde(default = "default_combined_db")]
    pub combined_db: String,

    #[serde(default = "default_batch_limit")]
    pub batch_limit: i64,

    pub youtube_api_key: Option<String>,

    #[serde(default = "default_character_api_url")]
    pub character_api_url: String,

    #[serde(default)]
    pub channels: Vec<String>,
}

fn data_file(name: &str) -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hp-tube");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join(name).to_string_lossy().to_string()
}

fn default_character_db() -> String {
    data_file("hp_data.db")
}

fn default_video_db() -> String {
    data_file("youtube.db")
}

fn default_combined_db() -> String {
    data_file("final.db")
}

fn default_batch_limit() -> i64 {
    MAX_BATCH as i64
}

fn default_character_api_url() -> String {
    DEFAULT_CHARACTER_API_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            character_db: default_character_db(),
            video_db: default_video_db(),
            combined_db: default_combined_db(),
            batch_limit: default_batch_limit(),
            youtube_api_key: None,
            character_api_url: default_character_api_url(),
            channels: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Reads the file at `path`, writing a default one first if it is missing.
    /// `YOUTUBE_API_KEY` in the environment wins over the file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save_to(path)?;
            config
        };

        if let Ok(key) = std::env::var("YOUTUBE_API_KEY") {
            if !key.trim().is_empty() {
                config.youtube_api_key = Some(key);
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hp-tube")
            .join("config.toml")
    }

    pub fn batch_limit(&self) -> BatchLimit {
        BatchLimit::clamped(self.batch_limit)
    }

    pub fn require_youtube_key(&self) -> Result<&str> {
        self.youtube_api_key.as_deref().ok_or_else(|| {
            AppError::Config(
                "set YOUTUBE_API_KEY or youtube_api_key in the config file".to_string(),
            )
        })
    }
}
