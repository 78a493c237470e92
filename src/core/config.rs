use crate::core::StreamError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

include!(concat!(env!("OUT_DIR"), "/config_embedded.rs"));

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub model: String,
    pub image_model: String,
    pub title_model: String,
    pub language: String,
    pub data_dir: String,
    pub max_image_prompt_chars: usize,
    pub screenshot_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("Invalid default config")
    }
}

impl Config {
    pub fn load() -> Result<Self, StreamError> {
        let config_path = Path::new("config.toml");
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| StreamError::Config(format!("Failed to read config file: {e}")))?;

            toml::from_str(&contents)
                .map_err(|e| StreamError::Config(format!("Failed to parse config file: {e}")))
        } else {
            Ok(Self::default())
        }
    }

    /// Path of the settings store inside the data directory.
    pub fn settings_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("settings.json")
    }

    /// Path of the thread store inside the data directory.
    pub fn threads_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("threads.json")
    }
}
