//! Application configuration loaded from an optional RON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use postes_engine::{ClientSettings, EngineConfig};
use postes_logging::{postes_info, postes_warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "postes.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Directory holding `<establishment>.merges` files.
    pub store_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub hide_merged: bool,
    /// Upper bound on how long a command waits for the backend.
    pub wait_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            base_url: client.base_url,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            store_dir: None,
            log_file: None,
            hide_merged: false,
            wait_secs: 60,
        }
    }
}

impl AppConfig {
    /// Reads `explicit` if given (it must exist), otherwise `./postes.ron`
    /// when present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
            }
            None => Ok(Self::load_default(Path::new(DEFAULT_CONFIG_FILENAME))),
        }
    }

    fn load_default(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                postes_warn!("Failed to read config from {:?}: {}", path, err);
                return Self::default();
            }
        };
        match Self::parse(&text) {
            Ok(config) => {
                postes_info!("Loaded config from {:?}", path);
                config
            }
            Err(err) => {
                postes_warn!("Failed to parse config from {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn with_overrides(mut self, base_url: Option<String>, store_dir: Option<PathBuf>) -> Self {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if store_dir.is_some() {
            self.store_dir = store_dir;
        }
        self
    }

    pub fn resolved_store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("postes"))
                .unwrap_or_else(|| PathBuf::from("./postes-store"))
        })
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default_with_store(self.resolved_store_dir());
        config.client = ClientSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        };
        config
    }
}
