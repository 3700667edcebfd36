//! Application configuration file
//!
//! Read once at startup from the platform config directory:
//! - macOS: ~/Library/Application Support/issglobe/config.json
//! - Linux: ~/.config/issglobe/config.json
//! - Windows: %APPDATA%\issglobe\config\config.json
//!
//! Every field is optional; anything left out keeps its default.

use anyhow::Context;
use bevy::log::{info, warn};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::iss::IssConfig;
use crate::orientation::OrientationConfig;
use crate::visualization::GlobeConfig;

pub const ENDPOINT_ENV: &str = "ISSGLOBE_ENDPOINT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub iss: IssConfig,
    pub orientation: OrientationConfig,
    pub globe: GlobeConfig,
}

impl AppConfig {
    pub fn path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "issglobe").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load the config file, falling back to defaults when it is missing or broken.
    pub fn load() -> Self {
        let mut config = match Self::path() {
            Some(path) if path.exists() => match Self::load_from(&path) {
                Ok(config) => {
                    info!(path = %path.display(), "[INIT] loaded config");
                    config
                }
                Err(e) => {
                    warn!("Ignoring config file: {e:#}");
                    Self::default()
                }
            },
            _ => Self::default(),
        };
        config.apply_endpoint_override(std::env::var(ENDPOINT_ENV).ok());
        config
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn apply_endpoint_override(&mut self, endpoint: Option<String>) {
        if let Some(endpoint) = endpoint.map(|e| e.trim().to_string())
            && !endpoint.is_empty()
        {
            info!(%endpoint, "endpoint overridden from {ENDPOINT_ENV}");
            self.iss.endpoint = endpoint;
        }
    }
}
