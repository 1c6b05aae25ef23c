use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::pipeline::SearchMode;

/// User state kept between runs: the API key, recent URLs and UI preferences.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub api_key: Option<String>,
  #[serde(default)]
  pub history: Vec<String>,
  pub theme_name: Option<String>,
  pub max_results: Option<u32>,
  pub search_mode: Option<SearchMode>,
}

pub fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "ytreach")
}

fn default_path() -> Option<PathBuf> {
  project_dirs().map(|d| d.config_dir().join("config.toml"))
}

impl Config {
  /// Load from the platform config directory; a missing or unreadable file yields defaults.
  pub fn load() -> Self {
    default_path().map(|p| Self::load_from(&p)).unwrap_or_default()
  }

  pub fn load_from(path: &Path) -> Self {
    let Ok(content) = std::fs::read_to_string(path) else { return Self::default() };
    match toml::from_str(&content) {
      Ok(config) => config,
      Err(e) => {
        warn!(path = %path.display(), err = %e, "config: unreadable, using defaults");
        Self::default()
      }
    }
  }

  /// Best-effort save; failures are logged, never surfaced.
  pub fn save(&self) {
    let Some(path) = default_path() else { return };
    if let Err(e) = self.save_to(&path) {
      warn!(err = %e, "config: save failed");
    }
  }

  pub fn save_to(&self, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = toml::to_string(self).context("Failed to serialize config")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
  }

  pub fn api_key(&self) -> Option<&str> {
    self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
  }
}

/// API key precedence: explicit flag, then `YOUTUBE_API_KEY`, then the stored key.
pub fn resolve_api_key(flag: Option<&str>, config: &Config) -> Option<String> {
  let non_empty = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
  flag
    .and_then(non_empty)
    .or_else(|| std::env::var("YOUTUBE_API_KEY").ok().as_deref().and_then(non_empty))
    .or_else(|| config.api_key().map(str::to_string))
}
