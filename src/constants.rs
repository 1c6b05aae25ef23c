//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so there is no runtime file
//! I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

#[derive(Debug, Deserialize)]
pub struct Constants {
  // YouTube Data API
  pub api_base_url: String,
  pub watch_url_prefix: String,

  // Report shaping
  pub min_duration_secs: u64,
  pub default_max_results: u32,
  pub max_results_cap: u32,
  pub api_batch_size: usize,

  // Presentation / persistence
  pub history_limit: usize,
  pub toast_secs: u64,
  pub csv_file_prefix: String,
  pub log_file_name: String,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time and covered by a unit test.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

pub fn constants() -> &'static Constants {
  &CONSTANTS
}
