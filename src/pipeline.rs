//! The fetch pipeline: input → target → video IDs → report rows.
//!
//! Strictly linear. Each stage returns `Result` and the first failure ends
//! the run; there is no retry and no partial report.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::constants;
use crate::error::FetchError;
use crate::extract::{ChannelIdentifier, extract_channel_identifier, extract_video_id};
use crate::metrics::{VideoRecord, fetch_video_metrics};
use crate::youtube::YouTubeClient;

/// How the input box is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
  #[default]
  Url,
  Keyword,
}

impl SearchMode {
  pub fn label(self) -> &'static str {
    match self {
      SearchMode::Url => "URL",
      SearchMode::Keyword => "Keyword",
    }
  }

  pub fn toggle(self) -> Self {
    match self {
      SearchMode::Url => SearchMode::Keyword,
      SearchMode::Keyword => SearchMode::Url,
    }
  }
}

/// What a fetch is about, after classifying the user's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
  Video(String),
  Channel(ChannelIdentifier),
  Keyword(String),
}

pub fn resolve_target(mode: SearchMode, input: &str) -> Result<Target, FetchError> {
  let input = input.trim();
  match mode {
    SearchMode::Keyword => {
      if input.is_empty() {
        return Err(FetchError::invalid_input("enter a search keyword"));
      }
      Ok(Target::Keyword(input.to_string()))
    }
    SearchMode::Url => {
      if let Some(id) = extract_video_id(input) {
        return Ok(Target::Video(id));
      }
      if let Some(channel) = extract_channel_identifier(input) {
        return Ok(Target::Channel(channel));
      }
      Err(FetchError::invalid_input(format!("not a YouTube video or channel URL: '{}'", input)))
    }
  }
}

/// Clamp a requested result count to what a single API page can return.
pub fn clamp_max_results(n: u32) -> u32 {
  n.clamp(1, constants().max_results_cap)
}

pub async fn run(client: &YouTubeClient, target: &Target, max_results: u32) -> Result<Vec<VideoRecord>, FetchError> {
  let max_results = clamp_max_results(max_results);
  info!(?target, max_results, "fetch: started");

  let ids = match target {
    Target::Video(id) => vec![id.clone()],
    Target::Channel(channel) => client.list_latest_video_ids(channel, max_results).await?,
    Target::Keyword(keyword) => client.search_video_ids_by_keyword(keyword, max_results).await?,
  };
  if ids.is_empty() {
    info!("fetch: no candidate videos");
    return Ok(Vec::new());
  }

  let records = fetch_video_metrics(client, &ids).await?;
  info!(count = records.len(), "fetch: done");
  Ok(records)
}
