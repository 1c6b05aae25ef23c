//! Headless subcommands: print a report to stdout instead of opening the TUI.

use anyhow::{Context, Result, bail};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::config::{Config, resolve_api_key};
use crate::constants::constants;
use crate::export;
use crate::history::SearchHistory;
use crate::metrics::VideoRecord;
use crate::pipeline::{self, SearchMode};
use crate::sort::{SortDirection, SortKey, SortState};
use crate::youtube::YouTubeClient;

#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
  /// Video or channel URL (/watch?v=, youtu.be/, /channel/UC…, /@handle)
  #[arg(long, conflicts_with = "keyword", required_unless_present = "keyword")]
  pub url: Option<String>,

  /// Search keywords instead of a URL
  #[arg(long)]
  pub keyword: Option<String>,

  /// Number of videos to request (1-50)
  #[arg(short = 'n', long)]
  pub count: Option<u32>,

  /// YouTube Data API key (overrides YOUTUBE_API_KEY and the stored key)
  #[arg(long)]
  pub api_key: Option<String>,

  /// Sort column
  #[arg(long, value_enum)]
  pub sort: Option<SortKey>,

  /// Sort ascending instead of descending
  #[arg(long, requires = "sort")]
  pub ascending: bool,

  /// Also write the report as CSV to this path
  #[arg(long)]
  pub csv: Option<PathBuf>,

  /// Print JSON instead of a table
  #[arg(long)]
  pub json: bool,
}

impl FetchArgs {
  fn query(&self) -> Result<(SearchMode, &str)> {
    match (&self.url, &self.keyword) {
      (Some(url), None) => Ok((SearchMode::Url, url)),
      (None, Some(keyword)) => Ok((SearchMode::Keyword, keyword)),
      _ => bail!("Pass exactly one of --url or --keyword"),
    }
  }

  fn sort_state(&self) -> Option<SortState> {
    let direction = if self.ascending { SortDirection::Ascending } else { SortDirection::Descending };
    self.sort.map(|key| SortState::new(key, direction))
  }
}

/// Run the pipeline for `args`. URL queries are pushed onto `config.history`
/// once the input has been recognised, before any network call.
pub async fn fetch_records(args: &FetchArgs, config: &mut Config, base_url: &str) -> Result<Vec<VideoRecord>> {
  let (mode, input) = args.query()?;
  let target = pipeline::resolve_target(mode, input)?;
  let api_key = resolve_api_key(args.api_key.as_deref(), config)
    .context("No API key: pass --api-key, set YOUTUBE_API_KEY, or run `ytreach set-key <KEY>`")?;

  if mode == SearchMode::Url {
    let mut history = SearchHistory::from_entries(std::mem::take(&mut config.history));
    history.push(input);
    config.history = history.entries().to_vec();
  }

  let max_results =
    pipeline::clamp_max_results(args.count.or(config.max_results).unwrap_or(constants().default_max_results));
  let client = YouTubeClient::with_base_url(api_key, base_url)?;
  let mut records = pipeline::run(&client, &target, max_results).await?;

  if let Some(sort) = args.sort_state() {
    sort.apply(&mut records);
  }
  Ok(records)
}

/// Plain-text table for terminals and pipes.
pub fn format_table(records: &[VideoRecord]) -> String {
  let title_w = records.iter().map(|r| r.title.chars().count()).max().unwrap_or(0).clamp(5, 60);
  let mut out = format!(
    "{:<title_w$}  {:<10}  {:>12}  {:>12}  {:>9}  {}\n",
    "Title", "Published", "Views", "Subscribers", "Diffusion", "URL"
  );
  for r in records {
    let title: String = if r.title.chars().count() > title_w {
      r.title.chars().take(title_w - 1).chain(std::iter::once('…')).collect()
    } else {
      r.title.clone()
    };
    let published = r.published().map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_else(|| r.published_at.clone());
    out.push_str(&format!(
      "{:<title_w$}  {:<10}  {:>12}  {:>12}  {:>9.2}  {}\n",
      title,
      published,
      r.view_count,
      r.subscriber_count,
      r.diffusion_rate(),
      r.video_url
    ));
  }
  out
}

pub async fn run_fetch(args: FetchArgs) -> Result<()> {
  let mut config = Config::load();
  let result = fetch_records(&args, &mut config, &constants().api_base_url).await;
  // History is updated even when the fetch itself fails.
  config.save();
  let records = result?;
  info!(count = records.len(), "cli: report ready");

  if let Some(path) = &args.csv {
    let path = export::write_csv(path, &records)?;
    eprintln!("Wrote {}", path.display());
  }

  if args.json {
    println!("{}", serde_json::to_string_pretty(&records).context("Failed to serialize report")?);
  } else if records.is_empty() {
    eprintln!("No results (videos shorter than 2 minutes are skipped).");
  } else {
    print!("{}", format_table(&records));
  }
  Ok(())
}

pub fn run_history(clear: bool) -> Result<()> {
  let mut config = Config::load();
  if clear {
    config.history.clear();
    config.save();
    eprintln!("History cleared.");
    return Ok(());
  }
  for entry in SearchHistory::from_entries(config.history).entries() {
    println!("{entry}");
  }
  Ok(())
}

pub fn run_set_key(key: &str) -> Result<()> {
  let key = key.trim();
  if key.is_empty() {
    bail!("API key must not be empty");
  }
  let path = crate::config::project_dirs()
    .map(|d| d.config_dir().join("config.toml"))
    .context("Could not determine the config directory")?;
  let mut config = Config::load_from(&path);
  config.api_key = Some(key.to_string());
  config.save_to(&path)?;
  info!("config: api key updated");
  eprintln!("API key saved to {}", path.display());
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::metrics::tests::{record, video_json};
  use serde_json::json;
  use wiremock::matchers::{path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn url_args(url: &str) -> FetchArgs {
    FetchArgs { url: Some(url.to_string()), api_key: Some("flag-key".to_string()), ..FetchArgs::default() }
  }

  async fn mount_video(server: &MockServer) {
    Mock::given(path("/videos"))
      .and(query_param("id", "dQw4w9WgXcQ"))
      .and(query_param("key", "flag-key"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({ "items": [video_json("dQw4w9WgXcQ", "UC1", "PT3M33S", "900")] })),
      )
      .mount(server)
      .await;
    Mock::given(path("/channels"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!({ "items": [{ "id": "UC1", "statistics": { "subscriberCount": "300" } }] })),
      )
      .mount(server)
      .await;
  }

  #[tokio::test]
  async fn video_url_fetch_records_history() {
    let server = MockServer::start().await;
    mount_video(&server).await;

    let mut config = Config::default();
    let records =
      fetch_records(&url_args("https://youtu.be/dQw4w9WgXcQ"), &mut config, &server.uri()).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].diffusion_rate(), 3.0);
    assert_eq!(config.history, vec!["https://youtu.be/dQw4w9WgXcQ".to_string()]);
  }

  #[tokio::test]
  async fn invalid_url_is_rejected_before_history() {
    let server = MockServer::start().await;
    let mut config = Config::default();
    let err = fetch_records(&url_args("https://example.com/"), &mut config, &server.uri()).await.unwrap_err();
    assert!(err.to_string().contains("Invalid input"));
    assert!(config.history.is_empty());
  }

  #[test]
  fn query_requires_one_source() {
    assert!(FetchArgs::default().query().is_err());
    let args = FetchArgs { keyword: Some("rust".to_string()), ..FetchArgs::default() };
    assert_eq!(args.query().ok(), Some((SearchMode::Keyword, "rust")));
  }

  #[test]
  fn sort_defaults_to_descending() {
    let args = FetchArgs { sort: Some(SortKey::Views), ..FetchArgs::default() };
    assert_eq!(args.sort_state(), Some(SortState::new(SortKey::Views, SortDirection::Descending)));
    let args = FetchArgs { ascending: true, ..args };
    assert_eq!(args.sort_state().map(|s| s.direction), Some(SortDirection::Ascending));
  }

  #[test]
  fn table_has_header_and_rows() {
    let table = format_table(&[record("abc", "Hello", 1200, 400, "2024-03-01T12:00:00Z")]);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Title"));
    assert!(lines[1].contains("2024-03-01"));
    assert!(lines[1].contains("3.00"));
    assert!(lines[1].ends_with("https://www.youtube.com/watch?v=abc"));
  }
}
