use anyhow::Result;
use image::DynamicImage;
use ratatui::{
  layout::Rect,
  widgets::{ListState, TableState},
};
use reqwest::Client;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::constants;
use crate::display::DisplayMode;
use crate::error::FetchError;
use crate::export;
use crate::history::SearchHistory;
use crate::metrics::VideoRecord;
use crate::pipeline::{self, SearchMode};
use crate::sort::{SortKey, SortState};
use crate::theme::{THEMES, Theme, theme_index};
use crate::thumbnail;
use crate::youtube::YouTubeClient;

// --- Types ---

pub type FetchOutcome = Result<Vec<VideoRecord>, FetchError>;
pub type PreviewOutcome = Result<DynamicImage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
  Preview,
  History,
}

/// Which buffer the input box edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
  Query,
  ApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Info,
  Success,
  Error,
}

/// Transient message under the main pane; expires after `toast_secs`.
#[derive(Debug, Clone)]
pub struct Toast {
  pub kind: ToastKind,
  pub text: String,
  at: Instant,
}

/// Terminal graphics protocol state (Kitty) plus the resized preview cache.
#[derive(Default)]
pub struct GraphicsCache {
  pub thumb_area: Option<Rect>,
  pub last_sent: Option<(String, Rect)>,
  pub fitted: Option<(String, Rect, DynamicImage)>,
}

/// In-flight background work. Each slot holds at most one task.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) fetch_rx: Option<oneshot::Receiver<FetchOutcome>>,
  pub(crate) preview_rx: Option<oneshot::Receiver<(String, PreviewOutcome)>>,
  pub(crate) download_rx: Option<oneshot::Receiver<Result<PathBuf>>>,
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub api_key_input: String,
  pub api_key_cursor: usize,
  pub field: InputField,
  pub mode: AppMode,
  pub search_mode: SearchMode,
  pub max_results: u32,
  pub theme_index: usize,
  pub display_mode: DisplayMode,
  pub records: Vec<VideoRecord>,
  pub table_state: TableState,
  pub sort: Option<SortState>,
  pub history: SearchHistory,
  pub history_state: ListState,
  pub api_key: Option<String>,
  /// Label of the input that produced `records`.
  pub report_label: Option<String>,
  pub status_message: Option<String>,
  pub toast: Option<Toast>,
  /// Decoded thumbnail for the preview pane, keyed by video ID.
  pub preview: Option<(String, DynamicImage)>,
  pub gfx: GraphicsCache,
  pub should_quit: bool,
  http: Client,
  base_url: String,
  export_dir: PathBuf,
  /// Where settings are persisted; `None` keeps everything in memory.
  config_path: Option<PathBuf>,
  pub(crate) tasks: AsyncTasks,
}

impl App {
  pub fn new(display_mode: DisplayMode, config: Config, config_path: Option<PathBuf>) -> Self {
    let max_results = pipeline::clamp_max_results(config.max_results.unwrap_or(constants().default_max_results));
    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      api_key_input: String::new(),
      api_key_cursor: 0,
      field: InputField::Query,
      mode: AppMode::Input,
      search_mode: config.search_mode.unwrap_or_default(),
      max_results,
      theme_index: theme_index(config.theme_name.as_deref()),
      display_mode,
      records: Vec::new(),
      table_state: TableState::default(),
      sort: None,
      history: SearchHistory::from_entries(config.history.clone()),
      history_state: ListState::default(),
      api_key: config.api_key().map(str::to_string),
      report_label: None,
      status_message: None,
      toast: None,
      preview: None,
      gfx: GraphicsCache::default(),
      should_quit: false,
      http: Client::new(),
      base_url: constants().api_base_url.clone(),
      export_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
      config_path,
      tasks: AsyncTasks::default(),
    }
  }

  pub fn with_base_url(mut self, base_url: &str) -> Self {
    self.base_url = base_url.to_string();
    self
  }

  pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
    self.export_dir = dir;
    self
  }

  pub fn theme(&self) -> &'static Theme {
    // theme_index only ever comes from theme_index() or modular arithmetic.
    &THEMES[self.theme_index % THEMES.len()]
  }

  // --- Toasts ---

  pub fn set_toast(&mut self, kind: ToastKind, text: impl Into<String>) {
    self.toast = Some(Toast { kind, text: text.into(), at: Instant::now() });
  }

  pub fn set_error(&mut self, text: impl Into<String>) {
    self.set_toast(ToastKind::Error, text);
  }

  pub fn clear_toast(&mut self) {
    self.toast = None;
  }

  pub fn expire_toast(&mut self) {
    if let Some(t) = &self.toast
      && t.at.elapsed() >= Duration::from_secs(constants().toast_secs)
    {
      self.toast = None;
    }
  }

  // --- Persistence ---

  fn save_config(&self) {
    let Some(path) = &self.config_path else { return };
    let config = Config {
      api_key: self.api_key.clone(),
      history: self.history.entries().to_vec(),
      theme_name: Some(self.theme().name.to_string()),
      max_results: Some(self.max_results),
      search_mode: Some(self.search_mode),
    };
    if let Err(e) = config.save_to(path) {
      warn!(err = %e, "config: save failed");
    }
  }

  // --- Settings ---

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.save_config();
  }

  pub fn toggle_search_mode(&mut self) {
    self.search_mode = self.search_mode.toggle();
  }

  pub fn adjust_max_results(&mut self, delta: i64) {
    let next = (self.max_results as i64 + delta).clamp(1, constants().max_results_cap as i64);
    self.max_results = pipeline::clamp_max_results(next as u32);
  }

  pub fn begin_api_key_edit(&mut self) {
    self.field = InputField::ApiKey;
    self.mode = AppMode::Input;
    self.api_key_input = self.api_key.clone().unwrap_or_default();
    self.api_key_cursor = self.api_key_input.chars().count();
  }

  pub fn cancel_api_key_edit(&mut self) {
    self.field = InputField::Query;
    self.api_key_input.clear();
    self.api_key_cursor = 0;
  }

  pub fn commit_api_key(&mut self) {
    let key = self.api_key_input.trim().to_string();
    self.api_key = if key.is_empty() { None } else { Some(key) };
    self.cancel_api_key_edit();
    self.save_config();
    if self.api_key.is_some() {
      info!("config: api key updated");
      self.set_toast(ToastKind::Success, "API key saved.");
    } else {
      self.set_toast(ToastKind::Info, "API key cleared.");
    }
  }

  // --- Fetch ---

  pub fn is_fetching(&self) -> bool {
    self.tasks.fetch_rx.is_some()
  }

  /// Start the fetch pipeline for the current input. Returns `false` when
  /// nothing was started: a fetch is already pending, or the input or API key
  /// was rejected.
  pub fn trigger_fetch(&mut self) -> bool {
    if self.is_fetching() {
      self.set_toast(ToastKind::Info, "A fetch is already running.");
      return false;
    }
    let Some(api_key) = self.api_key.clone() else {
      self.set_error("Set a YouTube Data API key first (Ctrl+K).");
      return false;
    };
    let target = match pipeline::resolve_target(self.search_mode, &self.input) {
      Ok(target) => target,
      Err(e) => {
        self.set_error(e.to_string());
        return false;
      }
    };
    let client = match YouTubeClient::with_base_url(api_key, &self.base_url) {
      Ok(client) => client,
      Err(e) => {
        self.set_error(e.to_string());
        return false;
      }
    };

    let query = self.input.trim().to_string();
    if self.search_mode == SearchMode::Url {
      self.history.push(&query);
    }
    self.save_config();

    info!(mode = self.search_mode.label(), max_results = self.max_results, "fetch triggered");
    self.clear_toast();
    self.status_message = Some(format!("Fetching up to {} videos…", self.max_results));
    self.report_label = Some(query);

    let max_results = self.max_results;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(pipeline::run(&client, &target, max_results).await);
    });
    self.tasks.fetch_rx = Some(rx);
    true
  }

  /// Replace the report with a fresh fetch result, re-applying the active sort.
  pub fn apply_records(&mut self, mut records: Vec<VideoRecord>) {
    if let Some(sort) = self.sort {
      sort.apply(&mut records);
    }
    self.records = records;
    self.preview = None;
    self.table_state.select(if self.records.is_empty() { None } else { Some(0) });
  }

  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.tasks.fetch_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.status_message = None;
          match result {
            Ok(records) if records.is_empty() => {
              self.apply_records(records);
              self.set_toast(ToastKind::Info, "No results (videos shorter than 2 minutes are skipped).");
            }
            Ok(records) => {
              let count = records.len();
              self.apply_records(records);
              self.mode = AppMode::Results;
              self.set_toast(ToastKind::Success, format!("Loaded {} videos.", count));
            }
            Err(e) => {
              warn!(err = %e, "fetch failed");
              self.set_error(e.to_string());
            }
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.fetch_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.set_error("Fetch task failed.");
        }
      }
    }

    if let Some(mut rx) = self.tasks.preview_rx.take() {
      match rx.try_recv() {
        Ok((video_id, Ok(image))) => {
          self.status_message = None;
          self.gfx.fitted = None;
          self.gfx.last_sent = None;
          self.preview = Some((video_id, image));
        }
        Ok((_, Err(e))) => {
          self.status_message = None;
          self.set_error(format!("Thumbnail failed: {:#}", e));
          if self.mode == AppMode::Preview {
            self.mode = AppMode::Results;
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.preview_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
        }
      }
    }

    if let Some(mut rx) = self.tasks.download_rx.take() {
      match rx.try_recv() {
        Ok(Ok(path)) => self.set_toast(ToastKind::Success, format!("Saved {}", path.display())),
        Ok(Err(e)) => self.set_error(format!("Download failed: {:#}", e)),
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.download_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {}
      }
    }
  }

  // --- Results ---

  pub fn selected_record(&self) -> Option<&VideoRecord> {
    self.table_state.selected().and_then(|i| self.records.get(i))
  }

  pub fn select_next(&mut self) {
    let count = self.records.len();
    if count > 0 {
      let i = self.table_state.selected().map_or(0, |i| (i + 1) % count);
      self.table_state.select(Some(i));
    }
  }

  pub fn select_previous(&mut self) {
    let count = self.records.len();
    if count > 0 {
      let i = self.table_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
      self.table_state.select(Some(i));
    }
  }

  /// Sort by `key` (toggling when it is already active) and keep the cursor on the same video.
  pub fn sort_by(&mut self, key: SortKey) {
    let selected_id = self.selected_record().map(|r| r.video_id.clone());
    let state = SortState::select(self.sort, key);
    state.apply(&mut self.records);
    self.sort = Some(state);
    if let Some(id) = selected_id {
      self.table_state.select(self.records.iter().position(|r| r.video_id == id));
    }
  }

  pub fn export_csv(&mut self) {
    if self.records.is_empty() {
      self.set_error("Nothing to export.");
      return;
    }
    let path = self.export_dir.join(export::default_file_name());
    match export::write_csv(&path, &self.records) {
      Ok(path) => self.set_toast(ToastKind::Success, format!("Exported {}", path.display())),
      Err(e) => self.set_error(format!("{:#}", e)),
    }
  }

  // --- Thumbnails ---

  pub fn trigger_preview(&mut self) {
    let Some(record) = self.selected_record() else { return };
    let (video_id, url) = (record.video_id.clone(), record.thumbnail_url.clone());
    self.mode = AppMode::Preview;
    if self.preview.as_ref().is_some_and(|(id, _)| *id == video_id) || self.tasks.preview_rx.is_some() {
      return;
    }
    self.preview = None;
    self.status_message = Some("Loading thumbnail…".to_string());

    let client = self.http.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let image = thumbnail::fetch_thumbnail(&client, &url).await;
      let _ = tx.send((video_id, image));
    });
    self.tasks.preview_rx = Some(rx);
  }

  pub fn close_preview(&mut self) {
    self.mode = AppMode::Results;
    self.gfx.thumb_area = None;
  }

  pub fn download_thumbnail(&mut self) {
    if self.tasks.download_rx.is_some() {
      return;
    }
    let Some(record) = self.selected_record().cloned() else { return };
    let client = self.http.clone();
    let dir = self.export_dir.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(thumbnail::download_thumbnail(&client, &record, &dir).await);
    });
    self.tasks.download_rx = Some(rx);
    self.set_toast(ToastKind::Info, "Downloading thumbnail…");
  }

  pub fn copy_thumbnail_url(&mut self) {
    let Some(url) = self.selected_record().map(|r| r.thumbnail_url.clone()) else { return };
    match thumbnail::copy_to_clipboard(&url) {
      Ok(()) => self.set_toast(ToastKind::Success, "Thumbnail URL copied to clipboard."),
      Err(e) => self.set_error(format!("{:#}", e)),
    }
  }

  pub fn open_selected_in_browser(&mut self) {
    let Some(url) = self.selected_record().map(|r| r.video_url.clone()) else { return };
    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";
    match std::process::Command::new(cmd)
      .arg(&url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
    {
      Ok(mut child) => {
        std::thread::spawn(move || {
          let _ = child.wait();
        });
      }
      Err(e) => self.set_error(format!("Failed to open browser: {}", e)),
    }
  }

  // --- History ---

  pub fn open_history(&mut self) {
    if self.history.is_empty() {
      self.set_toast(ToastKind::Info, "No search history yet.");
      return;
    }
    self.history_state.select(Some(0));
    self.mode = AppMode::History;
  }

  pub fn history_step(&mut self, forward: bool) {
    let count = self.history.entries().len();
    if count == 0 {
      return;
    }
    let i = self.history_state.selected().unwrap_or(0);
    let next = if forward { (i + 1) % count } else if i == 0 { count - 1 } else { i - 1 };
    self.history_state.select(Some(next));
  }

  pub fn use_history_entry(&mut self) {
    let entry = self.history_state.selected().and_then(|i| self.history.entries().get(i)).cloned();
    if let Some(url) = entry {
      self.cursor_position = url.chars().count();
      self.input = url;
      self.input_scroll = 0;
      self.search_mode = SearchMode::Url;
      self.field = InputField::Query;
    }
    self.mode = AppMode::Input;
  }

  pub fn clear_history(&mut self) {
    self.history.clear();
    self.history_state.select(None);
    self.save_config();
    self.mode = AppMode::Input;
    self.set_toast(ToastKind::Info, "History cleared.");
  }
}
