use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::constants;
use crate::metrics::VideoRecord;

const CSV_HEADER: &str = "Title,PublishedDate,ViewCount,SubscriberCount,DiffusionRate,VideoURL";

/// Title is always quoted with embedded quotes doubled; the other columns
/// never contain separators.
fn quote(field: &str) -> String {
  format!("\"{}\"", field.replace('"', "\"\""))
}

fn published_date(record: &VideoRecord) -> String {
  record.published().map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_else(|| record.published_at.clone())
}

pub fn to_csv(records: &[VideoRecord]) -> String {
  let mut out = String::from(CSV_HEADER);
  out.push('\n');
  for r in records {
    out.push_str(&format!(
      "{},{},{},{},{:.2},{}\n",
      quote(&r.title),
      published_date(r),
      r.view_count,
      r.subscriber_count,
      r.diffusion_rate(),
      r.video_url
    ));
  }
  out
}

/// File name for an export started now, e.g. `youtube_metrics_20260101_093000.csv`.
pub fn default_file_name() -> String {
  format!("{}_{}.csv", constants().csv_file_prefix, Local::now().format("%Y%m%d_%H%M%S"))
}

pub fn write_csv(path: &Path, records: &[VideoRecord]) -> Result<PathBuf> {
  std::fs::write(path, to_csv(records)).with_context(|| format!("Failed to write CSV to {}", path.display()))?;
  info!(path = %path.display(), rows = records.len(), "export: csv written");
  Ok(path.to_path_buf())
}
