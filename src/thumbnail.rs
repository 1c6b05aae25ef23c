use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::DynamicImage;
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::metrics::VideoRecord;

async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
  if url.is_empty() {
    return Err(anyhow!("No thumbnail URL for this video"));
  }
  let response = client.get(url).send().await.with_context(|| format!("Failed to request {}", url))?;
  if !response.status().is_success() {
    return Err(anyhow!("Thumbnail request failed with status {} ({})", response.status(), url));
  }
  let bytes = response.bytes().await.with_context(|| format!("Failed to read image bytes from {}", url))?;
  Ok(bytes.to_vec())
}

/// Download and decode a thumbnail for preview.
pub async fn fetch_thumbnail(client: &Client, url: &str) -> Result<DynamicImage> {
  let bytes = fetch_bytes(client, url).await?;
  image::load_from_memory(&bytes).with_context(|| format!("Failed to decode image from memory (URL: {})", url))
}

/// Save the thumbnail as `<video_id>.<ext>` inside `dir`, extension taken from the URL.
pub async fn download_thumbnail(client: &Client, record: &VideoRecord, dir: &Path) -> Result<PathBuf> {
  let bytes = fetch_bytes(client, &record.thumbnail_url).await?;
  let ext = record
    .thumbnail_url
    .rsplit('/')
    .next()
    .and_then(|name| name.split('?').next())
    .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()))
    .filter(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "webp"))
    .unwrap_or_else(|| "jpg".to_string());
  let path = dir.join(format!("{}.{}", record.video_id, ext));
  tokio::fs::write(&path, &bytes).await.with_context(|| format!("Failed to write {}", path.display()))?;
  info!(path = %path.display(), bytes = bytes.len(), "thumbnail: downloaded");
  Ok(path)
}

/// OSC 52 "set clipboard" sequence for `text`.
///
///   \x1B]52;c;<base64>\x07
///
/// Supported by most modern terminals (kitty, WezTerm, iTerm2, foot, tmux with
/// `set-clipboard on`); silently ignored elsewhere.
pub fn osc52_sequence(text: &str) -> String {
  format!("\x1B]52;c;{}\x07", BASE64.encode(text.as_bytes()))
}

pub fn copy_to_clipboard(text: &str) -> Result<()> {
  let mut stdout = std::io::stdout();
  write!(stdout, "{}", osc52_sequence(text)).context("Failed to write clipboard escape")?;
  stdout.flush().context("Failed to flush clipboard escape")?;
  Ok(())
}
