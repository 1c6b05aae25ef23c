//! URL parsing for the two input shapes the report understands: a single
//! video, or a channel addressed by raw ID or by `@handle`.

use regex::Regex;
use std::sync::LazyLock;

/// A channel as written in a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelIdentifier {
  /// Opaque `UC…` channel ID from `/channel/<id>`.
  Id(String),
  /// Human-readable handle from `/@<handle>`, without the `@`.
  Handle(String),
}

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?:[?&]v=|youtu\.be/|/embed/|/v/)([A-Za-z0-9_-]{11})").expect("video id pattern is valid")
});

static CHANNEL_ID_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"/channel/([A-Za-z0-9_-]+)").expect("channel id pattern is valid"));

// Handles may be any script; stop at the next path, query or fragment delimiter.
static HANDLE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"/@([^/?#&\s]+)").expect("handle pattern is valid"));

/// Extract the 11-character video ID from `watch?v=`, `youtu.be/`, `/embed/` or `/v/` URLs.
pub fn extract_video_id(url: &str) -> Option<String> {
  VIDEO_ID_RE.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

/// Extract a channel identifier from `/channel/<id>` or `/@<handle>` URLs.
pub fn extract_channel_identifier(url: &str) -> Option<ChannelIdentifier> {
  if let Some(m) = CHANNEL_ID_RE.captures(url).and_then(|c| c.get(1)) {
    return Some(ChannelIdentifier::Id(m.as_str().to_string()));
  }
  let raw = HANDLE_RE.captures(url).and_then(|c| c.get(1))?.as_str();
  let handle = urlencoding::decode(raw).map(|d| d.into_owned()).unwrap_or_else(|_| raw.to_string());
  Some(ChannelIdentifier::Handle(handle))
}
