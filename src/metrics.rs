use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::constants::constants;
use crate::duration::parse_duration;
use crate::error::FetchError;
use crate::youtube::{VideoItem, YouTubeClient};

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
  pub video_id: String,
  pub title: String,
  pub thumbnail_url: String,
  pub view_count: u64,
  pub subscriber_count: u64,
  pub published_at: String,
  pub video_url: String,
}

impl VideoRecord {
  /// Views per subscriber. Derived on every call, never stored.
  pub fn diffusion_rate(&self) -> f64 {
    diffusion_rate(self.view_count, self.subscriber_count)
  }

  pub fn published(&self) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&self.published_at).ok().map(|d| d.with_timezone(&Utc))
  }
}

/// `views / subscribers`, or 0 when the channel reports no subscribers.
pub fn diffusion_rate(view_count: u64, subscriber_count: u64) -> f64 {
  if subscriber_count == 0 { 0.0 } else { view_count as f64 / subscriber_count as f64 }
}

fn parse_count(raw: Option<&str>) -> u64 {
  raw.and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(0)
}

fn thumbnail_url(item: &VideoItem) -> String {
  let thumbs = &item.snippet.thumbnails;
  thumbs.high.as_ref().or(thumbs.default.as_ref()).map(|t| t.url.clone()).unwrap_or_default()
}

/// Turn a list of video IDs into report rows.
///
/// Two sequential batch calls: videos, then statistics of the distinct
/// channels that survive the duration filter. Rows keep the order of the
/// video batch response.
///
/// An empty video batch is [`FetchError::NoVideosFound`], but a batch where
/// every video is shorter than the minimum duration is `Ok(vec![])`.
pub async fn fetch_video_metrics(client: &YouTubeClient, video_ids: &[String]) -> Result<Vec<VideoRecord>, FetchError> {
  if video_ids.is_empty() {
    return Ok(Vec::new());
  }

  let items = client.videos(video_ids).await?;
  if items.is_empty() {
    return Err(FetchError::NoVideosFound);
  }

  let min_secs = constants().min_duration_secs;
  let fetched = items.len();
  let long_enough: Vec<VideoItem> =
    items.into_iter().filter(|item| parse_duration(&item.content_details.duration) >= min_secs).collect();
  if long_enough.is_empty() {
    info!(fetched, min_secs, "metrics: every video is below the minimum duration");
    return Ok(Vec::new());
  }

  let mut by_channel: HashMap<&str, Vec<&VideoItem>> = HashMap::new();
  let mut channel_ids: Vec<String> = Vec::new();
  for item in &long_enough {
    let entry = by_channel.entry(item.snippet.channel_id.as_str()).or_default();
    if entry.is_empty() {
      channel_ids.push(item.snippet.channel_id.clone());
    }
    entry.push(item);
  }

  let stats = client.channel_statistics(&channel_ids).await?;

  let missing: HashSet<&str> = by_channel.keys().copied().filter(|id| !stats.contains_key(*id)).collect();
  if !missing.is_empty() {
    // Kept lenient: these rows report 0 subscribers and a 0 diffusion rate.
    warn!(?missing, "metrics: channel statistics missing from response");
  }

  let prefix = &constants().watch_url_prefix;
  let records: Vec<VideoRecord> = long_enough
    .iter()
    .map(|item| {
      let subscriber_count =
        stats.get(&item.snippet.channel_id).map(|s| parse_count(s.subscriber_count.as_deref())).unwrap_or(0);
      VideoRecord {
        video_id: item.id.clone(),
        title: item.snippet.title.clone(),
        thumbnail_url: thumbnail_url(item),
        view_count: parse_count(item.statistics.view_count.as_deref()),
        subscriber_count,
        published_at: item.snippet.published_at.clone(),
        video_url: format!("{}{}", prefix, item.id),
      }
    })
    .collect();

  info!(fetched, kept = records.len(), channels = channel_ids.len(), "metrics: report assembled");
  Ok(records)
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::youtube::tests::client_for;
  use serde_json::{Value, json};
  use wiremock::matchers::{path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  pub(crate) fn video_json(id: &str, channel: &str, duration: &str, views: &str) -> Value {
    json!({
      "id": id,
      "snippet": {
        "title": format!("Video {id}"),
        "channelId": channel,
        "publishedAt": "2024-03-01T12:00:00Z",
        "thumbnails": {
          "default": { "url": format!("https://i.ytimg.com/vi/{id}/default.jpg") },
          "high": { "url": format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg") }
        }
      },
      "statistics": { "viewCount": views },
      "contentDetails": { "duration": duration }
    })
  }

  pub(crate) fn record(id: &str, title: &str, views: u64, subs: u64, published_at: &str) -> VideoRecord {
    VideoRecord {
      video_id: id.to_string(),
      title: title.to_string(),
      thumbnail_url: String::new(),
      view_count: views,
      subscriber_count: subs,
      published_at: published_at.to_string(),
      video_url: format!("https://www.youtube.com/watch?v={id}"),
    }
  }

  #[test]
  fn diffusion_rate_with_zero_subscribers() {
    assert_eq!(diffusion_rate(1000, 0), 0.0);
  }

  #[test]
  fn diffusion_rate_ratio() {
    assert_eq!(diffusion_rate(1000, 500), 2.0);
    assert_eq!(record("a", "t", 1000, 500, "").diffusion_rate(), 2.0);
  }

  #[test]
  fn published_parses_rfc3339() {
    let r = record("a", "t", 0, 0, "2024-03-01T12:00:00Z");
    assert_eq!(r.published().map(|d| d.timestamp()), Some(1_709_294_400));
    assert!(record("a", "t", 0, 0, "not a date").published().is_none());
  }

  #[tokio::test]
  async fn empty_input_short_circuits() {
    let server = MockServer::start().await;
    let records = fetch_video_metrics(&client_for(&server), &[]).await.unwrap();
    assert!(records.is_empty());
  }

  #[tokio::test]
  async fn builds_records_with_channel_stats() {
    let server = MockServer::start().await;
    Mock::given(path("/videos"))
      .and(query_param("id", "aaaaaaaaaaa,bbbbbbbbbbb,ccccccccccc"))
      .and(query_param("part", "snippet,statistics,contentDetails"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "items": [
          video_json("bbbbbbbbbbb", "UC1", "PT10M", "1000"),
          video_json("aaaaaaaaaaa", "UC2", "PT1H", "not-a-number"),
          video_json("ccccccccccc", "UC1", "PT30S", "999")
        ]
      })))
      .mount(&server)
      .await;
    Mock::given(path("/channels"))
      .and(query_param("part", "statistics"))
      .and(query_param("id", "UC1,UC2"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "items": [
          { "id": "UC1", "statistics": { "subscriberCount": "500" } },
          { "id": "UC2", "statistics": { "subscriberCount": "10" } }
        ]
      })))
      .mount(&server)
      .await;

    let ids = vec!["aaaaaaaaaaa".to_string(), "bbbbbbbbbbb".to_string(), "ccccccccccc".to_string()];
    let records = fetch_video_metrics(&client_for(&server), &ids).await.unwrap();

    // Upstream order, short video dropped.
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].video_id, "bbbbbbbbbbb");
    assert_eq!(records[0].view_count, 1000);
    assert_eq!(records[0].subscriber_count, 500);
    assert_eq!(records[0].diffusion_rate(), 2.0);
    assert_eq!(records[0].thumbnail_url, "https://i.ytimg.com/vi/bbbbbbbbbbb/hqdefault.jpg");
    assert_eq!(records[0].video_url, "https://www.youtube.com/watch?v=bbbbbbbbbbb");
    assert_eq!(records[1].video_id, "aaaaaaaaaaa");
    assert_eq!(records[1].view_count, 0);
    assert_eq!(records[1].subscriber_count, 10);
  }

  #[tokio::test]
  async fn all_short_videos_is_empty_not_error() {
    let server = MockServer::start().await;
    Mock::given(path("/videos"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "items": [video_json("aaaaaaaaaaa", "UC1", "PT59S", "10"), video_json("bbbbbbbbbbb", "UC1", "PT1M59S", "10")]
      })))
      .mount(&server)
      .await;
    Mock::given(path("/channels")).respond_with(ResponseTemplate::new(500)).expect(0).mount(&server).await;

    let ids = vec!["aaaaaaaaaaa".to_string(), "bbbbbbbbbbb".to_string()];
    let records = fetch_video_metrics(&client_for(&server), &ids).await.unwrap();
    assert!(records.is_empty());
  }

  #[tokio::test]
  async fn empty_video_batch_is_no_videos_found() {
    let server = MockServer::start().await;
    Mock::given(path("/videos")).respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] }))).mount(&server).await;

    let err = fetch_video_metrics(&client_for(&server), &["aaaaaaaaaaa".to_string()]).await.unwrap_err();
    assert!(matches!(err, FetchError::NoVideosFound));
  }

  #[tokio::test]
  async fn video_batch_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(path("/videos"))
      .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": { "code": 400, "message": "API key not valid." } })))
      .mount(&server)
      .await;

    let err = fetch_video_metrics(&client_for(&server), &["aaaaaaaaaaa".to_string()]).await.unwrap_err();
    match err {
      FetchError::Upstream { status, message } => {
        assert_eq!(status, 400);
        assert_eq!(message, "API key not valid.");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn channel_batch_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(path("/videos"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [video_json("aaaaaaaaaaa", "UC1", "PT5M", "1")] })))
      .mount(&server)
      .await;
    Mock::given(path("/channels"))
      .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "error": { "code": 503, "message": "Backend Error" } })))
      .mount(&server)
      .await;

    let err = fetch_video_metrics(&client_for(&server), &["aaaaaaaaaaa".to_string()]).await.unwrap_err();
    assert!(matches!(err, FetchError::Upstream { status: 503, .. }));
  }

  #[tokio::test]
  async fn missing_channel_stats_default_to_zero() {
    let server = MockServer::start().await;
    Mock::given(path("/videos"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [video_json("aaaaaaaaaaa", "UC9", "PT5M", "1000")] })))
      .mount(&server)
      .await;
    Mock::given(path("/channels")).respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] }))).mount(&server).await;

    let records = fetch_video_metrics(&client_for(&server), &["aaaaaaaaaaa".to_string()]).await.unwrap();
    assert_eq!(records[0].subscriber_count, 0);
    assert_eq!(records[0].diffusion_rate(), 0.0);
  }

  #[tokio::test]
  async fn thumbnail_falls_back_to_default() {
    let server = MockServer::start().await;
    let mut video = video_json("aaaaaaaaaaa", "UC1", "PT5M", "1");
    video["snippet"]["thumbnails"].as_object_mut().unwrap().remove("high");
    Mock::given(path("/videos")).respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [video] }))).mount(&server).await;
    Mock::given(path("/channels"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [{ "id": "UC1", "statistics": {} }] })))
      .mount(&server)
      .await;

    let records = fetch_video_metrics(&client_for(&server), &["aaaaaaaaaaa".to_string()]).await.unwrap();
    assert_eq!(records[0].thumbnail_url, "https://i.ytimg.com/vi/aaaaaaaaaaa/default.jpg");
  }
}
