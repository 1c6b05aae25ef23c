use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::constants::constants;
use crate::error::FetchError;
use crate::extract::ChannelIdentifier;

// --- Wire types (YouTube Data API v3) ---

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
  #[serde(default = "Vec::new")]
  items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
  error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
  #[serde(default)]
  id: SearchId,
  snippet: Option<SearchSnippet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
  video_id: Option<String>,
  channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
  channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentItem {
  content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
  related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
  uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
  content_details: Option<PlaylistItemDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
  video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatsItem {
  id: String,
  statistics: Option<ChannelStatistics>,
}

/// Channel statistics; counts arrive as decimal strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
  pub subscriber_count: Option<String>,
}

/// One entry of a `videos.list` response with `snippet,statistics,contentDetails`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
  pub id: String,
  #[serde(default)]
  pub snippet: VideoSnippet,
  #[serde(default)]
  pub statistics: VideoStatistics,
  #[serde(default)]
  pub content_details: VideoContentDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub channel_id: String,
  #[serde(default)]
  pub published_at: String,
  #[serde(default)]
  pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
  pub default: Option<Thumbnail>,
  pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
  pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
  pub view_count: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContentDetails {
  #[serde(default)]
  pub duration: String,
}

// --- Client ---

/// Thin client over the YouTube Data API endpoints the report needs.
///
/// Every call is a single GET with the API key as the `key` query parameter.
/// Non-success statuses become [`FetchError::Upstream`] with the API's message.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
  http: Client,
  base_url: String,
  api_key: String,
}

impl YouTubeClient {
  pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
    Self::with_base_url(api_key, &constants().api_base_url)
  }

  pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self, FetchError> {
    let api_key = api_key.into();
    if api_key.trim().is_empty() {
      return Err(FetchError::invalid_input("an API key is required"));
    }
    Ok(Self { http: Client::new(), base_url: base_url.trim_end_matches('/').to_string(), api_key })
  }

  async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T, FetchError> {
    // Key is attached separately so it never shows up in the logged params.
    debug!(endpoint, ?params, "youtube: request");
    let response =
      self.http.get(format!("{}/{}", self.base_url, endpoint)).query(params).query(&[("key", &self.api_key)]).send().await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
      return Err(FetchError::Upstream { status: status.as_u16(), message });
    }

    Ok(response.json::<T>().await?)
  }

  /// Resolve a channel handle (without `@`) to its channel ID via a channel-type search.
  pub async fn resolve_handle_to_channel_id(&self, handle: &str) -> Result<Option<String>, FetchError> {
    let query = format!("@{}", handle);
    let body: ListResponse<SearchItem> =
      self.get("search", &[("part", "snippet"), ("type", "channel"), ("q", &query), ("maxResults", "1")]).await?;
    let channel_id = body
      .items
      .into_iter()
      .next()
      .and_then(|item| item.id.channel_id.or_else(|| item.snippet.and_then(|s| s.channel_id)));
    debug!(handle, ?channel_id, "youtube: handle resolved");
    Ok(channel_id)
  }

  /// Look up the uploads playlist of a channel.
  pub async fn uploads_playlist_id(&self, channel_id: &str) -> Result<String, FetchError> {
    let body: ListResponse<ChannelContentItem> =
      self.get("channels", &[("part", "contentDetails"), ("id", channel_id)]).await?;
    let details = body
      .items
      .into_iter()
      .next()
      .and_then(|item| item.content_details)
      .ok_or_else(|| FetchError::ChannelNotFound(channel_id.to_string()))?;
    details
      .related_playlists
      .and_then(|p| p.uploads)
      .filter(|id| !id.is_empty())
      .ok_or_else(|| FetchError::NoUploadsPlaylist(channel_id.to_string()))
  }

  /// List up to `max_results` video IDs from a playlist, in playlist order.
  pub async fn playlist_video_ids(&self, playlist_id: &str, max_results: u32) -> Result<Vec<String>, FetchError> {
    let max = max_results.to_string();
    let body: ListResponse<PlaylistItem> = self
      .get("playlistItems", &[("part", "contentDetails"), ("playlistId", playlist_id), ("maxResults", &max)])
      .await?;
    Ok(
      body
        .items
        .into_iter()
        .filter_map(|item| item.content_details.and_then(|d| d.video_id))
        .take(max_results as usize)
        .collect(),
    )
  }

  /// Latest uploads of a channel: handle → channel ID → uploads playlist → video IDs.
  pub async fn list_latest_video_ids(
    &self,
    identifier: &ChannelIdentifier,
    max_results: u32,
  ) -> Result<Vec<String>, FetchError> {
    let channel_id = match identifier {
      ChannelIdentifier::Id(id) => id.clone(),
      ChannelIdentifier::Handle(handle) => self
        .resolve_handle_to_channel_id(handle)
        .await?
        .ok_or_else(|| FetchError::ChannelNotFound(format!("@{}", handle)))?,
    };

    let playlist_id = self.uploads_playlist_id(&channel_id).await?;
    let ids = self.playlist_video_ids(&playlist_id, max_results).await?;
    if ids.is_empty() {
      return Err(FetchError::NoVideosFound);
    }
    info!(channel_id = %channel_id, count = ids.len(), "youtube: listed channel uploads");
    Ok(ids)
  }

  /// Video-type keyword search. No results is an empty list, not an error.
  pub async fn search_video_ids_by_keyword(&self, keyword: &str, max_results: u32) -> Result<Vec<String>, FetchError> {
    let max = max_results.to_string();
    let body: ListResponse<SearchItem> =
      self.get("search", &[("part", "id"), ("type", "video"), ("q", keyword), ("maxResults", &max)]).await?;
    let ids: Vec<String> =
      body.items.into_iter().filter_map(|item| item.id.video_id).take(max_results as usize).collect();
    info!(keyword, count = ids.len(), "youtube: keyword search");
    Ok(ids)
  }

  /// Batch lookup of videos with snippet, statistics and content details.
  ///
  /// IDs are sent in sequential chunks of the API's batch limit; items come
  /// back concatenated in chunk order.
  pub async fn videos(&self, ids: &[String]) -> Result<Vec<VideoItem>, FetchError> {
    let mut items = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(constants().api_batch_size.max(1)) {
      let joined = chunk.join(",");
      let body: ListResponse<VideoItem> =
        self.get("videos", &[("part", "snippet,statistics,contentDetails"), ("id", &joined)]).await?;
      items.extend(body.items);
    }
    Ok(items)
  }

  /// Batch lookup of channel statistics, keyed by channel ID.
  pub async fn channel_statistics(&self, ids: &[String]) -> Result<HashMap<String, ChannelStatistics>, FetchError> {
    let mut stats = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(constants().api_batch_size.max(1)) {
      let joined = chunk.join(",");
      let body: ListResponse<ChannelStatsItem> =
        self.get("channels", &[("part", "statistics"), ("id", &joined)]).await?;
      stats.extend(body.items.into_iter().map(|item| (item.id, item.statistics.unwrap_or_default())));
    }
    Ok(stats)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  pub(crate) const KEY: &str = "test-key";

  pub(crate) fn client_for(server: &MockServer) -> YouTubeClient {
    YouTubeClient::with_base_url(KEY, &server.uri()).unwrap()
  }

  #[test]
  fn new_rejects_blank_key() {
    assert!(matches!(YouTubeClient::new("  "), Err(FetchError::InvalidInput(_))));
    assert!(YouTubeClient::new("AIzaSyTest").is_ok());
  }

  #[tokio::test]
  async fn resolve_handle_returns_first_channel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/search"))
      .and(query_param("type", "channel"))
      .and(query_param("q", "@myhandle"))
      .and(query_param("key", KEY))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "items": [{ "id": { "kind": "youtube#channel", "channelId": "UC123" }, "snippet": { "channelId": "UC123" } }]
      })))
      .mount(&server)
      .await;

    let id = client_for(&server).resolve_handle_to_channel_id("myhandle").await.unwrap();
    assert_eq!(id.as_deref(), Some("UC123"));
  }

  #[tokio::test]
  async fn resolve_handle_none_when_no_results() {
    let server = MockServer::start().await;
    Mock::given(path("/search")).respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] }))).mount(&server).await;

    assert_eq!(client_for(&server).resolve_handle_to_channel_id("nobody").await.unwrap(), None);
  }

  #[tokio::test]
  async fn upstream_error_carries_message() {
    let server = MockServer::start().await;
    Mock::given(path("/search"))
      .respond_with(ResponseTemplate::new(403).set_body_json(json!({
        "error": { "code": 403, "message": "The request cannot be completed because you have exceeded your quota." }
      })))
      .mount(&server)
      .await;

    let err = client_for(&server).resolve_handle_to_channel_id("x").await.unwrap_err();
    match err {
      FetchError::Upstream { status, message } => {
        assert_eq!(status, 403);
        assert!(message.contains("exceeded your quota"));
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn handle_resolution_feeds_uploads_lookup() {
    let server = MockServer::start().await;
    Mock::given(path("/search"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [{ "id": { "channelId": "UCabc" } }] })))
      .mount(&server)
      .await;
    Mock::given(path("/channels"))
      .and(query_param("id", "UCabc"))
      .and(query_param("part", "contentDetails"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "items": [{ "contentDetails": { "relatedPlaylists": { "uploads": "UUabc" } } }]
      })))
      .mount(&server)
      .await;
    Mock::given(path("/playlistItems"))
      .and(query_param("playlistId", "UUabc"))
      .and(query_param("maxResults", "2"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "items": [
          { "contentDetails": { "videoId": "aaaaaaaaaaa" } },
          { "contentDetails": { "videoId": "bbbbbbbbbbb" } }
        ]
      })))
      .mount(&server)
      .await;

    let ids = client_for(&server)
      .list_latest_video_ids(&ChannelIdentifier::Handle("abc".to_string()), 2)
      .await
      .unwrap();
    assert_eq!(ids, vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
  }

  #[tokio::test]
  async fn unresolvable_handle_is_channel_not_found() {
    let server = MockServer::start().await;
    Mock::given(path("/search")).respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] }))).mount(&server).await;

    let err = client_for(&server)
      .list_latest_video_ids(&ChannelIdentifier::Handle("ghost".to_string()), 5)
      .await
      .unwrap_err();
    assert!(matches!(err, FetchError::ChannelNotFound(_)));
  }

  #[tokio::test]
  async fn channel_without_content_details_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(path("/channels")).respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] }))).mount(&server).await;

    let err =
      client_for(&server).list_latest_video_ids(&ChannelIdentifier::Id("UCx".to_string()), 5).await.unwrap_err();
    assert!(matches!(err, FetchError::ChannelNotFound(id) if id == "UCx"));
  }

  #[tokio::test]
  async fn channel_without_uploads_playlist() {
    let server = MockServer::start().await;
    Mock::given(path("/channels"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({ "items": [{ "contentDetails": { "relatedPlaylists": {} } }] })),
      )
      .mount(&server)
      .await;

    let err =
      client_for(&server).list_latest_video_ids(&ChannelIdentifier::Id("UCx".to_string()), 5).await.unwrap_err();
    assert!(matches!(err, FetchError::NoUploadsPlaylist(_)));
  }

  #[tokio::test]
  async fn empty_playlist_is_no_videos_found() {
    let server = MockServer::start().await;
    Mock::given(path("/channels"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "items": [{ "contentDetails": { "relatedPlaylists": { "uploads": "UUx" } } }]
      })))
      .mount(&server)
      .await;
    Mock::given(path("/playlistItems")).respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] }))).mount(&server).await;

    let err =
      client_for(&server).list_latest_video_ids(&ChannelIdentifier::Id("UCx".to_string()), 5).await.unwrap_err();
    assert!(matches!(err, FetchError::NoVideosFound));
  }

  #[tokio::test]
  async fn keyword_search_with_no_results_is_empty() {
    let server = MockServer::start().await;
    Mock::given(path("/search"))
      .and(query_param("type", "video"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pageInfo": { "totalResults": 0 } })))
      .mount(&server)
      .await;

    let ids = client_for(&server).search_video_ids_by_keyword("nothing here", 10).await.unwrap();
    assert!(ids.is_empty());
  }

  #[tokio::test]
  async fn keyword_search_drops_items_without_video_id() {
    let server = MockServer::start().await;
    Mock::given(path("/search"))
      .and(query_param("q", "rust"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "items": [
          { "id": { "videoId": "aaaaaaaaaaa" } },
          { "id": { "channelId": "UCzzz" } },
          { "snippet": {} },
          { "id": { "videoId": "bbbbbbbbbbb" } }
        ]
      })))
      .mount(&server)
      .await;

    let ids = client_for(&server).search_video_ids_by_keyword("rust", 10).await.unwrap();
    assert_eq!(ids, vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
  }

  #[tokio::test]
  async fn video_batches_are_chunked() {
    let server = MockServer::start().await;
    Mock::given(path("/videos"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [{ "id": "x" }] })))
      .expect(2)
      .mount(&server)
      .await;

    let ids: Vec<String> = (0..constants().api_batch_size + 1).map(|i| format!("{i:011}")).collect();
    let items = client_for(&server).videos(&ids).await.unwrap();
    assert_eq!(items.len(), 2);
  }

  #[tokio::test]
  async fn channel_batches_are_chunked() {
    let server = MockServer::start().await;
    let batch = constants().api_batch_size;
    let ids: Vec<String> = (0..batch + 1).map(|i| format!("UC{i:04}")).collect();
    let first = ids[..batch].join(",");
    Mock::given(path("/channels"))
      .and(query_param("id", first.as_str()))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "items": [{ "id": "UC0000", "statistics": { "subscriberCount": "7" } }]
      })))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(path("/channels"))
      .and(query_param("id", ids[batch].as_str()))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "items": [{ "id": ids[batch].clone(), "statistics": { "subscriberCount": "9" } }]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let stats = client_for(&server).channel_statistics(&ids).await.unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats["UC0000"].subscriber_count.as_deref(), Some("7"));
    assert_eq!(stats[&ids[batch]].subscriber_count.as_deref(), Some("9"));
  }
}
