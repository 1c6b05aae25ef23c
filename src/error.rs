use thiserror::Error;

/// Failures of the fetch pipeline. Each one aborts the remaining stages.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Channel not found: {0}")]
  ChannelNotFound(String),

  #[error("Channel {0} has no uploads playlist")]
  NoUploadsPlaylist(String),

  #[error("No videos found")]
  NoVideosFound,

  /// Non-success HTTP status; `message` is the API's own error message.
  #[error("YouTube API error ({status}): {message}")]
  Upstream { status: u16, message: String },

  #[error("Request failed: {0}")]
  Http(#[from] reqwest::Error),
}

impl FetchError {
  pub fn invalid_input(msg: impl Into<String>) -> Self {
    Self::InvalidInput(msg.into())
  }
}
