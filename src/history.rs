use crate::constants::constants;

/// Recently searched URLs, most recent first, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHistory {
  entries: Vec<String>,
  limit: usize,
}

impl Default for SearchHistory {
  fn default() -> Self {
    Self::with_limit(constants().history_limit)
  }
}

impl SearchHistory {
  pub fn with_limit(limit: usize) -> Self {
    Self { entries: Vec::new(), limit: limit.max(1) }
  }

  /// Rebuild from persisted entries, re-applying de-duplication and the cap.
  pub fn from_entries(entries: Vec<String>) -> Self {
    let mut history = Self::default();
    for entry in entries.into_iter().rev() {
      history.push(&entry);
    }
    history
  }

  pub fn push(&mut self, url: &str) {
    let url = url.trim();
    if url.is_empty() {
      return;
    }
    self.entries.retain(|e| e != url);
    self.entries.insert(0, url.to_string());
    self.entries.truncate(self.limit);
  }

  pub fn entries(&self) -> &[String] {
    &self.entries
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}
