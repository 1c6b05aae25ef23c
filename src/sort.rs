use clap::ValueEnum;
use std::cmp::Ordering;

use crate::metrics::VideoRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
  Title,
  Published,
  Views,
  Subscribers,
  Rate,
}

impl SortKey {
  pub const ALL: [SortKey; 5] = [SortKey::Title, SortKey::Published, SortKey::Views, SortKey::Subscribers, SortKey::Rate];

  pub fn label(self) -> &'static str {
    match self {
      SortKey::Title => "Title",
      SortKey::Published => "Published",
      SortKey::Views => "Views",
      SortKey::Subscribers => "Subscribers",
      SortKey::Rate => "Diffusion",
    }
  }

  fn compare(self, a: &VideoRecord, b: &VideoRecord) -> Ordering {
    match self {
      SortKey::Title => a.title.cmp(&b.title),
      // Unparseable timestamps sort before every real date.
      SortKey::Published => a.published().cmp(&b.published()),
      SortKey::Views => a.view_count.cmp(&b.view_count),
      SortKey::Subscribers => a.subscriber_count.cmp(&b.subscriber_count),
      SortKey::Rate => a.diffusion_rate().total_cmp(&b.diffusion_rate()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
  Ascending,
  Descending,
}

impl SortDirection {
  pub fn flip(self) -> Self {
    match self {
      SortDirection::Ascending => SortDirection::Descending,
      SortDirection::Descending => SortDirection::Ascending,
    }
  }

  pub fn arrow(self) -> &'static str {
    match self {
      SortDirection::Ascending => "▲",
      SortDirection::Descending => "▼",
    }
  }
}

/// Active sort column of the results table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
  pub key: SortKey,
  pub direction: SortDirection,
}

impl SortState {
  pub fn new(key: SortKey, direction: SortDirection) -> Self {
    Self { key, direction }
  }

  /// Column-header click semantics: the same key flips direction, a new key
  /// starts descending.
  pub fn select(current: Option<SortState>, key: SortKey) -> SortState {
    match current {
      Some(state) if state.key == key => SortState { key, direction: state.direction.flip() },
      _ => SortState { key, direction: SortDirection::Descending },
    }
  }

  /// Stable sort, so ties keep their upstream order.
  pub fn apply(self, records: &mut [VideoRecord]) {
    records.sort_by(|a, b| {
      let ord = self.key.compare(a, b);
      match self.direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
      }
    });
  }
}
