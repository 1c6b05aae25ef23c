use regex::Regex;
use std::sync::LazyLock;

static DURATION_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("duration pattern is valid"));

/// Parse an ISO-8601 `PT#H#M#S` duration into seconds.
///
/// Missing components count as zero and input that does not match at all
/// yields 0. The duration filter relies on this: unparseable videos drop out.
pub fn parse_duration(iso: &str) -> u64 {
  let Some(caps) = DURATION_RE.captures(iso) else { return 0 };
  let part = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<u64>().ok()).unwrap_or(0);
  part(1).saturating_mul(3600).saturating_add(part(2).saturating_mul(60)).saturating_add(part(3))
}
