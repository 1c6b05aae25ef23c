use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AppMode, InputField};
use crate::sort::SortKey;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Apply a line-editing key to `buf`. Returns `true` if the key was consumed.
pub fn edit_line(buf: &mut String, cursor: &mut usize, code: KeyCode) -> bool {
  let len = buf.chars().count();
  match code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(buf, *cursor);
      buf.insert(byte_idx, c);
      *cursor += 1;
    }
    KeyCode::Backspace if *cursor > 0 => {
      *cursor -= 1;
      let byte_idx = char_to_byte_index(buf, *cursor);
      buf.remove(byte_idx);
    }
    KeyCode::Delete if *cursor < len => {
      let byte_idx = char_to_byte_index(buf, *cursor);
      buf.remove(byte_idx);
    }
    KeyCode::Left => *cursor = cursor.saturating_sub(1),
    KeyCode::Right => *cursor = (*cursor + 1).min(len),
    KeyCode::Home => *cursor = 0,
    KeyCode::End => *cursor = len,
    KeyCode::Backspace | KeyCode::Delete => {}
    _ => return false,
  }
  true
}

fn sort_key_for(c: char) -> Option<SortKey> {
  let idx = c.to_digit(10)? as usize;
  SortKey::ALL.get(idx.checked_sub(1)?).copied()
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => {
        app.should_quit = true;
        return;
      }
      KeyCode::Char('t') => {
        app.next_theme();
        return;
      }
      KeyCode::Char('k') => {
        app.begin_api_key_edit();
        return;
      }
      KeyCode::Char('r') => {
        app.open_history();
        return;
      }
      _ => {}
    }
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Results => handle_results_key(app, key),
    AppMode::Preview => handle_preview_key(app, key),
    AppMode::History => handle_history_key(app, key),
  }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
  if app.field == InputField::ApiKey {
    match key.code {
      KeyCode::Enter => app.commit_api_key(),
      KeyCode::Esc => app.cancel_api_key_edit(),
      code => {
        edit_line(&mut app.api_key_input, &mut app.api_key_cursor, code);
      }
    }
    return;
  }

  match key.code {
    KeyCode::Enter => {
      app.trigger_fetch();
    }
    KeyCode::Tab | KeyCode::BackTab => app.toggle_search_mode(),
    KeyCode::PageUp => app.adjust_max_results(1),
    KeyCode::PageDown => app.adjust_max_results(-1),
    KeyCode::Down => {
      if !app.records.is_empty() {
        app.mode = AppMode::Results;
      }
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if !app.records.is_empty() {
        app.mode = AppMode::Results;
      } else {
        app.should_quit = true;
      }
    }
    code => {
      if edit_line(&mut app.input, &mut app.cursor_position, code) {
        app.clear_toast();
      }
    }
  }
}

fn handle_results_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => app.select_next(),
    KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
    KeyCode::Char(c @ '1'..='5') => {
      if let Some(sort_key) = sort_key_for(c) {
        app.sort_by(sort_key);
      }
    }
    KeyCode::Enter | KeyCode::Char('p') => app.trigger_preview(),
    KeyCode::Char('d') => app.download_thumbnail(),
    KeyCode::Char('c') => app.copy_thumbnail_url(),
    KeyCode::Char('e') => app.export_csv(),
    KeyCode::Char('o') => app.open_selected_in_browser(),
    KeyCode::Esc | KeyCode::Char('/') => app.mode = AppMode::Input,
    _ => {}
  }
}

fn handle_preview_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Char('d') => app.download_thumbnail(),
    KeyCode::Char('c') => app.copy_thumbnail_url(),
    KeyCode::Char('o') => app.open_selected_in_browser(),
    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('p') => app.close_preview(),
    _ => {}
  }
}

fn handle_history_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => app.history_step(true),
    KeyCode::Up | KeyCode::Char('k') => app.history_step(false),
    KeyCode::Enter => app.use_history_entry(),
    KeyCode::Char('x') => app.clear_history(),
    KeyCode::Esc => app.mode = AppMode::Input,
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::display::DisplayMode;
  use crate::metrics::tests::record;
  use crate::pipeline::SearchMode;
  use crate::sort::SortDirection;

  fn app() -> App {
    App::new(DisplayMode::Ascii, Config::default(), None)
  }

  fn press(app: &mut App, code: KeyCode) {
    handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
  }

  fn ctrl(app: &mut App, c: char) {
    handle_key_event(app, KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
  }

  #[test]
  fn edit_line_handles_multibyte() {
    let mut buf = String::from("héllo");
    let mut cursor = 2;
    assert!(edit_line(&mut buf, &mut cursor, KeyCode::Backspace));
    assert_eq!(buf, "hllo");
    assert_eq!(cursor, 1);
    assert!(edit_line(&mut buf, &mut cursor, KeyCode::Char('ü')));
    assert_eq!(buf, "hüllo");
    assert!(!edit_line(&mut buf, &mut cursor, KeyCode::Enter));
  }

  #[test]
  fn edit_line_clamps_cursor() {
    let mut buf = String::from("ab");
    let mut cursor = 2;
    edit_line(&mut buf, &mut cursor, KeyCode::Right);
    assert_eq!(cursor, 2);
    edit_line(&mut buf, &mut cursor, KeyCode::Delete);
    assert_eq!(buf, "ab");
  }

  #[test]
  fn typing_fills_query() {
    let mut app = app();
    for c in "rust".chars() {
      press(&mut app, KeyCode::Char(c));
    }
    assert_eq!(app.input, "rust");
  }

  #[test]
  fn tab_toggles_mode_and_pages_adjust_count() {
    let mut app = app();
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.search_mode, SearchMode::Keyword);
    let before = app.max_results;
    press(&mut app, KeyCode::PageUp);
    assert_eq!(app.max_results, before + 1);
  }

  #[test]
  fn digit_keys_sort_and_toggle() {
    let mut app = app();
    app.apply_records(vec![record("a", "A", 10, 1, ""), record("b", "B", 30, 1, ""), record("c", "C", 20, 1, "")]);
    app.mode = AppMode::Results;

    press(&mut app, KeyCode::Char('3'));
    assert_eq!(app.sort.map(|s| (s.key, s.direction)), Some((SortKey::Views, SortDirection::Descending)));
    press(&mut app, KeyCode::Char('3'));
    assert_eq!(app.sort.map(|s| s.direction), Some(SortDirection::Ascending));
    press(&mut app, KeyCode::Char('1'));
    assert_eq!(app.sort.map(|s| (s.key, s.direction)), Some((SortKey::Title, SortDirection::Descending)));
  }

  #[test]
  fn ctrl_k_edits_api_key_without_touching_query() {
    let mut app = app();
    app.input = "query".to_string();
    ctrl(&mut app, 'k');
    press(&mut app, KeyCode::Char('z'));
    assert_eq!(app.api_key_input, "z");
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.api_key.as_deref(), Some("z"));
    assert_eq!(app.input, "query");
  }

  #[test]
  fn esc_on_empty_input_quits() {
    let mut app = app();
    press(&mut app, KeyCode::Esc);
    assert!(app.should_quit);
  }

  #[test]
  fn sort_keys_map_to_columns() {
    assert_eq!(sort_key_for('1'), Some(SortKey::Title));
    assert_eq!(sort_key_for('5'), Some(SortKey::Rate));
    assert_eq!(sort_key_for('0'), None);
  }
}
