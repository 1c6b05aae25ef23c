use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Flex, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Cell, Clear, List, ListItem, Padding, Paragraph, Row, Table},
};

use crate::app::{App, AppMode, InputField, ToastKind};
use crate::display::DisplayMode;
use crate::graphics::{ThumbnailWidget, fit_to_area};
use crate::metrics::VideoRecord;
use crate::pipeline::SearchMode;
use crate::sort::SortKey;
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate to `max_width` terminal columns, appending "…" if anything was cut.
pub fn truncate_str(s: &str, max_width: usize) -> String {
  use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
  if s.width() <= max_width {
    return s.to_string();
  }
  let budget = max_width.saturating_sub(1);
  let mut used = 0;
  let mut out = String::new();
  for c in s.chars() {
    let w = c.width().unwrap_or(0);
    if used + w > budget {
      break;
    }
    used += w;
    out.push(c);
  }
  out.push('…');
  out
}

/// `1234567` → `1,234,567`.
pub fn group_digits(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

fn published_label(record: &VideoRecord) -> String {
  record.published().map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_else(|| record.published_at.clone())
}

fn rounded_block<'a>(theme: &Theme) -> Block<'a> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  app.gfx.thumb_area = None;

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, mode_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Min(5),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, theme, header_area);
  render_mode_bar(frame, app, mode_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);

  if app.mode == AppMode::History {
    render_history(frame, app, main_area);
  }
}

fn render_header(frame: &mut Frame, theme: &Theme, area: Rect) {
  let left = Line::from(Span::styled(" ◆ ytreach ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_mode_bar(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let tab = |mode: SearchMode| {
    if app.search_mode == mode {
      Span::styled(format!(" {} ", mode.label()), Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).bold())
    } else {
      Span::styled(format!(" {} ", mode.label()), Style::default().fg(theme.muted))
    }
  };

  let mut spans = vec![Span::raw(" "), tab(SearchMode::Url), Span::raw(" "), tab(SearchMode::Keyword)];
  spans.push(Span::styled(format!("   Count {}", app.max_results), Style::default().fg(theme.fg)));
  if let Some(sort) = app.sort {
    spans.push(Span::styled(
      format!("   Sort {} {}", sort.key.label(), sort.direction.arrow()),
      Style::default().fg(theme.muted),
    ));
  }
  let key_state = if app.api_key.is_some() { ("   API key ✓", theme.success) } else { ("   API key missing", theme.error) };
  spans.push(Span::styled(key_state.0, Style::default().fg(key_state.1)));
  frame.render_widget(Line::from(spans), area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  match app.mode {
    AppMode::Preview => render_preview(frame, app, area),
    _ if !app.records.is_empty() => render_table(frame, app, area),
    _ => render_welcome(frame, app.theme(), area),
  }
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("◆  ytreach", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Views, subscribers and diffusion rate for YouTube videos.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled(
      "Paste a video or channel URL (Tab switches to keyword search) and press Enter.",
      Style::default().fg(theme.muted),
    )),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(rounded_block(theme));
  frame.render_widget(paragraph, area);
}

fn header_cell(app: &App, key: SortKey, index: usize) -> Cell<'static> {
  let theme = app.theme();
  let arrow = app.sort.filter(|s| s.key == key).map(|s| format!(" {}", s.direction.arrow())).unwrap_or_default();
  Cell::from(format!("{} {}{}", index + 1, key.label(), arrow))
    .style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
}

fn render_table(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let header = Row::new(SortKey::ALL.iter().enumerate().map(|(i, key)| header_cell(app, *key, i)));

  let rows: Vec<Row> = app
    .records
    .iter()
    .enumerate()
    .map(|(i, r)| {
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      Row::new(vec![
        Cell::from(r.title.clone()),
        Cell::from(published_label(r)),
        Cell::from(Line::from(group_digits(r.view_count)).alignment(Alignment::Right)),
        Cell::from(Line::from(group_digits(r.subscriber_count)).alignment(Alignment::Right)),
        Cell::from(Line::from(format!("{:.2}", r.diffusion_rate())).alignment(Alignment::Right)),
      ])
      .style(Style::default().fg(theme.fg).bg(bg))
    })
    .collect();

  let title = match &app.report_label {
    Some(label) => format!(" {} videos · {} ", app.records.len(), truncate_str(label, 60)),
    None => format!(" {} videos ", app.records.len()),
  };

  let table = Table::new(
    rows,
    [Constraint::Min(20), Constraint::Length(12), Constraint::Length(14), Constraint::Length(14), Constraint::Length(12)],
  )
  .header(header.bottom_margin(1))
  .column_spacing(2)
  .block(rounded_block(theme).title(title).title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
  .highlight_symbol("▶ ")
  .row_highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_preview(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let [mut thumb_area, info_area] =
    Layout::horizontal([Constraint::Percentage(64), Constraint::Percentage(36)]).areas(area);

  // Keep roughly 16:9 in cells (cells are about twice as tall as wide).
  thumb_area = Rect { y: thumb_area.y + 1, height: thumb_area.height.saturating_sub(2), ..thumb_area };
  let ideal_h = (thumb_area.width as f32 * 9.0 / 32.0).round() as u16;
  if ideal_h < thumb_area.height {
    thumb_area.y += (thumb_area.height - ideal_h) / 2;
    thumb_area.height = ideal_h;
  }

  if let Some((ref video_id, ref image)) = app.preview {
    if app.display_mode == DisplayMode::Kitty {
      app.gfx.thumb_area = Some(thumb_area);
    } else {
      let stale = app.gfx.fitted.as_ref().is_none_or(|(id, a, _)| id != video_id || *a != thumb_area);
      if stale {
        app.gfx.fitted = Some((video_id.clone(), thumb_area, fit_to_area(image, thumb_area, app.display_mode)));
      }
      if let Some((_, _, ref fitted)) = app.gfx.fitted {
        frame.render_widget(ThumbnailWidget { image: fitted, display_mode: app.display_mode }, thumb_area);
      }
    }
  }

  let info_title = Line::from(vec![
    Span::styled(" Thumbnail ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(format!("[{}] ", app.display_mode.label()), Style::default().fg(theme.muted)),
  ]);
  let block = rounded_block(theme).title(info_title).padding(Padding::horizontal(1));

  let Some(record) = app.selected_record() else {
    frame.render_widget(block, info_area);
    return;
  };
  let inner_w = info_area.width.saturating_sub(4) as usize;
  let field = |label: &'static str, value: String| {
    Line::from(vec![
      Span::styled(format!("{:<12}", label), Style::default().fg(theme.muted)),
      Span::styled(value, Style::default().fg(theme.fg)),
    ])
  };
  let lines = vec![
    Line::from(""),
    Line::from(Span::styled(truncate_str(&record.title, inner_w), Style::default().fg(theme.fg).bold())),
    Line::from(""),
    field("Published", published_label(record)),
    field("Views", group_digits(record.view_count)),
    field("Subscribers", group_digits(record.subscriber_count)),
    field("Diffusion", format!("{:.2}", record.diffusion_rate())),
    Line::from(""),
    Line::from(Span::styled(
      truncate_str(&record.video_url, inner_w),
      Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
    )),
    Line::from(Span::styled(truncate_str(&record.thumbnail_url, inner_w), Style::default().fg(theme.muted))),
  ];
  frame.render_widget(Paragraph::new(lines).block(block), info_area);
}

fn render_history(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let [popup] = Layout::horizontal([Constraint::Percentage(70)]).flex(Flex::Center).areas(area);
  let height = (app.history.entries().len() as u16 + 2).min(area.height);
  let [popup] = Layout::vertical([Constraint::Length(height)]).flex(Flex::Center).areas(popup);

  let inner_w = popup.width.saturating_sub(4) as usize;
  let items: Vec<ListItem> = app
    .history
    .entries()
    .iter()
    .map(|url| ListItem::new(truncate_str(url, inner_w)).fg(theme.fg))
    .collect();
  let list = List::new(items)
    .block(
      rounded_block(theme)
        .title(" Recent URLs ")
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
        .style(Style::default().bg(theme.bg)),
    )
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg));

  frame.render_widget(Clear, popup);
  frame.render_stateful_widget(list, popup, &mut app.history_state);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(toast) = &app.toast {
    match toast.kind {
      ToastKind::Error => (format!(" ⚠  {}", toast.text), Style::default().fg(theme.error)),
      ToastKind::Success => (format!(" ✓ {}", toast.text), Style::default().fg(theme.success)),
      ToastKind::Info => (format!(" ℹ {}", toast.text), Style::default().fg(theme.status)),
    }
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Input;
  let border_color = if focused { theme.accent } else { theme.border };
  let title = match (app.field, app.search_mode) {
    (InputField::ApiKey, _) => " YouTube Data API key ".to_string(),
    (InputField::Query, SearchMode::Url) => " Video or channel URL ".to_string(),
    (InputField::Query, SearchMode::Keyword) => " Search keywords ".to_string(),
  };
  let block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;

  if app.field == InputField::ApiKey {
    // Masked: show only the last four characters.
    let total = app.api_key_input.chars().count();
    let masked: String = app.api_key_input.chars().enumerate().map(|(i, c)| if i + 4 < total { '•' } else { c }).collect();
    let visible = truncate_str(&masked, inner_w);
    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(block), area);
    if focused {
      let col = app.api_key_cursor.min(inner_w.saturating_sub(1)) as u16;
      frame.set_cursor_position((area.x + 2 + col, area.y + 1));
    }
    return;
  }

  let cursor_col = display_width(&app.input, app.cursor_position);
  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  frame.render_widget(Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(block), area);

  if focused {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(app.input_scroll).min(inner_w) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = match (app.mode, app.field) {
    (AppMode::Input, InputField::ApiKey) => vec![("Enter", "Save key"), ("Esc", "Cancel")],
    (AppMode::Input, InputField::Query) => {
      let fetch_label = if app.is_fetching() { "Fetching…" } else { "Fetch" };
      let mut k = vec![("Enter", fetch_label), ("Tab", "Mode"), ("PgUp/PgDn", "Count"), ("^k", "API key"), ("^r", "History")];
      if !app.records.is_empty() {
        k.push(("↓", "Results"));
      }
      k.push(("^t", "Theme"));
      k
    }
    (AppMode::Results, _) => vec![
      ("j/k", "Move"),
      ("1-5", "Sort"),
      ("Enter", "Thumbnail"),
      ("d", "Download"),
      ("c", "Copy URL"),
      ("e", "CSV"),
      ("o", "Open"),
      ("Esc", "Input"),
    ],
    (AppMode::Preview, _) => vec![("d", "Download"), ("c", "Copy URL"), ("o", "Open"), ("Esc", "Close")],
    (AppMode::History, _) => vec![("Enter", "Use"), ("x", "Clear all"), ("Esc", "Close")],
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw(" "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
