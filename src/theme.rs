use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub success: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub const THEMES: [Theme; 3] = [
  Theme {
    name: "Midnight",
    bg: Color::Rgb(22, 24, 33),
    fg: Color::Rgb(220, 223, 228),
    accent: Color::Rgb(255, 94, 87),
    muted: Color::Rgb(120, 126, 140),
    border: Color::Rgb(60, 64, 78),
    highlight_fg: Color::Rgb(22, 24, 33),
    highlight_bg: Color::Rgb(255, 94, 87),
    stripe_bg: Color::Rgb(28, 30, 41),
    status: Color::Rgb(129, 199, 245),
    success: Color::Rgb(152, 214, 130),
    error: Color::Rgb(255, 121, 121),
    key_fg: Color::Rgb(22, 24, 33),
    key_bg: Color::Rgb(120, 126, 140),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 248, 242),
    fg: Color::Rgb(40, 40, 40),
    accent: Color::Rgb(204, 0, 0),
    muted: Color::Rgb(130, 130, 130),
    border: Color::Rgb(200, 196, 186),
    highlight_fg: Color::Rgb(250, 248, 242),
    highlight_bg: Color::Rgb(204, 0, 0),
    stripe_bg: Color::Rgb(241, 238, 230),
    status: Color::Rgb(30, 100, 170),
    success: Color::Rgb(40, 130, 60),
    error: Color::Rgb(180, 30, 30),
    key_fg: Color::Rgb(250, 248, 242),
    key_bg: Color::Rgb(130, 130, 130),
  },
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::White,
    accent: Color::Red,
    muted: Color::DarkGray,
    border: Color::DarkGray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Red,
    stripe_bg: Color::Reset,
    status: Color::Cyan,
    success: Color::Green,
    error: Color::LightRed,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name == n)).unwrap_or(0)
}
