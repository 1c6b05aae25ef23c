mod app;
mod cli;
mod config;
mod constants;
mod display;
mod duration;
mod error;
mod export;
mod extract;
mod graphics;
mod history;
mod input;
mod logging;
mod metrics;
mod pipeline;
mod sort;
mod theme;
mod thumbnail;
mod ui;
mod youtube;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::time::Duration;
use tracing::info;

use app::App;
use config::Config;
use display::{CliDisplayMode, DisplayMode};
use graphics::{kitty_delete_all, kitty_render_image};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Thumbnail display mode: 'auto', 'kitty', 'direct', or 'ascii' (default: auto-detect)
  #[arg(short, long, default_value = "auto")]
  display_mode: CliDisplayMode,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch a report and print it instead of opening the TUI
  Fetch(cli::FetchArgs),
  /// Show recently searched URLs
  History {
    /// Forget all entries
    #[arg(long)]
    clear: bool,
  },
  /// Store the YouTube Data API key in the config file
  SetKey { key: String },
  /// Print a shell completion script
  Completions { shell: Shell },
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = logging::init();
  info!(version = env!("CARGO_PKG_VERSION"), "starting");

  match args.command {
    Some(Command::Fetch(fetch)) => return cli::run_fetch(fetch).await,
    Some(Command::History { clear }) => return cli::run_history(clear),
    Some(Command::SetKey { key }) => return cli::run_set_key(&key),
    Some(Command::Completions { shell }) => {
      clap_complete::generate(shell, &mut Args::command(), "ytreach", &mut std::io::stdout());
      return Ok(());
    }
    None => {}
  }

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, args.display_mode).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, display_mode: CliDisplayMode) -> Result<()> {
  let display_mode = display::resolve_display_mode(display_mode);
  let config_path = config::project_dirs().map(|d| d.config_dir().join("config.toml"));
  let config = config_path.as_deref().map(Config::load_from).unwrap_or_default();
  let mut app = App::new(display_mode, config, config_path);
  info!(display_mode = display_mode.label(), "tui: started");

  loop {
    app.check_pending();
    app.expire_toast();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if display_mode == DisplayMode::Kitty {
      sync_kitty(&mut app)?;
    }

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(&mut app, key),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  if display_mode == DisplayMode::Kitty {
    kitty_delete_all()?;
  }
  info!("tui: exited");
  Ok(())
}

/// Send the preview image once per (video, area); clear it when the pane closes.
fn sync_kitty(app: &mut App) -> Result<()> {
  match (app.gfx.thumb_area, &app.preview) {
    (Some(area), Some((video_id, image))) => {
      let key = (video_id.clone(), area);
      if app.gfx.last_sent.as_ref() != Some(&key) {
        kitty_delete_all()?;
        kitty_render_image(image, area)?;
        app.gfx.last_sent = Some(key);
      }
    }
    _ if app.gfx.last_sent.is_some() => {
      kitty_delete_all()?;
      app.gfx.last_sent = None;
    }
    _ => {}
  }
  Ok(())
}
