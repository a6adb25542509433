mod app;
mod catalog;
mod config;
mod constants;
mod display;
mod filter;
mod graphics;
mod grid;
mod input;
mod likes;
mod player;
mod preview;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::{App, AppSettings};
use config::Config;
use constants::constants;
use display::CliDisplayMode;
use likes::{FileStorage, LikeStorage, LikeStore, MemoryStorage};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Base URL of the catalog API (the catalog is read from <BASE>/api/shorts)
  #[arg(short, long)]
  api_base: Option<String>,

  /// Where liked shorts are stored (default: likes.json in the user data dir)
  #[arg(long)]
  likes_file: Option<PathBuf>,

  /// Poster display mode: 'auto', 'direct', or 'ascii' (default: auto-detect)
  #[arg(short, long, default_value = "auto")]
  display_mode: CliDisplayMode,

  /// Write logs here (default: shortflix.log in the user data dir). Filter with RUST_LOG.
  #[arg(long)]
  log_file: Option<PathBuf>,
}

// --- Logging ---

fn default_log_path() -> Option<PathBuf> {
  ProjectDirs::from("", "", "shortflix").map(|dirs| dirs.data_dir().join(&constants().log_file))
}

/// Log to a file; stdout belongs to the TUI.
fn init_logging(path: Option<PathBuf>) -> Result<Option<WorkerGuard>> {
  let Some(path) = path.or_else(default_log_path) else {
    return Ok(None);
  };
  let dir = path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
  let file_name = path.file_name().context("Log file path has no file name")?;
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, file_name));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shortflix=info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Ok(Some(guard))
}

/// Logging is best effort: a failure is reported on stderr and the app runs without it.
fn setup_logging(path: Option<PathBuf>) -> Option<WorkerGuard> {
  init_logging(path).unwrap_or_else(|e| {
    eprintln!("shortflix: logging disabled: {:#}", e);
    None
  })
}

// --- Startup ---

fn open_like_store(path: Option<PathBuf>) -> LikeStore {
  let storage: Box<dyn LikeStorage> = match path.or_else(FileStorage::default_path) {
    Some(path) => {
      info!(path = %path.display(), "likes: using file storage");
      Box::new(FileStorage::new(path))
    }
    None => {
      warn!("likes: no data directory, likes last for this session only");
      Box::new(MemoryStorage::default())
    }
  };
  LikeStore::rehydrate(storage, &constants().likes_key)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = setup_logging(args.log_file.clone());

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, args).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, args: Args) -> Result<()> {
  let config = Config::load();
  let api_base = args.api_base.or(config.api_base).unwrap_or_else(|| constants().default_api_base.clone());
  let theme_index = config.theme_name.as_deref().and_then(theme::theme_index).unwrap_or(0);
  let display_mode = display::resolve_display_mode(args.display_mode);
  info!(api_base = %api_base, display_mode = display_mode.label(), "starting");

  let mut app = App::new(AppSettings { api_base, theme_index, display_mode, likes: open_like_store(args.likes_file) });
  app.start_loading();

  loop {
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key).await;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  app.shutdown().await?;
  info!("exiting");
  Ok(())
}
