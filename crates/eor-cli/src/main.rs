//! `eor`: terminal dashboard for the EoR status service.
//!
//! # Usage
//!
//! ```
//! eor --url http://localhost:5000 --user alice --password secret
//! eor --config ~/.config/eor/config.toml
//! eor post-log --tag fine --tag "no data" "Quiet night, nothing archived"
//! eor --user admin add-user carol "Carol C" carol@example.org --new-password pw
//! eor update-profile --email alice@example.org
//! ```
//!
//! `--new-password` for `add-user` and `update-profile` falls back to
//! `EOR_NEW_PASSWORD`, which keeps it out of shell history.

mod app;
mod client;
mod form;
mod sequence;
mod ui;

use std::{
  io,
  time::{Duration, Instant},
};

use anyhow::{Context, Result};
use app::App;
use chrono::Utc;
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use eor_core::{
  tag::TagMask,
  user::{ProfileUpdate, UserDraft},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use sequence::View;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const CLOCK_INTERVAL: Duration = Duration::from_secs(1);

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "eor", about = "Terminal dashboard for the EoR status service")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<std::path::PathBuf>,

  /// Base URL of the eor server (default: http://localhost:5000).
  #[arg(long, env = "EOR_URL", global = true)]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "EOR_USER", global = true)]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "EOR_PASSWORD", global = true)]
  password: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create an observation log entry and exit.
  PostLog {
    /// Night the entry is about, `YYYY-MM-DD` (default: today, UTC).
    #[arg(long)]
    date: Option<String>,

    /// A tag name; repeat for more than one.
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    note: String,
  },
  /// Create a user (admin only) and exit.
  AddUser {
    username: String,
    name:     String,
    email:    String,
    #[arg(long, env = "EOR_NEW_PASSWORD", hide_env_values = true)]
    new_password: String,
  },
  /// Change the signed-in user's name, email, or password and exit.
  UpdateProfile {
    #[arg(long)]
    name:     Option<String>,
    #[arg(long)]
    email:    Option<String>,
    #[arg(long, env = "EOR_NEW_PASSWORD", hide_env_values = true)]
    new_password: Option<String>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags and environment override the config file, which overrides
  // defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:5000".to_string()),
    username: args
      .user
      .or_else(|| (!file_cfg.username.is_empty()).then(|| file_cfg.username.clone()))
      .unwrap_or_default(),
    password: args
      .password
      .or_else(|| (!file_cfg.password.is_empty()).then(|| file_cfg.password.clone()))
      .unwrap_or_default(),
  };

  let client = ApiClient::new(api_config)?;

  match args.command {
    Some(Command::PostLog { date, tags, note }) => post_log(&client, date, &tags, &note).await,
    Some(Command::AddUser { username, name, email, new_password }) => {
      init_stderr_logging();
      let draft = UserDraft { username, name, email, password: new_password };
      draft.clone().validate()?;
      let user = client.create_user(&draft).await?;
      tracing::info!(id = user.id, "user created");
      println!("user {} ({}) created", user.id, user.username);
      Ok(())
    }
    Some(Command::UpdateProfile { name, email, new_password }) => {
      init_stderr_logging();
      let update = ProfileUpdate { name, email, password: new_password }.normalized()?;
      let user = client.update_current_user(&update).await?;
      println!("{} <{}> saved", user.name, user.email);
      Ok(())
    }
    None => run_dashboard(client).await,
  }
}

/// Log to stderr for the one-shot subcommands; the dashboard owns the
/// terminal and does not log.
fn init_stderr_logging() {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();
}

// ─── post-log ─────────────────────────────────────────────────────────────────

async fn post_log(
  client: &ApiClient,
  date: Option<String>,
  tags: &[String],
  note: &str,
) -> Result<()> {
  init_stderr_logging();

  let tags = TagMask::from_names(tags)?;
  let date = date.unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
  let log = client.create_log(&date, note, tags).await?;
  tracing::info!(id = log.id, "observation log created");
  println!(
    "log {} for {} by {} [{}]",
    log.id,
    log.observed_date,
    log.author_user_name,
    log.tags.names().join(", ")
  );
  Ok(())
}

// ─── Dashboard ────────────────────────────────────────────────────────────────

async fn run_dashboard(client: ApiClient) -> Result<()> {
  let (mut app, rx) = App::new(client, Utc::now());
  app.refresh(View::Account);
  app.refresh(View::Status);

  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Run the event loop; restore terminal even on error.
  let run_result = run_event_loop(&mut terminal, &mut app, rx).await;

  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
  mut rx: mpsc::UnboundedReceiver<app::Fetched>,
) -> Result<()> {
  let mut last_tick = Instant::now();

  loop {
    while let Ok(fetched) = rx.try_recv() {
      app.apply(fetched);
    }

    if last_tick.elapsed() >= CLOCK_INTERVAL {
      app.tick(Utc::now());
      last_tick = Instant::now();
    }

    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key)
    {
      break;
    }
  }

  Ok(())
}
