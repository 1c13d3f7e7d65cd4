//! eor-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `EOR_*` environment variables, opens the dashboard store and the
//! observation mirror, and serves the API.
//!
//! Maintenance subcommands act on the dashboard store directly:
//!
//! ```text
//! eor-server create-admin <username> <name> <email>
//! eor-server reset-password <username>
//! eor-server set-admin-level <username> <level>
//! ```
//!
//! Passwords are read from stdin.
//!
//! Batch jobs act on the observation mirror, the second one also on the
//! dashboard store:
//!
//! ```text
//! eor-server load-schedule <file>
//! eor-server collect-graph-data
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use eor_api::auth::hash_password;
use eor_core::{
  store::DashboardStore,
  user::{NewUser, UserDraft},
};
use chrono::Utc;
use eor_server::{AppState, ServerConfig, jobs};
use eor_store_sqlite::{SqliteObservationSource, SqliteStore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "EoR status server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve HTTP (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin.
  HashPassword,
  /// Create a user with admin rights.
  CreateAdmin {
    username: String,
    name:     String,
    email:    String,
  },
  /// Replace a user's password with one entered on stdin.
  ResetPassword { username: String },
  /// Set a user's admin level; 0 removes admin rights.
  SetAdminLevel { username: String, level: i32 },
  /// Load a schedule export into the observation mirror.
  LoadSchedule { file: PathBuf },
  /// Record one chart sample computed from the observation mirror.
  CollectGraphData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let command = cli.command.unwrap_or(Command::Serve);

  if let Command::HashPassword = command {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("EOR"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if let Command::LoadSchedule { file } = &command {
    let text = std::fs::read_to_string(file)
      .with_context(|| format!("failed to read {}", file.display()))?;
    let observations = open_observations(&server_cfg).await?;
    let load = jobs::load_schedule(&observations, &text).await?;
    tracing::info!(
      observations = load.observations,
      data_files = load.data_files,
      "schedule loaded"
    );
    return Ok(());
  }

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match command {
    Command::Serve => serve(store, server_cfg).await,
    Command::HashPassword | Command::LoadSchedule { .. } => Ok(()),
    Command::CollectGraphData => {
      let observations = open_observations(&server_cfg).await?;
      let point = jobs::collect_graph_point(&store, &observations, Utc::now()).await?;
      tracing::info!(
        id = point.id,
        hours_scheduled = point.hours_scheduled,
        hours_observed = point.hours_observed,
        hours_with_data = point.hours_with_data,
        "graph data recorded"
      );
      Ok(())
    }
    Command::CreateAdmin { username, name, email } => {
      let password = read_password()?;
      let (new_user, password) = UserDraft { username, name, email, password }.validate()?;
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      let user = store
        .create_user(NewUser { admin_level: 1, ..new_user }, hash)
        .await
        .context("failed to create admin")?;
      tracing::info!(id = user.id, username = %user.username, "admin created");
      Ok(())
    }
    Command::ResetPassword { username } => {
      let password = read_password()?;
      if password.is_empty() {
        anyhow::bail!("password must not be empty");
      }
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      store
        .set_password_hash(&username, hash)
        .await
        .with_context(|| format!("failed to reset password for {username:?}"))?;
      tracing::info!(%username, "password reset");
      Ok(())
    }
    Command::SetAdminLevel { username, level } => {
      let user = store
        .set_admin_level(&username, level)
        .await
        .with_context(|| format!("failed to set admin level for {username:?}"))?;
      tracing::info!(%username, admin_level = user.admin_level, "admin level set");
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  server_cfg.listing_offset()?;
  let observations = open_observations(&server_cfg).await?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(Arc::new(store), Arc::new(observations), server_cfg);
  let app = eor_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn open_observations(server_cfg: &ServerConfig) -> anyhow::Result<SqliteObservationSource> {
  let observation_path = expand_tilde(&server_cfg.observation_db_path);
  SqliteObservationSource::open(&observation_path, server_cfg.projects.clone())
    .await
    .with_context(|| format!("failed to open observation mirror at {observation_path:?}"))
}

/// Read a password as one line of stdin. The input is echoed like any other
/// line, so pipe it in when the terminal is shared.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
