//! `circo`: the reconciliation and archival engine's server and command
//! line.
//!
//! Reads `circo.toml` (or the path given with `--config`) plus `CIRCO_*`
//! environment variables, opens the SQLite store and either serves the JSON
//! API or runs one operation against the store.
//!
//! # Token hash generation
//!
//! To generate `api_token_sha256` for circo.toml:
//!
//! ```text
//! circo hash-token
//! ```

mod settings;

use std::{
  borrow::Cow,
  io::{self, BufRead, Write},
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::Utc;
use circo_api::auth;
use circo_core::{
  SchoolYear,
  config::DistrictConfig,
  store::{ArchiveStore, RecordStore},
  text::decode_export,
};
use circo_parse::{DocumentKind, ParseContext};
use circo_reconcile::{ArchiveBuilder, archive, import_batch};
use circo_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "School district reconciliation and archival engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "circo.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API.
  Serve,

  /// Import documents of one kind (identity, structure, assessment, roster).
  Import {
    kind:  String,
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },

  /// Build, inspect and delete yearly archives.
  Archive {
    #[command(subcommand)]
    action: ArchiveAction,
  },

  /// Print the SHA-256 of an API token entered on stdin and exit.
  HashToken,
}

#[derive(Subcommand)]
enum ArchiveAction {
  /// Archive the current records as `year` (default: the configured year).
  Create { year: Option<String> },
  /// Print a stored snapshot.
  Show {
    year:   String,
    /// Recompute the views from the raw section and compare.
    #[arg(long)]
    verify: bool,
  },
  Delete { year: String },
  List,
  /// Archive the current year, then advance the district to the next one.
  Roll,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  if let Command::HashToken = cli.command {
    let token = read_token()?;
    println!("{}", auth::hash_token(&token));
    return Ok(());
  }

  let mut config = settings::load(&cli.config, Utc::now().date_naive())?;
  let store = SqliteStore::open(&config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.store_path))?;

  // A rolled-over year in the store wins over the file.
  if let Some(state) = store
    .load_district_state()
    .await
    .context("failed to read district state")?
  {
    config.district = config.district.with_state(state);
  }
  tracing::debug!(year = %config.district.school_year, "district configuration loaded");

  match cli.command {
    Command::Serve => serve(store, config).await,
    Command::Import { kind, files } => import(&store, &config.district, &kind, &files).await,
    Command::Archive { action } => run_archive(&store, config.district, action).await,
    Command::HashToken => Ok(()),
  }
}

async fn serve(store: SqliteStore, config: ServerConfig) -> anyhow::Result<()> {
  let mut app = circo_api::api_router(Arc::new(store), config.district.clone());
  match config.api_token_sha256.as_deref() {
    Some(digest) => app = auth::require_token(app, digest),
    None => tracing::warn!("api_token_sha256 is not set; the API is open"),
  }
  let app = app.layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", config.host, config.port);
  tracing::info!(year = %config.district.school_year, "listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

async fn import(
  store: &SqliteStore,
  district: &DistrictConfig,
  kind: &str,
  files: &[PathBuf],
) -> anyhow::Result<()> {
  let kind = DocumentKind::from_name(kind)?;
  let mut documents = Vec::with_capacity(files.len());
  for path in files {
    let bytes = tokio::fs::read(path)
      .await
      .with_context(|| format!("failed to read {path:?}"))?;
    let text = decode_export(&bytes);
    if matches!(text, Cow::Owned(_)) {
      tracing::info!(?path, "not UTF-8, read as Windows-1252");
    }
    documents.push((source_id(path), text.into_owned()));
  }

  let ctx = ParseContext::new(Utc::now().date_naive(), district.classification.clone());
  let report = import_batch(store, kind, documents, &ctx).await?;
  print_json(&report)?;
  if !report.failed.is_empty() {
    anyhow::bail!("{} of {} documents rejected", report.failed.len(), files.len());
  }
  Ok(())
}

fn source_id(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

fn year(raw: &str) -> anyhow::Result<SchoolYear> {
  raw.parse().with_context(|| format!("invalid school year {raw:?}"))
}

async fn run_archive(
  store: &SqliteStore,
  mut district: DistrictConfig,
  action: ArchiveAction,
) -> anyhow::Result<()> {
  let builder = ArchiveBuilder::new();
  match action {
    ArchiveAction::Create { year: requested } => {
      if let Some(raw) = requested {
        district.school_year = year(&raw)?;
      }
      let snapshot = builder.build(store, &district, Utc::now()).await?;
      print_json(&snapshot.summary())
    }
    ArchiveAction::Show { year: raw, verify } => {
      let year = year(&raw)?;
      let snapshot = store
        .get_archive(year)
        .await?
        .with_context(|| format!("no archive for {year}"))?;
      if verify && !archive::verify(&snapshot) {
        anyhow::bail!("archive {year} does not match its raw section");
      }
      print_json(&snapshot)
    }
    ArchiveAction::Delete { year: raw } => {
      let year = year(&raw)?;
      if !store.delete_archive(year).await? {
        anyhow::bail!("no archive for {year}");
      }
      tracing::info!(%year, "archive deleted");
      Ok(())
    }
    ArchiveAction::List => print_json(&store.list_archives().await?),
    ArchiveAction::Roll => {
      let (snapshot, next) = builder.roll_over(store, &district, Utc::now()).await?;
      tracing::info!(year = %next.school_year, "now in school year");
      print_json(&snapshot.summary())
    }
  }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  let mut out = io::stdout().lock();
  serde_json::to_writer_pretty(&mut out, value)?;
  writeln!(out)?;
  Ok(())
}

/// Read a token from stdin.
fn read_token() -> anyhow::Result<String> {
  eprint!("Token: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let token = line.trim().to_string();
  anyhow::ensure!(!token.is_empty(), "empty token");
  Ok(token)
}
