//! `diarie-import`: load exported case records into the register.
//!
//! # Usage
//!
//! ```
//! diarie-import arende-1001.xml arende-1002.xml
//! diarie-import --dry-run --database /srv/diarie/diarie.db export/*.xml
//! ```
//!
//! Exits with status 1 if any file failed. Files whose case already exists
//! are reported as skipped and do not count as failures.

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::Parser;
use diarie_core::import::ImportMode;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "diarie-import", about = "Import exported case records")]
struct Args {
  /// XML export files, one case each.
  #[arg(required = true, value_name = "FILE")]
  files: Vec<PathBuf>,

  /// Reconcile and report without writing anything. The database must
  /// already exist at the current schema. The whole batch is checked
  /// together, so duplicates across files are reported as skipped.
  #[arg(long)]
  dry_run: bool,

  /// SQLite database; overrides `database_path` from the config file.
  #[arg(long, env = "DIARIE_DATABASE_PATH", value_name = "PATH")]
  database: Option<PathBuf>,

  /// The server's TOML config file, read for `database_path`.
  #[arg(short, long, default_value = "config.toml", value_name = "FILE")]
  config: PathBuf,
}

/// The part of the server configuration the importer needs.
#[derive(Deserialize)]
struct ImportConfig {
  database_path: PathBuf,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let database = match args.database {
    Some(path) => path,
    None => {
      let cfg: ImportConfig = config::Config::builder()
        .set_default("database_path", "diarie.db")?
        .add_source(config::File::from(args.config.clone()).required(false))
        .build()
        .with_context(|| format!("reading config file {}", args.config.display()))?
        .try_deserialize()
        .context("parsing config file")?;
      cfg.database_path
    }
  };

  let mode = if args.dry_run { ImportMode::DryRun } else { ImportMode::Commit };
  let store = diarie_import::open_store(&database, mode)
    .await
    .with_context(|| format!("failed to open database at {}", database.display()))?;

  let summary = diarie_import::import_files(&store, &args.files, mode)
    .await
    .context("import batch failed")?;

  for report in &summary.files {
    println!("{}", report.line());
  }
  let verb = if args.dry_run { "would import" } else { "imported" };
  println!(
    "{} {verb}, {} skipped, {} failed",
    summary.imported, summary.skipped, summary.failed
  );

  Ok(if summary.has_failures() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
