//! # Gateway CLI (`gateway`)
//!
//! ## Usage
//!
//! ```bash
//! gateway --config ./config/gateway.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gateway init` | Create the SQLite database and run schema migrations |
//! | `gateway sync <file> --platform <slug>` | Sync one Markdown file into the docs site |
//! | `gateway serve` | Start the HTTP server |
//! | `gateway serve --ephemeral` | Start the HTTP server on an in-memory store |
//!
//! Logs go to stderr; set `RUST_LOG` to change the level (default `info`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use content_gateway::app::Gateway;
use content_gateway::capabilities::CapabilityRegistry;
use content_gateway::config::{load_config, Config};
use content_gateway::migrate;
use content_gateway::models::DocumentRecord;
use content_gateway::server;
use content_gateway::slug::slugify;
use content_gateway::tenant::SiteContext;

/// Content Gateway CLI: documentation sync, OAuth config, contact intake and
/// capability dispatch for a multi-tenant content network.
#[derive(Parser)]
#[command(name = "gateway", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/gateway.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Sync one local Markdown file as the designated docs site.
    ///
    /// Unchanged files are skipped unless `--force` is given.
    Sync {
        /// Markdown file to sync.
        path: PathBuf,

        /// Platform classification slug (e.g. `ios`, `live-music`).
        #[arg(long)]
        platform: String,

        /// External key. Defaults to the path as given.
        #[arg(long)]
        source_file: Option<String>,

        /// Title. Defaults to the first `# ` heading, then the file stem.
        #[arg(long)]
        title: Option<String>,

        /// Stored slug. Defaults to the slugified file stem.
        #[arg(long)]
        slug: Option<String>,

        #[arg(long, default_value = "")]
        excerpt: String,

        /// Write even if the content fingerprint is unchanged.
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP server.
    Serve {
        /// Keep everything in memory instead of opening `[db].path`.
        #[arg(long)]
        ephemeral: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("Database initialized at {}", config.db.path.display());
        }
        Commands::Sync {
            path,
            platform,
            source_file,
            title,
            slug,
            excerpt,
            force,
        } => {
            let record = read_record(&path, platform, source_file, title, slug, excerpt, force)?;
            sync_file(&config, record).await?;
        }
        Commands::Serve { ephemeral: false } => {
            server::run_server(&config).await?;
        }
        Commands::Serve { ephemeral: true } => {
            let gateway = Gateway::ephemeral(&config, CapabilityRegistry::new())?;
            server::serve(gateway).await?;
        }
    }

    Ok(())
}

fn read_record(
    path: &Path,
    platform_slug: String,
    source_file: Option<String>,
    title: Option<String>,
    slug: Option<String>,
    excerpt: String,
    force: bool,
) -> Result<DocumentRecord> {
    let content_raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let metadata = std::fs::metadata(path)?;
    let modified: DateTime<Utc> = metadata.modified()?.into();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let title = title
        .or_else(|| first_h1(&content_raw))
        .unwrap_or_else(|| stem.clone());

    Ok(DocumentRecord {
        source_file: source_file.unwrap_or_else(|| path.display().to_string()),
        title,
        content_raw,
        platform_slug,
        filesize: metadata.len() as i64,
        timestamp: modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        force,
        slug: slug.unwrap_or_else(|| slugify(&stem)),
        excerpt,
    })
}

fn first_h1(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

async fn sync_file(config: &Config, record: DocumentRecord) -> Result<()> {
    let gateway = Gateway::connect(config, CapabilityRegistry::new()).await?;
    let ctx = SiteContext::docs_site(config);
    let source_file = record.source_file.clone();

    let result = gateway.controller.sync(&ctx, record).await;
    gateway.close().await;
    let outcome = result.with_context(|| format!("sync of {} failed", source_file))?;

    println!("sync {}", source_file);
    println!("  action: {}", outcome.action);
    println!("  id: {}", outcome.id);
    println!("ok");
    Ok(())
}
