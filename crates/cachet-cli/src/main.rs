//! Cachet CLI - encrypted offline mirror of your source trees
//!
//! Usage:
//!   cachet init           - Create the encrypted store
//!   cachet refresh        - Bring the mirror up to date
//!   cachet search <text>  - Case-insensitive search over cached content
//!   cachet cat <path>     - Print one cached file
//!   cachet watch          - Refresh on an interval until interrupted

mod prompt;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use cachet_core::{
    tasks, CacheContext, CacheError, CancellationToken, Config, CredentialSource,
    StaticCredentials,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::prompt::PromptCredentials;

#[derive(Parser)]
#[command(name = "cachet")]
#[command(author = "HeyBattle1")]
#[command(version)]
#[command(about = "Encrypted, incrementally refreshed mirror of your source trees", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the directory holding the store
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Source root to mirror; repeat for several. Replaces configured roots.
    #[arg(long = "root", global = true)]
    roots: Vec<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Passphrase for unattended use
    #[arg(long, env = "CACHET_PASSPHRASE", hide_env_values = true, hide = true)]
    passphrase: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the encrypted store
    Init,

    /// Sync the mirror with the configured roots
    Refresh {
        /// Also drop entries whose source file is gone
        #[arg(long)]
        prune: bool,
    },

    /// Drop entries whose source file is gone
    Prune,

    /// Remove every cached file
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show cache statistics
    Stats,

    /// List cached files
    List,

    /// Search cached content
    Search {
        /// Text to look for (case-insensitive)
        query: String,
    },

    /// Print a cached file
    Cat {
        /// Path relative to the first root, or absolute
        path: String,
    },

    /// Refresh on the configured interval until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let mut config = Config::discover(cli.config.as_deref())?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    if !cli.roots.is_empty() {
        config.roots = cli.roots;
    }
    match cli.command {
        Commands::Refresh { prune: true } => config.prune_on_refresh = true,
        Commands::Watch => config.auto_refresh = true,
        _ => {}
    }
    tracing::debug!(
        roots = config.roots.len(),
        store = %config.store_path().display(),
        "configuration loaded"
    );

    let ctx = Arc::new(CacheContext::new(config)?);
    for warning in ctx.setup_warnings() {
        eprintln!("warning: {warning}");
    }

    let credentials: Box<dyn CredentialSource> = match cli.passphrase {
        Some(passphrase) => Box::new(StaticCredentials::new(&passphrase)),
        None => Box::new(PromptCredentials),
    };

    let outcome = run(cli.command, &ctx, credentials.as_ref()).await;
    ctx.lock();
    outcome
}

async fn run(
    command: Commands,
    ctx: &Arc<CacheContext>,
    credentials: &dyn CredentialSource,
) -> anyhow::Result<()> {
    match command {
        Commands::Init => {
            if ctx.store_exists() {
                println!("Store already exists at {}", ctx.config().store_path().display());
                return Ok(());
            }
            ctx.initialize(credentials)?;
            println!("🔒 Created encrypted store at {}", ctx.config().store_path().display());
            println!("   Run `cachet refresh` to populate it.");
        }

        Commands::Refresh { .. } => {
            unlock(ctx, credentials)?;
            let cancel = cancel_on_ctrl_c();
            let report = tasks::spawn_refresh(ctx.clone(), cancel).await??;
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            if report.cancelled {
                println!("Refresh interrupted after {} files ({} updated)", report.total, report.updated);
            } else {
                println!(
                    "Refreshed {} files: {} updated, {} pruned",
                    report.total, report.updated, report.pruned
                );
            }
        }

        Commands::Prune => {
            unlock(ctx, credentials)?;
            let removed = ctx.prune()?;
            println!("Pruned {removed} entries");
        }

        Commands::Clear { yes } => {
            unlock(ctx, credentials)?;
            let confirmed = yes
                || Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("Remove every cached file?")
                    .default(false)
                    .interact()?;
            if confirmed {
                ctx.clear()?;
                println!("Cache cleared");
            }
        }

        Commands::Stats => {
            if ctx.store_exists() {
                unlock(ctx, credentials)?;
            }
            let stats = ctx.stats();
            let last_refresh = stats
                .last_refresh
                .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string());
            println!("Store:        {}", ctx.config().store_path().display());
            println!("State:        {}", if stats.locked { "locked" } else { "unlocked" });
            println!("Cached files: {}", stats.cached_files);
            println!("Total size:   {} bytes", stats.total_size);
            println!("Last refresh: {last_refresh}");
        }

        Commands::List => {
            unlock(ctx, credentials)?;
            for entry in ctx.list_entries()? {
                println!("{}", entry.display_path);
            }
        }

        Commands::Search { query } => {
            unlock(ctx, credentials)?;
            let found = tasks::spawn_search(ctx.clone(), query).await??;
            if found.is_empty() {
                println!("No matches");
            }
            for hit in found {
                println!("{}:{}: {}", hit.path, hit.line_number, hit.line_text);
            }
        }

        Commands::Cat { path } => {
            unlock(ctx, credentials)?;
            let Some(file) = ctx.fetch(&path)? else {
                bail!("{path} is not cached");
            };
            std::io::stdout()
                .write_all(&file.content)
                .context("writing to stdout")?;
        }

        Commands::Watch => {
            unlock(ctx, credentials)?;
            println!(
                "👁️  Refreshing every {}s, Ctrl-C to stop",
                ctx.config().auto_refresh_interval().as_secs()
            );
            tasks::run_auto_refresh(ctx.clone(), cancel_on_ctrl_c()).await?;
        }
    }

    Ok(())
}

fn unlock(ctx: &CacheContext, credentials: &dyn CredentialSource) -> anyhow::Result<()> {
    match ctx.unlock(credentials) {
        Err(CacheError::StoreMissing(path)) => {
            bail!("no store at {}; run `cachet init` first", path.display())
        }
        other => Ok(other?),
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}
