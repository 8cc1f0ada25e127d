//! catsync - reconcile watch/read progress between two catalog services
//!
//! Subcommands:
//! - `sync`: run a pass over two exported list snapshots
//! - `match`: show which title tier matches two titles
//! - `score`: convert a score between formats
//! - `map` / `ignore`: edit the manual mapping and ignore files

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use catsync_common::config::{load_toml_config, resolve_config_path, TomlConfig};
use catsync_common::logging::init_tracing;
use catsync_engine::services::response_cache::ResponseCache;
use catsync_engine::services::score_normalizer::{from_canonical, to_canonical, ScoreFormat};
use catsync_engine::services::title_matcher::{match_titles, normalize};
use catsync_engine::services::{
    Collaborators, IgnoreRegistry, MappingStore, SnapshotProvider, SyncPass, SyncSummary,
};
use catsync_engine::{CatalogKind, EntryId, Service, SyncConfig, SyncDirection};

/// Command-line arguments for catsync
#[derive(Parser, Debug)]
#[command(name = "catsync")]
#[command(about = "Keep watch/read progress consistent between two catalog services")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile two exported list snapshots
    Sync {
        /// Service A snapshot (JSON)
        #[arg(long)]
        source_a: PathBuf,

        /// Service B snapshot (JSON)
        #[arg(long)]
        source_b: PathBuf,

        /// Treat service B as the source of truth
        #[arg(long)]
        reverse: bool,

        /// Update even entries that already look synchronized
        #[arg(long)]
        force: bool,

        /// Compute updates without applying them
        #[arg(long)]
        dry_run: bool,

        #[arg(short, long)]
        verbose: bool,

        /// Save the updated target snapshot
        #[arg(long)]
        write_back: bool,
    },

    /// Show whether two titles match and at which tier
    Match { title_a: String, title_b: String },

    /// Convert a score between formats
    Score {
        raw: f64,
        #[arg(long)]
        from: ScoreFormat,
        #[arg(long)]
        to: ScoreFormat,
    },

    /// Add or replace a manual mapping
    Map {
        kind: CatalogKind,
        a_id: i64,
        b_id: i64,
        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Exclude an entry from reconciliation
    Ignore {
        kind: CatalogKind,
        /// Service the id belongs to
        #[arg(long, requires = "id")]
        service: Option<Service>,
        #[arg(long, requires = "service")]
        id: Option<i64>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        reason: String,
    },
}

fn load_config(cli_path: Option<&std::path::Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_path) {
        Some(path) => load_toml_config(&path).context("Failed to load configuration"),
        None => Ok(TomlConfig::default()),
    }
}

fn parse_id(raw: i64) -> Result<EntryId> {
    EntryId::new(raw).with_context(|| format!("{} is not a valid entry id", raw))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let toml = load_config(args.config.as_deref())?;

    let verbose = matches!(args.command, Command::Sync { verbose: true, .. }) || toml.sync.verbose;
    init_tracing(&toml.logging, verbose).context("Failed to initialize logging")?;

    match args.command {
        Command::Sync {
            source_a,
            source_b,
            reverse,
            force,
            dry_run,
            verbose,
            write_back,
        } => {
            let mut config = SyncConfig::from_toml(&toml);
            if reverse {
                config.direction = SyncDirection::Reverse;
            }
            config.force |= force;
            config.dry_run |= dry_run;
            config.verbose |= verbose;
            run_sync(&config, source_a, source_b, write_back).await
        }
        Command::Match { title_a, title_b } => {
            println!("normalized: {:?} / {:?}", normalize(&title_a), normalize(&title_b));
            match match_titles(&title_a, &title_b) {
                Some((tier, similarity)) => println!("match: {} ({:.1})", tier, similarity),
                None => println!("no match"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Score { raw, from, to } => {
            let canonical = to_canonical(raw, from);
            println!(
                "{} {} = {}/10 = {} {}",
                raw,
                from,
                canonical,
                from_canonical(canonical, to),
                to
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Map {
            kind,
            a_id,
            b_id,
            comment,
        } => {
            let config = SyncConfig::from_toml(&toml);
            let path = &config.paths.mapping_file;
            let mut store = MappingStore::load(path)?;
            let replaced = store.add_or_update(kind, parse_id(a_id)?, parse_id(b_id)?, comment);
            store.save(path)?;
            println!(
                "{} mapping {} a:{} -> b:{} in {}",
                if replaced { "Replaced" } else { "Added" },
                kind,
                a_id,
                b_id,
                path.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Ignore {
            kind,
            service,
            id,
            title,
            reason,
        } => {
            let config = SyncConfig::from_toml(&toml);
            let path = &config.paths.ignore_file;
            let mut registry = IgnoreRegistry::load(path)?;
            let id = match (service, id) {
                (Some(service), Some(id)) => Some((service, parse_id(id)?)),
                _ => None,
            };
            registry.add_ignore(kind, id, title.as_deref(), reason)?;
            registry.save(path)?;
            println!("Ignore rule added to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_sync(
    config: &SyncConfig,
    source_a: PathBuf,
    source_b: PathBuf,
    write_back: bool,
) -> Result<ExitCode> {
    let mappings = MappingStore::load(&config.paths.mapping_file)?;
    let ignore = IgnoreRegistry::load(&config.paths.ignore_file)?;
    info!(mappings = mappings.len(), ignore_rules = ignore.len(), "Loaded stores");

    let service_a = SnapshotProvider::load(Service::A, &source_a)
        .with_context(|| format!("Failed to read {}", source_a.display()))?;
    let service_b = SnapshotProvider::load(Service::B, &source_b)
        .with_context(|| format!("Failed to read {}", source_b.display()))?;
    let cache = Arc::new(ResponseCache::load(&config.paths.cache_file, config.cache_max_age)?);

    let mut collaborators = Collaborators::new(&service_a, &service_b, &mappings, &ignore);
    collaborators.favorites_a = Some(&service_a);
    collaborators.favorites_b = Some(&service_b);
    collaborators.cache = Some(Arc::clone(&cache));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling pass");
            ctrl_c.cancel();
        }
    });

    let report = SyncPass::run(config, &collaborators, &cancel).await?;

    let summary = SyncSummary::from_report(&report, config.error_report_limit);
    print!("{}", summary);

    let ledger = report.ledger();
    if !ledger.is_empty() {
        let path = ledger.write_snapshot(&config.paths.ledger_dir)?;
        let per_kind: Vec<String> = config
            .kinds
            .iter()
            .map(|&kind| format!("{}: {}", kind, ledger.count_for(kind)))
            .collect();
        println!(
            "Unmapped entries written to {} ({})",
            path.display(),
            per_kind.join(", ")
        );
    }

    cache.persist(&config.paths.cache_file).await?;

    if write_back && !config.dry_run {
        match config.direction.target() {
            Service::A => service_a.save().await?,
            Service::B => service_b.save().await?,
        }
    }

    Ok(if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
