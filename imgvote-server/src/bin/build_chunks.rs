//! One-time chunk partition job
//!
//! Shuffles every item of the configured voting mode and deals them into
//! near-equal chunks, in a single transaction.
//!
//! **Usage:**
//! ```bash
//! build-chunks [--chunks 10] [--force] [--seed <n>] [--database <file>] [--config <file>]
//! ```
//!
//! Refuses to run over an existing partition unless `--force` is given, and
//! `--force` is refused while any session still references a chunk.

use anyhow::{bail, Context, Result};
use clap::Parser;
use imgvote_common::config::{default_database_path, load_survey_config};
use imgvote_common::db::{catalog, init_database, partition};
use imgvote_common::Error;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::{error, info};

/// Chunk partition builder
#[derive(Parser, Debug)]
#[clap(name = "build-chunks")]
#[clap(about = "Partition the survey catalog into fixed chunks")]
struct Args {
    /// Number of chunks to build
    #[clap(long, default_value_t = partition::DEFAULT_CHUNK_COUNT)]
    chunks: usize,

    /// Replace an existing partition
    #[clap(long)]
    force: bool,

    /// Seed for a reproducible shuffle
    #[clap(long)]
    seed: Option<u64>,

    /// SQLite database file
    #[clap(long, env = "IMGVOTE_DATABASE")]
    database: Option<PathBuf>,

    /// Survey configuration file (TOML)
    #[clap(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    if args.chunks == 0 {
        bail!("--chunks must be at least 1");
    }

    let config = load_survey_config(args.config.as_deref()).context("Failed to load survey config")?;
    let db_path = args.database.unwrap_or_else(default_database_path);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    if args.force {
        match partition::clear_partition(&mut tx).await {
            Ok(_) => {}
            Err(Error::InvalidState(msg)) => {
                error!("Cannot replace partition: {}", msg);
                bail!("partition is in use");
            }
            Err(e) => return Err(e.into()),
        }
    } else if partition::chunk_count(&mut tx).await? > 0 {
        error!("Partition already exists; use --force to replace it");
        bail!("partition already exists");
    }

    let item_ids = catalog::all_item_ids(&mut tx, config.mode).await?;
    info!("Found {} {} ({} mode)", item_ids.len(), config.mode.item_table(), config.mode);

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let groups = partition::split_into_chunks(item_ids, args.chunks, &mut rng);
    if groups.len() < args.chunks && !groups.is_empty() {
        info!(
            "Only {} items available; building {} chunks instead of {}",
            groups.len(),
            groups.len(),
            args.chunks
        );
    }

    partition::write_partition(&mut tx, config.mode, &groups)
        .await
        .context("Failed to write partition")?;

    let report = partition::verify_partition(&mut tx, config.mode).await?;
    if !report.is_complete() {
        bail!(
            "partition covers {} of {} items; rolled back",
            report.assigned,
            report.items
        );
    }

    tx.commit().await?;

    info!(
        "✓ Built {} chunks over {} items (sizes {}-{})",
        report.chunks, report.items, report.smallest_chunk, report.largest_chunk
    );
    Ok(())
}
