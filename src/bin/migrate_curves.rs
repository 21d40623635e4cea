//! Bulk Curve Migration CLI
//!
//! Rebuilds baseline oil decline curves from a historical cut-date export:
//! loads the records and production series, runs the anchor → segment → fit
//! pipeline per well in parallel, and upserts one "Curva Base Oil" curve per
//! well into the curve database.
//!
//! Usage:
//!   cargo run --bin migrate-curves -- --records df_final.json --series wells_prod.json --project Campo
//!   cargo run --bin migrate-curves -- --records df_final.json --curve-db data/curves

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use declina::config::{self, AnalysisConfig};
use declina::engine::{CurveMigrator, MigrationRecord, MigrationStatus};
use declina::storage::{CurveStore, ProductionStore};
use declina::types::ProductionSeries;

/// Bulk decline curve migration from a historical cut-date export.
#[derive(Parser)]
#[command(name = "migrate-curves")]
struct Args {
    /// Path to the JSON array of migration records (well + cut dates).
    #[arg(long)]
    records: PathBuf,

    /// Optional JSON array of production series to load into the
    /// production database before migrating.
    #[arg(long)]
    series: Option<PathBuf>,

    /// Project name the loaded series are stored under.
    #[arg(long, default_value = "default")]
    project: String,

    /// Curve database path.
    #[arg(long, default_value = "data/curves")]
    curve_db: PathBuf,

    /// Production database path.
    #[arg(long, default_value = "data/production")]
    production_db: PathBuf,

    /// User id recorded on every migrated curve.
    #[arg(long, default_value_t = 1)]
    user_id: i64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    config::init(AnalysisConfig::load());
    let args = Args::parse();

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  DECLINA  ·  Bulk Curve Migration                        ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    println!("[1/4] Loading migration records...");
    let raw = fs::read_to_string(&args.records)
        .with_context(|| format!("reading records file {}", args.records.display()))?;
    let records: Vec<MigrationRecord> =
        serde_json::from_str(&raw).context("parsing migration records JSON")?;
    println!("  ✓ {} records from {}", records.len(), args.records.display());

    println!("[2/4] Opening databases...");
    let production = ProductionStore::open(&args.production_db).with_context(|| {
        format!(
            "opening production database {}",
            args.production_db.display()
        )
    })?;
    let curves = CurveStore::open(&args.curve_db)
        .with_context(|| format!("opening curve database {}", args.curve_db.display()))?;

    if let Some(path) = &args.series {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading series file {}", path.display()))?;
        let series: Vec<ProductionSeries> =
            serde_json::from_str(&raw).context("parsing production series JSON")?;
        for entry in &series {
            production.put_series(&args.project, entry)?;
        }
        println!(
            "  ✓ {} series stored under project \"{}\"",
            series.len(),
            args.project
        );
    }
    println!(
        "  {} series available, {} curves already saved",
        production.count(),
        curves.count()
    );

    println!("[3/4] Fitting curves...");
    let migrator = CurveMigrator::new(args.user_id);
    let report = migrator.run(&records, &production, &curves);
    curves.flush()?;
    production.flush()?;

    println!("[4/4] Migration summary:");
    println!("  ✓ Migrated: {}", report.migrated);
    println!("  ⚠ Skipped:  {}", report.skipped);
    println!("  ✗ Failed:   {}", report.failed);
    for outcome in &report.outcomes {
        match &outcome.status {
            MigrationStatus::Skipped { reason } => {
                println!("    ⚠ {:<20} {}", outcome.well, reason)
            }
            MigrationStatus::Failed { reason } => {
                println!("    ✗ {:<20} {}", outcome.well, reason)
            }
            MigrationStatus::Migrated { .. } => {}
        }
    }
    println!("  Total curves in store: {}", curves.count());

    Ok(())
}
