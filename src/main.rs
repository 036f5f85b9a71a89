use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use core_types::{RawMarketRecord, RentalIndexRecord, SupplyRecord};
use datastore::{connect, run_migrations, MarketStore, PgStore};
use engine::{DailyDigest, EventFeed, PipelineRunner};
use normalizer::StaticGeoProvider;
use tracing_subscriber::EnvFilter;

/// The main entry point for the Skyline market analytics application.
#[tokio::main]
async fn main() {
    // Load environment variables from .env file, if present.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Initialize the database connection and run migrations
    let db_pool = connect().await.expect("Failed to connect to the database");
    run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Parse command-line arguments
    let cli = Cli::parse();

    let store: Arc<dyn MarketStore> = Arc::new(PgStore::new(db_pool));
    let config = configuration::load_config().expect("Failed to load configuration");
    let runner = PipelineRunner::new(store.clone(), config.clone());

    // Execute the appropriate command
    let result = match cli.command {
        Commands::Ingest(args) => handle_ingest(args, &runner).await,
        Commands::Run(args) => handle_run(args, &runner).await,
        Commands::Report(args) => handle_report(args, store.as_ref()).await,
        Commands::Events(args) => handle_events(args, store.as_ref(), &config).await,
    };
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Windowed baselines, regime classification, KPIs and opportunity scoring
/// for residential market data.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize and store a batch of raw market records.
    Ingest(IngestArgs),
    /// Run the full analytics pipeline for one calculation date.
    Run(RunArgs),
    /// Print the daily digest for a date.
    Report(ReportArgs),
    /// Print the notification feed for a date.
    Events(EventsArgs),
}

#[derive(Parser)]
struct IngestArgs {
    /// Path to a JSON array of raw transaction/listing records.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Path to a JSON array of rental index rows.
    #[arg(long)]
    rental: Option<PathBuf>,

    /// Path to a JSON array of planned-supply rows.
    #[arg(long)]
    supply: Option<PathBuf>,
}

#[derive(Parser)]
struct RunArgs {
    /// The calculation date (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Parser)]
struct ReportArgs {
    /// The calculation date (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// How many opportunities and baselines to show.
    #[arg(long, default_value_t = 10)]
    top: usize,
}

#[derive(Parser)]
struct EventsArgs {
    /// The calculation date (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

fn date_or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Utc::now().date_naive())
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_ingest(args: IngestArgs, runner: &PipelineRunner) -> anyhow::Result<()> {
    if args.file.is_none() && args.rental.is_none() && args.supply.is_none() {
        anyhow::bail!("nothing to ingest: pass --file, --rental and/or --supply");
    }

    if let Some(path) = args.file {
        let raws: Vec<RawMarketRecord> = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let report = runner.ingest(&raws, &StaticGeoProvider::empty()).await?;
        println!(
            "Ingested {}: {} accepted, {} rejected ({:?})",
            path.display(),
            report.accepted,
            report.rejected,
            report.status
        );
        for (reason, count) in &report.reject_reasons {
            println!("  rejected {count} as {reason}");
        }
    }
    if let Some(path) = args.rental {
        let rows: Vec<RentalIndexRecord> = serde_json::from_str(&fs::read_to_string(&path)?)?;
        runner.ingest_rental_index(&rows).await?;
        println!("Ingested {} rental index rows", rows.len());
    }
    if let Some(path) = args.supply {
        let rows: Vec<SupplyRecord> = serde_json::from_str(&fs::read_to_string(&path)?)?;
        runner.ingest_supply(&rows).await?;
        println!("Ingested {} supply rows", rows.len());
    }
    Ok(())
}

async fn handle_run(args: RunArgs, runner: &PipelineRunner) -> anyhow::Result<()> {
    let date = date_or_today(args.date);
    let report = runner.run(date).await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Run", report.run_id.to_string().as_str()]);
    table.add_row(vec![Cell::new("Date"), Cell::new(report.date)]);
    table.add_row(vec![
        Cell::new("Status"),
        Cell::new(format!("{:?}", report.status)),
    ]);
    table.add_row(vec![
        Cell::new("Features loaded"),
        Cell::new(report.features_loaded),
    ]);
    table.add_row(vec![
        Cell::new("Baselines computed"),
        Cell::new(report.baselines_computed),
    ]);
    table.add_row(vec![
        Cell::new("Scopes skipped"),
        Cell::new(report.scopes_skipped),
    ]);
    table.add_row(vec![
        Cell::new("Regimes classified"),
        Cell::new(report.regimes_classified),
    ]);
    table.add_row(vec![
        Cell::new("Regime changes"),
        Cell::new(report.regime_changes),
    ]);
    table.add_row(vec![Cell::new("KPI rows"), Cell::new(report.kpi_rows)]);
    table.add_row(vec![Cell::new("Risk rows"), Cell::new(report.risk_rows)]);
    table.add_row(vec![
        Cell::new("Opportunities scored"),
        Cell::new(report.opportunities_scored),
    ]);
    table.add_row(vec![
        Cell::new("Opportunities closed"),
        Cell::new(report.opportunities_closed),
    ]);
    table.add_row(vec![
        Cell::new("Elapsed (ms)"),
        Cell::new(report.elapsed_ms),
    ]);
    println!("{table}");
    Ok(())
}

async fn handle_report(args: ReportArgs, store: &dyn MarketStore) -> anyhow::Result<()> {
    let date = date_or_today(args.date);
    let digest = DailyDigest::build(store, date, args.top).await?;

    let mut opportunities = Table::new();
    opportunities.load_preset(UTF8_FULL);
    opportunities.set_header(vec![
        "Source", "Scope", "Price/sqm", "Discount %", "Flip", "Rent", "Long", "Global", "Call",
    ]);
    for opp in &digest.top_opportunities {
        opportunities.add_row(vec![
            Cell::new(&opp.source_id),
            Cell::new(opp.scope.to_string()),
            Cell::new(format!("{:.0}", opp.price_per_sqm)),
            Cell::new(format!("{:.1}", opp.discount_pct)),
            Cell::new(format!("{:.0}", opp.flip_score)),
            Cell::new(format!("{:.0}", opp.rent_score)),
            Cell::new(format!("{:.0}", opp.long_term_score)),
            Cell::new(format!("{:.0}", opp.global_score)),
            Cell::new(opp.recommendation.as_str()),
        ]);
    }
    println!("Top opportunities for {date}:\n{opportunities}");

    let mut regimes = Table::new();
    regimes.load_preset(UTF8_FULL);
    regimes.set_header(vec!["Location", "Regime", "Confidence", "Price", "Volume"]);
    for regime in &digest.regimes {
        regimes.add_row(vec![
            Cell::new(regime.location.to_string()),
            Cell::new(regime.regime.as_str()),
            Cell::new(format!("{:.2}", regime.confidence)),
            Cell::new(regime.price_trend.as_str()),
            Cell::new(regime.volume_trend.as_str()),
        ]);
    }
    println!("Regimes:\n{regimes}");

    let mut baselines = Table::new();
    baselines.load_preset(UTF8_FULL);
    baselines.set_header(vec![
        "Scope",
        "Median/sqm",
        "Tx (30d)",
        "Momentum",
        "Volatility",
    ]);
    for baseline in &digest.busiest_baselines {
        baselines.add_row(vec![
            Cell::new(baseline.scope.to_string()),
            Cell::new(format!("{:.0}", baseline.median_ppsqm)),
            Cell::new(baseline.tx_count),
            Cell::new(
                baseline
                    .momentum
                    .map(|m| format!("{:+.1}%", m * 100.0))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(format!("{:.2}", baseline.volatility)),
        ]);
    }
    println!("Most active scopes (30d):\n{baselines}");

    let mut risks = Table::new();
    risks.load_preset(UTF8_FULL);
    risks.set_header(vec!["Location", "Score", "Supply", "Volatility", "Factors"]);
    for summary in &digest.risk_summaries {
        risks.add_row(vec![
            Cell::new(summary.location.to_string()),
            Cell::new(format!("{:.0}", summary.risk_score)),
            Cell::new(summary.supply_risk.as_str()),
            Cell::new(summary.volatility_risk.as_str()),
            Cell::new(summary.risk_factors.join("; ")),
        ]);
    }
    println!("Risk:\n{risks}");
    Ok(())
}

async fn handle_events(
    args: EventsArgs,
    store: &dyn MarketStore,
    config: &configuration::Config,
) -> anyhow::Result<()> {
    let date = date_or_today(args.date);
    let feed = EventFeed::collect(store, date, &config.notifier).await?;

    if feed.regime_changes.is_empty() && feed.opportunities.is_empty() {
        println!("No events for {date}.");
        return Ok(());
    }
    for change in &feed.regime_changes {
        println!("[regime] {}", change.headline());
    }
    for opp in &feed.opportunities {
        println!(
            "[deal] {} {} at {:.0}/sqm, {:.1}% below baseline -> {} ({:.0})",
            opp.source_id,
            opp.scope,
            opp.price_per_sqm,
            opp.discount_pct,
            opp.recommendation.as_str(),
            opp.global_score
        );
    }
    Ok(())
}
