// logvigil - main.rs
//
// CLI entry point. Handles:
// 1. CLI argument parsing
// 2. Logging initialisation (debug mode support)
// 3. Config loading and validation
// 4. Bulk ingestion, filtered output, export, and the demo live feed

use clap::Parser;
use logvigil::app::config::{self, EngineConfig};
use logvigil::app::demo::DemoSource;
use logvigil::app::engine::Engine;
use logvigil::app::feed::FeedConnection;
use logvigil::core::alerts;
use logvigil::core::export;
use logvigil::core::filter::FilterCriteria;
use logvigil::core::model::{Level, LogRecord, Status};
use logvigil::core::stats;
use logvigil::util::constants;
use logvigil::util::error::{LogVigilError, Result};
use logvigil::util::logging;
use std::path::PathBuf;
use std::sync::Arc;

/// logvigil - security-event log ingestion and aggregation engine.
///
/// Ingest a log file (JSON array, NDJSON, or plain text) and print the
/// aggregate view a security dashboard would render: severity counts,
/// failed logins, top talkers, recent alerts, and filtered record listings.
#[derive(Parser, Debug)]
#[command(name = "logvigil", version, about)]
struct Cli {
    /// Log file to ingest (omit with --follow for a live-only session).
    path: Option<PathBuf>,

    /// Config file path (default: ./logvigil.toml when present).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Override the retention capacity from config.
    #[arg(long = "capacity")]
    capacity: Option<usize>,

    /// Only show records at this severity level.
    #[arg(short = 'f', long = "level")]
    level: Option<Level>,

    /// Only show records whose message contains this text (case-insensitive).
    #[arg(short = 's', long = "search")]
    search: Option<String>,

    /// Only show records for this user.
    #[arg(long = "user")]
    user: Option<String>,

    /// Only show records from this IP.
    #[arg(long = "ip")]
    ip: Option<String>,

    /// Only show records with this status (success/failure).
    #[arg(long = "status")]
    status: Option<Status>,

    /// Write the filtered records to a CSV file.
    #[arg(long = "export-csv")]
    export_csv: Option<PathBuf>,

    /// Write the filtered records to a JSON file.
    #[arg(long = "export-json")]
    export_json: Option<PathBuf>,

    /// Print the aggregate statistics as JSON instead of text.
    #[arg(long = "json")]
    json: bool,

    /// Attach the built-in demo feed for this many seconds before reporting.
    #[arg(long = "follow")]
    follow: Option<u64>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(constants::CONFIG_FILE_NAME));
    let (mut engine_config, warnings) = config::load_config(&config_path);

    logging::init(cli.debug, engine_config.log_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "logvigil starting"
    );

    for warning in &warnings {
        eprintln!("Warning: {warning}");
    }

    if let Some(capacity) = cli.capacity {
        engine_config.capacity = capacity
            .clamp(constants::MIN_CAPACITY, constants::ABSOLUTE_MAX_CAPACITY);
    }

    if let Err(e) = run(&cli, &engine_config) {
        tracing::error!(error = %e, "Fatal error");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli, config: &EngineConfig) -> Result<()> {
    let engine = Arc::new(Engine::new(config));

    if let Some(path) = &cli.path {
        let content =
            std::fs::read_to_string(path).map_err(|source| LogVigilError::Io {
                path: path.clone(),
                operation: "read",
                source,
            })?;
        let summary = engine.load_bulk(&content);
        println!(
            "Ingested {} records from {} ({} retained)",
            summary.parsed,
            path.display(),
            summary.retained
        );
    }

    if let Some(secs) = cli.follow {
        follow_demo_feed(&engine, config, secs);
    }

    let criteria = FilterCriteria {
        level: cli.level,
        search: cli.search.clone(),
        user: cli.user.clone(),
        ip: cli.ip.clone(),
        status: cli.status,
        ..Default::default()
    };

    report(&engine, cli.json);

    let filtered = engine.filtered(&criteria);
    if !criteria.is_empty() {
        print_records(&filtered);
    }

    if let Some(path) = &cli.export_csv {
        let file = std::fs::File::create(path).map_err(|source| LogVigilError::Io {
            path: path.clone(),
            operation: "create",
            source,
        })?;
        let count = export::export_csv(&filtered, file, path)?;
        println!("Exported {count} records to {}", path.display());
    }

    if let Some(path) = &cli.export_json {
        let file = std::fs::File::create(path).map_err(|source| LogVigilError::Io {
            path: path.clone(),
            operation: "create",
            source,
        })?;
        let count = export::export_json(&filtered, file, path)?;
        println!("Exported {count} records to {}", path.display());
    }

    Ok(())
}

/// Run the demo push source against the engine for `secs` seconds,
/// echoing status transitions as they happen.
fn follow_demo_feed(engine: &Arc<Engine>, config: &EngineConfig, secs: u64) {
    let feed = FeedConnection::new(DemoSource::new(), config);
    feed.subscribe_status(|status| println!("Feed status: {status}"));
    engine.attach(&feed);
    feed.connect();

    println!("Following demo feed for {secs}s...");
    std::thread::sleep(std::time::Duration::from_secs(secs));
    feed.terminate();
}

/// Print the aggregate view: stats, top talkers, and recent alerts.
fn report(engine: &Arc<Engine>, as_json: bool) {
    let stats = engine.stats();

    if as_json {
        // A struct of counters and strings serialises unconditionally.
        let rendered = serde_json::to_string_pretty(&stats)
            .expect("stats summary serialisation is infallible");
        println!("{rendered}");
        return;
    }

    println!();
    println!("Total entries:   {}", stats.total_entries);
    println!(
        "By level:        error={} warn={} info={} debug={}",
        stats.error_count, stats.warn_count, stats.info_count, stats.debug_count
    );
    println!("Failed logins:   {}", stats.failed_logins);
    println!("Avg duration:    {:.1} ms", stats.avg_response_time);

    if !stats.top_users.is_empty() {
        println!("Top users:");
        for entry in &stats.top_users {
            println!("  {:<24} {} events", entry.name, entry.count);
        }
    }
    if !stats.top_ips.is_empty() {
        println!("Top IPs:");
        for entry in &stats.top_ips {
            println!("  {:<24} {} events", entry.name, entry.count);
        }
    }

    let snapshot = engine.snapshot();

    let rules = alerts::rule_counts(&snapshot, constants::DEFAULT_TOP_N);
    if !rules.is_empty() {
        println!("Rules fired:");
        for entry in &rules {
            println!("  {:<24} {} times", entry.name, entry.count);
        }
    }

    let buckets = stats::hourly_counts(&snapshot, chrono::Utc::now());
    if buckets.iter().any(|&n| n > 0) {
        let rendered: Vec<String> = buckets.iter().map(u64::to_string).collect();
        println!("Events (last 12h): {}", rendered.join(" "));
    }

    let alert_list = alerts::security_alerts(&snapshot);
    if !alert_list.is_empty() {
        println!("Recent alerts:");
        for alert in &alert_list {
            println!(
                "  [{}] {} {}",
                alert.level,
                alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
                alert.message
            );
        }
    }
}

/// Print records newest-first, capped for terminal sanity.
fn print_records(records: &[LogRecord]) {
    println!();
    println!("Matched {} records", records.len());
    for record in records.iter().rev().take(constants::MAX_PRINTED_RECORDS) {
        let user = record.user.as_deref().unwrap_or("-");
        let ip = record.ip.as_deref().unwrap_or("-");
        println!(
            "  {} [{:<5}] {:<16} {:<15} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.level,
            user,
            ip,
            record.message
        );
    }
    if records.len() > constants::MAX_PRINTED_RECORDS {
        println!(
            "  ... {} more (use --export-csv/--export-json for the full set)",
            records.len() - constants::MAX_PRINTED_RECORDS
        );
    }
}
