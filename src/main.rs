use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use shortvol::application::services::ingestion_service::{IngestReport, IngestionService};
use shortvol::config::IngestorConfig;
use shortvol::domain::services::calendar::{self, SOURCE_TIME_ZONE};
use shortvol::infrastructure::finra_client::FinraClient;
use shortvol::persistence;
use shortvol::persistence::repository::ShortSaleRepository;

/// Entry point the scheduler invokes.
///
/// No arguments ingests yesterday's file (source time zone); weekends are
/// reported and skipped without a download. Other modes:
///   shortvol YYYYMMDD               ingest one specific date
///   shortvol --backfill START [END] sequential backfill over a range
///   shortvol --prune [DAYS]         retention pruning
///   shortvol --clear                delete every stored record
///   shortvol --stats                log aggregate store statistics
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shortvol=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = IngestorConfig::from_env();
    let pool = persistence::init_database(&config.database_url).await?;
    let repository = ShortSaleRepository::new(pool);
    let client = FinraClient::new(&config)?;
    let service = IngestionService::new(Arc::new(client), repository.clone())
        .with_backfill_delay(Duration::from_millis(config.backfill_delay_ms));

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--backfill") => {
            let start = args
                .get(1)
                .and_then(|raw| calendar::parse_date_key(raw))
                .ok_or("usage: shortvol --backfill START [END] (dates as YYYYMMDD)")?;
            let end = match args.get(2) {
                Some(raw) => calendar::parse_date_key(raw)
                    .ok_or("invalid end date, expected YYYYMMDD")?,
                None => start,
            };
            if end < start {
                return Err("backfill end date precedes start date".into());
            }

            let summary = service.backfill(start, end).await;
            info!(
                "Backfill finished: {} records across {} days ({} weekend days skipped)",
                summary.total_records, summary.days_processed, summary.days_skipped
            );
        }
        Some("--prune") => {
            let days = match args.get(1) {
                Some(raw) => raw
                    .parse::<i64>()
                    .map_err(|_| "invalid day count for --prune")?,
                None => config.retention_days,
            };

            let report = service.prune_older_than(days).await?;
            info!(
                "Deleted {} records older than {}",
                report.deleted_count, report.cutoff_date
            );
        }
        Some("--clear") => {
            let deleted = service.clear_all().await?;
            info!("Cleared {} records from the store", deleted);
        }
        Some("--stats") => {
            let stats = repository.stats().await?;
            info!(
                "Store holds {} records across {} symbols and {} dates ({} to {})",
                stats.total_records,
                stats.unique_symbols,
                stats.unique_dates,
                stats.earliest_date.as_deref().unwrap_or("-"),
                stats.latest_date.as_deref().unwrap_or("-"),
            );
        }
        Some(raw) => {
            let date = calendar::parse_date_key(raw)
                .ok_or_else(|| format!("unrecognized argument: {}", raw))?;
            log_report(&service.ingest(date).await);
        }
        None => {
            let yesterday = calendar::yesterday_in(SOURCE_TIME_ZONE, chrono::Utc::now());
            if calendar::is_weekend(yesterday) {
                info!("{} was a weekend, no trading data to ingest", yesterday);
            } else {
                log_report(&service.ingest(yesterday).await);
            }
        }
    }

    Ok(())
}

fn log_report(report: &IngestReport) {
    if report.success {
        info!(
            "Ingested {} records for {} ({} newly stored)",
            report.count, report.date, report.inserted
        );
    } else if let Some(reason) = &report.error {
        warn!("Ingestion for {} failed: {}", report.date, reason);
    } else {
        info!(
            "No data available for {} (weekend or holiday)",
            report.date
        );
    }
}
