//! Ingestion Coordinator
//!
//! Orchestrates fetch → parse → store for one target date and
//! deduplicates concurrent requests for the same date key: overlapping
//! callers share one in-flight operation and its result, so at most one
//! download runs per date at a time. The map entry is removed when the
//! operation completes, whatever the outcome, so failures are never
//! cached. The database's unique constraint remains the final guard
//! against duplicate rows, independent of this map.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domain::repositories::short_volume_source::{FetchError, ShortVolumeSource};
use crate::domain::services::calendar::{self, SOURCE_TIME_ZONE};
use crate::domain::services::parser;
use crate::persistence::repository::ShortSaleRepository;
use crate::persistence::DatabaseError;

const DEFAULT_BACKFILL_DELAY: Duration = Duration::from_millis(1000);

/// Outcome of one ingestion attempt.
///
/// `success: false` with `error: None` means the expected no-data
/// condition (weekend, holiday, empty file); `error: Some(_)` means a
/// real failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub success: bool,
    pub date: String,
    /// Records parsed from the file
    pub count: usize,
    /// Rows newly written (0 on re-ingestion of a stored date)
    pub inserted: u64,
    pub error: Option<String>,
}

impl IngestReport {
    fn no_data(date_key: &str) -> Self {
        Self {
            success: false,
            date: date_key.to_string(),
            count: 0,
            inserted: 0,
            error: None,
        }
    }

    fn failure(date_key: &str, reason: String) -> Self {
        Self {
            success: false,
            date: date_key.to_string(),
            count: 0,
            inserted: 0,
            error: Some(reason),
        }
    }
}

/// Accumulated result of a backfill run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillSummary {
    pub total_records: usize,
    /// Days a fetch was attempted for
    pub days_processed: usize,
    /// Weekend days skipped without a fetch
    pub days_skipped: usize,
}

/// Result of a retention pruning run
#[derive(Debug, Clone, Serialize)]
pub struct PruneReport {
    pub deleted_count: u64,
    pub cutoff_date: String,
}

type SharedIngest = Shared<BoxFuture<'static, IngestReport>>;

/// Coordinates fetch → parse → store for daily short-sale files
pub struct IngestionService {
    source: Arc<dyn ShortVolumeSource>,
    repository: ShortSaleRepository,
    in_flight: Arc<Mutex<HashMap<String, SharedIngest>>>,
    backfill_delay: Duration,
    clock: fn() -> DateTime<Utc>,
}

impl IngestionService {
    pub fn new(source: Arc<dyn ShortVolumeSource>, repository: ShortSaleRepository) -> Self {
        Self {
            source,
            repository,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            backfill_delay: DEFAULT_BACKFILL_DELAY,
            clock: Utc::now,
        }
    }

    /// Set the pause between consecutive backfill downloads.
    pub fn with_backfill_delay(mut self, delay: Duration) -> Self {
        self.backfill_delay = delay;
        self
    }

    /// Override the clock that resolves "yesterday" and retention cutoffs,
    /// so tests can pin the current time.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Ingest the file for yesterday in the source's time zone.
    pub async fn ingest_yesterday(&self) -> IngestReport {
        self.ingest(calendar::yesterday_in(SOURCE_TIME_ZONE, (self.clock)()))
            .await
    }

    /// Ingest the file for a calendar date.
    pub async fn ingest(&self, date: NaiveDate) -> IngestReport {
        self.ingest_date_key(calendar::format_date_key(date)).await
    }

    /// Ingest the file for a date key, joining any operation already in
    /// flight for the same key instead of fetching twice.
    pub async fn ingest_date_key(&self, date_key: String) -> IngestReport {
        let task = {
            // Check-and-register happens under one lock acquisition with
            // no await point in between, so two near-simultaneous callers
            // cannot both start a download.
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.entry(date_key.clone()) {
                Entry::Occupied(existing) => {
                    info!(
                        "Ingestion for {} already in flight, joining existing operation",
                        date_key
                    );
                    existing.get().clone()
                }
                Entry::Vacant(slot) => {
                    let source = Arc::clone(&self.source);
                    let repository = self.repository.clone();
                    let registry = Arc::clone(&self.in_flight);
                    let key = date_key;

                    let task: SharedIngest = async move {
                        let report = run_ingestion(source, repository, &key).await;
                        registry.lock().await.remove(&key);
                        report
                    }
                    .boxed()
                    .shared();

                    slot.insert(task.clone());
                    task
                }
            }
        };

        task.await
    }

    /// Ingest a date range day by day, inclusive.
    ///
    /// Weekend calendar days are skipped without a fetch, a pause is
    /// inserted between downloads, and one day's failure does not abort
    /// the remaining days.
    pub async fn backfill(&self, start: NaiveDate, end: NaiveDate) -> BackfillSummary {
        info!("Starting backfill from {} to {}", start, end);

        let mut summary = BackfillSummary::default();
        let mut current = start;

        while current <= end {
            if calendar::is_weekend(current) {
                info!("Skipping weekend day {}", current);
                summary.days_skipped += 1;
            } else {
                let report = self.ingest(current).await;
                summary.days_processed += 1;

                if report.success {
                    summary.total_records += report.count;
                    info!("Backfilled {} records for {}", report.count, report.date);
                } else if let Some(reason) = &report.error {
                    warn!("Backfill day {} failed: {}", report.date, reason);
                } else {
                    info!("No data for {} (holiday or empty day)", report.date);
                }

                if current < end && !self.backfill_delay.is_zero() {
                    tokio::time::sleep(self.backfill_delay).await;
                }
            }

            current = match current.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        info!(
            "Backfill completed: {} records across {} days ({} weekend days skipped)",
            summary.total_records, summary.days_processed, summary.days_skipped
        );
        summary
    }

    /// Delete records older than `days` days (measured in the source's
    /// time zone) and report the cutoff used.
    pub async fn prune_older_than(&self, days: i64) -> Result<PruneReport, DatabaseError> {
        let cutoff = calendar::format_date_key(calendar::days_ago_in(
            SOURCE_TIME_ZONE,
            (self.clock)(),
            days,
        ));
        let deleted_count = self.repository.delete_older_than(&cutoff).await?;

        info!("Pruned {} records older than {}", deleted_count, cutoff);
        Ok(PruneReport {
            deleted_count,
            cutoff_date: cutoff,
        })
    }

    /// Delete every stored record.
    pub async fn clear_all(&self) -> Result<u64, DatabaseError> {
        let deleted = self.repository.delete_all().await?;
        info!("Cleared {} records from the store", deleted);
        Ok(deleted)
    }
}

/// One fetch → parse → store sequence for a date key.
async fn run_ingestion(
    source: Arc<dyn ShortVolumeSource>,
    repository: ShortSaleRepository,
    date_key: &str,
) -> IngestReport {
    let body = match source.fetch_daily(date_key).await {
        Ok(Some(body)) => body,
        Ok(None) => {
            info!("Empty file for {}, nothing to ingest", date_key);
            return IngestReport::no_data(date_key);
        }
        Err(FetchError::NotFound { .. }) => {
            info!("No file published for {} (weekend or holiday)", date_key);
            return IngestReport::no_data(date_key);
        }
        Err(e) => {
            error!("Download failed for {}: {}", date_key, e);
            return IngestReport::failure(date_key, e.to_string());
        }
    };

    let records = parser::parse_daily_file(&body, date_key);
    if records.is_empty() {
        warn!("File for {} contained no parseable records", date_key);
        return IngestReport::no_data(date_key);
    }

    match repository.insert_many(&records).await {
        Ok(inserted) => {
            info!(
                "Stored {} new of {} parsed records for {}",
                inserted,
                records.len(),
                date_key
            );
            IngestReport {
                success: true,
                date: date_key.to_string(),
                count: records.len(),
                inserted,
                error: None,
            }
        }
        Err(e) => {
            error!("Storage failed for {}: {}", date_key, e);
            IngestReport::failure(date_key, e.to_string())
        }
    }
}
