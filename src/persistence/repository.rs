//! Short-Sale Data Repository
//!
//! Data access layer for the short_sale_data table. Writes are
//! insert-or-ignore keyed on (date, symbol); re-ingesting a date never
//! touches existing rows.

use sqlx::Row;
use tracing::{debug, error};

use super::models::StoreStats;
use super::{DatabaseError, DbPool};
use crate::domain::entities::short_sale::ShortSaleRecord;

const RECORD_COLUMNS: &str =
    "date, symbol, short_volume, short_exempt_volume, total_volume, market, short_ratio";

/// Short-sale record repository
#[derive(Clone)]
pub struct ShortSaleRepository {
    pool: DbPool,
}

impl ShortSaleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert records with insert-or-ignore semantics, in one transaction.
    ///
    /// Returns the number of rows actually inserted; rows ignored because
    /// their (date, symbol) key already exists are not counted. Safe to
    /// call repeatedly with overlapping data.
    pub async fn insert_many(&self, records: &[ShortSaleRecord]) -> Result<u64, DatabaseError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin insert transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to begin transaction: {}", e))
        })?;

        let mut inserted = 0u64;
        for record in records {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO short_sale_data
                    (date, symbol, short_volume, short_exempt_volume, total_volume, market, short_ratio)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&record.date)
            .bind(&record.symbol)
            .bind(record.short_volume)
            .bind(record.short_exempt_volume)
            .bind(record.total_volume)
            .bind(&record.market)
            .bind(record.short_ratio)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to insert record for {}/{}: {}", record.date, record.symbol, e);
                DatabaseError::QueryError(format!("Failed to insert record: {}", e))
            })?;

            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit insert transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to commit transaction: {}", e))
        })?;

        debug!("Inserted {} of {} records", inserted, records.len());
        Ok(inserted)
    }

    /// Most recent records for a symbol, descending by date.
    pub async fn get_by_symbol(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<ShortSaleRecord>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM short_sale_data WHERE symbol = ?1 ORDER BY date DESC LIMIT ?2",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, ShortSaleRecord>(&query)
            .bind(symbol.to_uppercase())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get records for {}: {}", symbol, e);
                DatabaseError::QueryError(format!("Failed to get records by symbol: {}", e))
            })?;

        Ok(records)
    }

    /// Records in an inclusive date-key range, optionally filtered by
    /// symbol, ordered by date descending then symbol ascending.
    pub async fn get_by_date_range(
        &self,
        start: &str,
        end: &str,
        symbol: Option<&str>,
    ) -> Result<Vec<ShortSaleRecord>, DatabaseError> {
        let records = match symbol {
            Some(symbol) => {
                let query = format!(
                    "SELECT {} FROM short_sale_data \
                     WHERE date BETWEEN ?1 AND ?2 AND symbol = ?3 \
                     ORDER BY date DESC, symbol ASC",
                    RECORD_COLUMNS
                );
                sqlx::query_as::<_, ShortSaleRecord>(&query)
                    .bind(start)
                    .bind(end)
                    .bind(symbol.to_uppercase())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {} FROM short_sale_data \
                     WHERE date BETWEEN ?1 AND ?2 \
                     ORDER BY date DESC, symbol ASC",
                    RECORD_COLUMNS
                );
                sqlx::query_as::<_, ShortSaleRecord>(&query)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| {
            error!("Failed to get records in range {}..{}: {}", start, end, e);
            DatabaseError::QueryError(format!("Failed to get records by date range: {}", e))
        })?;

        Ok(records)
    }

    /// Records for one date ordered by short ratio descending.
    ///
    /// `min_total_volume` excludes illiquid noise from the ranking; pass 0
    /// to rank every symbol.
    pub async fn top_by_ratio(
        &self,
        date: &str,
        limit: i64,
        min_total_volume: i64,
    ) -> Result<Vec<ShortSaleRecord>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM short_sale_data \
             WHERE date = ?1 AND total_volume >= ?2 \
             ORDER BY short_ratio DESC LIMIT ?3",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, ShortSaleRecord>(&query)
            .bind(date)
            .bind(min_total_volume)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get top ratios for {}: {}", date, e);
                DatabaseError::QueryError(format!("Failed to get top ratios: {}", e))
            })?;

        Ok(records)
    }

    /// All dates with at least one record, descending.
    pub async fn distinct_dates(&self) -> Result<Vec<String>, DatabaseError> {
        let dates = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT date FROM short_sale_data ORDER BY date DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get distinct dates: {}", e);
            DatabaseError::QueryError(format!("Failed to get distinct dates: {}", e))
        })?;

        Ok(dates)
    }

    /// Case-insensitive symbol prefix search, distinct, ascending.
    pub async fn search_symbols(
        &self,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<String>, DatabaseError> {
        let pattern = format!("{}%", prefix.to_uppercase());
        let symbols = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT symbol FROM short_sale_data \
             WHERE symbol LIKE ?1 ORDER BY symbol ASC LIMIT ?2",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to search symbols for '{}': {}", prefix, e);
            DatabaseError::QueryError(format!("Failed to search symbols: {}", e))
        })?;

        Ok(symbols)
    }

    /// Aggregate statistics over the whole store.
    pub async fn stats(&self) -> Result<StoreStats, DatabaseError> {
        let stats = sqlx::query_as::<_, StoreStats>(
            r#"
            SELECT
                COUNT(*) as total_records,
                COUNT(DISTINCT symbol) as unique_symbols,
                COUNT(DISTINCT date) as unique_dates,
                MIN(date) as earliest_date,
                MAX(date) as latest_date
            FROM short_sale_data
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get store stats: {}", e);
            DatabaseError::QueryError(format!("Failed to get store stats: {}", e))
        })?;

        Ok(stats)
    }

    /// Delete every record older than the cutoff date key.
    ///
    /// The count is taken before the delete, in the same transaction, so
    /// the reported number is exact.
    pub async fn delete_older_than(&self, cutoff_date_key: &str) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DatabaseError::QueryError(format!("Failed to begin prune transaction: {}", e))
        })?;

        let row = sqlx::query("SELECT COUNT(*) as count FROM short_sale_data WHERE date < ?1")
            .bind(cutoff_date_key)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to count prunable records: {}", e);
                DatabaseError::QueryError(format!("Failed to count prunable records: {}", e))
            })?;
        let count: i64 = row.get("count");

        sqlx::query("DELETE FROM short_sale_data WHERE date < ?1")
            .bind(cutoff_date_key)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to prune records older than {}: {}", cutoff_date_key, e);
                DatabaseError::QueryError(format!("Failed to prune records: {}", e))
            })?;

        tx.commit().await.map_err(|e| {
            DatabaseError::QueryError(format!("Failed to commit prune transaction: {}", e))
        })?;

        debug!("Pruned {} records older than {}", count, cutoff_date_key);
        Ok(count as u64)
    }

    /// Delete every record, returning how many there were.
    pub async fn delete_all(&self) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DatabaseError::QueryError(format!("Failed to begin clear transaction: {}", e))
        })?;

        let row = sqlx::query("SELECT COUNT(*) as count FROM short_sale_data")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to count records: {}", e)))?;
        let count: i64 = row.get("count");

        sqlx::query("DELETE FROM short_sale_data")
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to clear store: {}", e);
                DatabaseError::QueryError(format!("Failed to clear store: {}", e))
            })?;

        tx.commit().await.map_err(|e| {
            DatabaseError::QueryError(format!("Failed to commit clear transaction: {}", e))
        })?;

        debug!("Cleared {} records", count);
        Ok(count as u64)
    }
}
