//! Persistence Models
//!
//! Aggregate rows returned by the query surface. The record itself lives
//! in `domain::entities::short_sale`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Aggregate statistics over the whole store
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoreStats {
    pub total_records: i64,
    pub unique_symbols: i64,
    pub unique_dates: i64,
    /// None when the store is empty
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,
}
