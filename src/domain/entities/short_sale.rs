//! Short-Sale Volume Record
//!
//! One row per symbol per trading date, as published in the daily
//! Reg SHO files. The short ratio is derived, never stored independently
//! of the volumes it is computed from.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored precision of the derived short ratio (decimal places).
pub const SHORT_RATIO_DECIMALS: u32 = 4;

/// Short-sale volume record for one symbol on one trading date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ShortSaleRecord {
    /// Date key in YYYYMMDD form
    pub date: String,
    pub symbol: String,
    pub short_volume: i64,
    pub short_exempt_volume: i64,
    pub total_volume: i64,
    /// Market-center code, may be empty
    pub market: String,
    /// Short volume as a percentage of total volume
    pub short_ratio: f64,
}

/// Compute the short ratio as a percentage, rounded to
/// [`SHORT_RATIO_DECIMALS`] places. A zero total volume maps to 0.0,
/// never an error or NaN.
pub fn short_ratio(short_volume: i64, total_volume: i64) -> f64 {
    if total_volume > 0 {
        let scale = 10f64.powi(SHORT_RATIO_DECIMALS as i32);
        let ratio = short_volume as f64 / total_volume as f64 * 100.0;
        (ratio * scale).round() / scale
    } else {
        0.0
    }
}
