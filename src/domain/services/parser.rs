//! Daily File Parser
//!
//! Turns the raw pipe-delimited file body into typed records. This is a
//! best-effort parse, not a strict validator: short lines are skipped and
//! unparseable volume fields coerce to zero, so one bad line never fails
//! the whole ingestion.

use tracing::debug;

use crate::domain::entities::short_sale::{short_ratio, ShortSaleRecord};

const FIELD_DELIMITER: char = '|';

/// Minimum fields per line: record type, symbol, short volume,
/// short exempt volume, total volume. A sixth (market) is optional.
const MIN_FIELDS: usize = 5;

/// Parse one daily file body into records tagged with `date_key`.
///
/// The first line is a column header and is skipped. Output order follows
/// file order; callers must not rely on it.
pub fn parse_daily_file(raw: &str, date_key: &str) -> Vec<ShortSaleRecord> {
    let mut lines = raw.trim().lines();
    let _header = lines.next();

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() < MIN_FIELDS {
            skipped += 1;
            continue;
        }

        let short_volume = parse_volume(fields[2]);
        let short_exempt_volume = parse_volume(fields[3]);
        let total_volume = parse_volume(fields[4]);

        records.push(ShortSaleRecord {
            date: date_key.to_string(),
            symbol: fields[1].trim().to_string(),
            short_volume,
            short_exempt_volume,
            total_volume,
            market: fields.get(5).map(|m| m.trim().to_string()).unwrap_or_default(),
            short_ratio: short_ratio(short_volume, total_volume),
        });
    }

    if skipped > 0 {
        debug!("Skipped {} malformed lines in file for {}", skipped, date_key);
    }

    records
}

/// Lenient volume parse: anything that is not a clean integer counts as 0.
fn parse_volume(field: &str) -> i64 {
    field.trim().parse().unwrap_or(0)
}
