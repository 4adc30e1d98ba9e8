use tracing::warn;

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Database URL (e.g., "sqlite://data/shortvol.db")
    pub database_url: String,
    /// Base URL the daily files are served from
    pub source_base_url: String,
    /// Request timeout in seconds (daily files are tens of megabytes)
    pub fetch_timeout_secs: u64,
    /// Maximum accepted response body size in bytes
    pub max_response_bytes: u64,
    /// Minimum total volume for the top-by-ratio query (0 disables the floor)
    pub top_ratio_min_volume: i64,
    /// Delay between consecutive backfill downloads in milliseconds
    pub backfill_delay_ms: u64,
    /// Days of history kept by retention pruning
    pub retention_days: i64,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/shortvol.db".to_string(),
            source_base_url: "https://cdn.finra.org/equity/regsho/daily".to_string(),
            fetch_timeout_secs: 180,
            max_response_bytes: 50 * 1024 * 1024,
            top_ratio_min_volume: 1_000_000,
            backfill_delay_ms: 1000,
            retention_days: 30,
        }
    }
}

impl IngestorConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or out of range.
    pub fn from_env() -> IngestorConfig {
        let mut config = IngestorConfig::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(base) = std::env::var("SHORTVOL_SOURCE_BASE_URL") {
            config.source_base_url = base.trim_end_matches('/').to_string();
        }

        if let Ok(timeout) = std::env::var("SHORTVOL_FETCH_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(value) if (10..=600).contains(&value) => {
                    config.fetch_timeout_secs = value;
                }
                _ => {
                    warn!(
                        "Invalid SHORTVOL_FETCH_TIMEOUT_SECS value: {} (must be between 10 and 600), using default: {}",
                        timeout, config.fetch_timeout_secs
                    );
                }
            }
        }

        if let Ok(max_bytes) = std::env::var("SHORTVOL_MAX_RESPONSE_BYTES") {
            if let Ok(value) = max_bytes.parse::<u64>() {
                if value > 0 {
                    config.max_response_bytes = value;
                }
            }
        }

        if let Ok(floor) = std::env::var("SHORTVOL_TOP_RATIO_MIN_VOLUME") {
            if let Ok(value) = floor.parse::<i64>() {
                if value >= 0 {
                    config.top_ratio_min_volume = value;
                }
            }
        }

        if let Ok(delay) = std::env::var("SHORTVOL_BACKFILL_DELAY_MS") {
            match delay.parse::<u64>() {
                Ok(value) if value <= 60_000 => {
                    config.backfill_delay_ms = value;
                }
                _ => {
                    warn!(
                        "Invalid SHORTVOL_BACKFILL_DELAY_MS value: {} (must be at most 60000), using default: {}",
                        delay, config.backfill_delay_ms
                    );
                }
            }
        }

        if let Ok(days) = std::env::var("SHORTVOL_RETENTION_DAYS") {
            if let Ok(value) = days.parse::<i64>() {
                if value > 0 {
                    config.retention_days = value;
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestorConfig::default();
        assert_eq!(config.fetch_timeout_secs, 180);
        assert_eq!(config.max_response_bytes, 50 * 1024 * 1024);
        assert_eq!(config.top_ratio_min_volume, 1_000_000);
        assert_eq!(config.retention_days, 30);
        assert!(config.source_base_url.starts_with("https://cdn.finra.org"));
    }
}
