//! End-to-end ingestion tests: a local HTTP server stands in for the
//! FINRA CDN, and records flow through fetch → parse → store against an
//! in-memory database.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use shortvol::application::services::ingestion_service::IngestionService;
use shortvol::config::IngestorConfig;
use shortvol::infrastructure::finra_client::FinraClient;
use shortvol::persistence::init_database;
use shortvol::persistence::repository::ShortSaleRepository;

async fn serve_file(
    State(files): State<Arc<HashMap<String, String>>>,
    Path(file): Path<String>,
) -> Result<String, StatusCode> {
    files.get(&file).cloned().ok_or(StatusCode::NOT_FOUND)
}

/// Serve canned daily files on an ephemeral port; returns the base URL to
/// point the client at.
async fn spawn_mock_cdn(files: HashMap<String, String>) -> String {
    let app = Router::new()
        .route("/equity/regsho/daily/:file", get(serve_file))
        .with_state(Arc::new(files));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/equity/regsho/daily", addr)
}

async fn pipeline(base_url: String) -> (IngestionService, ShortSaleRepository) {
    let config = IngestorConfig {
        source_base_url: base_url,
        fetch_timeout_secs: 10,
        ..IngestorConfig::default()
    };
    let pool = init_database("sqlite::memory:").await.unwrap();
    let repository = ShortSaleRepository::new(pool);
    let client = FinraClient::new(&config).unwrap();
    let service = IngestionService::new(Arc::new(client), repository.clone())
        .with_backfill_delay(Duration::ZERO);
    (service, repository)
}

#[tokio::test]
async fn ingests_a_daily_file_end_to_end() {
    let mut files = HashMap::new();
    files.insert(
        "CNMSshvol20240603.txt".to_string(),
        "H1|H2|H3|H4|H5\n0|ABCD|1000|200|5000|N\n".to_string(),
    );
    let base = spawn_mock_cdn(files).await;
    let (service, repository) = pipeline(base).await;

    let report = service.ingest_date_key("20240603".to_string()).await;
    assert!(report.success);
    assert_eq!(report.date, "20240603");
    assert_eq!(report.count, 1);
    assert_eq!(report.inserted, 1);

    let stored = repository.get_by_symbol("ABCD", 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    let record = &stored[0];
    assert_eq!(record.date, "20240603");
    assert_eq!(record.symbol, "ABCD");
    assert_eq!(record.short_volume, 1000);
    assert_eq!(record.short_exempt_volume, 200);
    assert_eq!(record.total_volume, 5000);
    assert_eq!(record.market, "N");
    assert_eq!(record.short_ratio, 20.0);
}

#[tokio::test]
async fn missing_file_is_no_data_not_an_error() {
    let base = spawn_mock_cdn(HashMap::new()).await;
    let (service, repository) = pipeline(base).await;

    let report = service.ingest_date_key("20240608".to_string()).await;
    assert!(!report.success);
    assert_eq!(report.count, 0);
    assert!(report.error.is_none());

    assert_eq!(repository.stats().await.unwrap().total_records, 0);
}

#[tokio::test]
async fn empty_body_is_no_data_not_an_error() {
    let mut files = HashMap::new();
    files.insert("CNMSshvol20240603.txt".to_string(), "   \n".to_string());
    let base = spawn_mock_cdn(files).await;
    let (service, _repository) = pipeline(base).await;

    let report = service.ingest_date_key("20240603".to_string()).await;
    assert!(!report.success);
    assert_eq!(report.count, 0);
    assert!(report.error.is_none());
}

#[tokio::test]
async fn reingesting_a_date_is_idempotent() {
    let mut files = HashMap::new();
    files.insert(
        "CNMSshvol20240603.txt".to_string(),
        "H1|H2|H3|H4|H5\n0|AAAA|100|10|1000|N\n0|BBBB|250|0|1000|Q\n".to_string(),
    );
    let base = spawn_mock_cdn(files).await;
    let (service, repository) = pipeline(base).await;

    let first = service.ingest_date_key("20240603".to_string()).await;
    assert_eq!(first.inserted, 2);

    let second = service.ingest_date_key("20240603".to_string()).await;
    assert!(second.success);
    assert_eq!(second.count, 2);
    assert_eq!(second.inserted, 0);

    assert_eq!(repository.stats().await.unwrap().total_records, 2);
}

#[tokio::test]
async fn query_surface_reflects_ingested_days() {
    let mut files = HashMap::new();
    files.insert(
        "CNMSshvol20240603.txt".to_string(),
        "H1|H2|H3|H4|H5\n0|AAAA|5000000|0|10000000|N\n0|BBBB|8000000|0|10000000|N\n".to_string(),
    );
    files.insert(
        "CNMSshvol20240604.txt".to_string(),
        "H1|H2|H3|H4|H5\n0|AAAA|2000000|0|10000000|N\n".to_string(),
    );
    let base = spawn_mock_cdn(files).await;
    let (service, repository) = pipeline(base).await;

    assert!(service.ingest_date_key("20240603".to_string()).await.success);
    assert!(service.ingest_date_key("20240604".to_string()).await.success);

    let dates = repository.distinct_dates().await.unwrap();
    assert_eq!(dates, vec!["20240604", "20240603"]);

    let top = repository
        .top_by_ratio("20240603", 10, 1_000_000)
        .await
        .unwrap();
    assert_eq!(top[0].symbol, "BBBB");

    let range = repository
        .get_by_date_range("20240603", "20240604", Some("AAAA"))
        .await
        .unwrap();
    assert_eq!(range.len(), 2);
    assert_eq!(range[0].date, "20240604");

    let symbols = repository.search_symbols("a", 20).await.unwrap();
    assert_eq!(symbols, vec!["AAAA"]);

    let stats = repository.stats().await.unwrap();
    assert_eq!(stats.total_records, 3);
    assert_eq!(stats.unique_symbols, 2);
    assert_eq!(stats.earliest_date.as_deref(), Some("20240603"));
}
