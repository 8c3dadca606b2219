//! End-to-end runs against a mock Yahoo Finance server and in-memory SQLite

mod helpers;

use helpers::{chart_response, memory_database, mount_crumb, summary_response, yahoo_settings};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yfdb_ingest::config::RunnerSettings;
use yfdb_ingest::services::YahooClient;
use yfdb_ingest::{Dataset, IngestRunner, Ingestor, Table};

fn runner_settings() -> RunnerSettings {
    RunnerSettings {
        symbol_delay_ms: 0,
        ..RunnerSettings::default()
    }
}

async fn runner(server: &MockServer) -> IngestRunner {
    let yahoo = Arc::new(YahooClient::new(&yahoo_settings(server)).unwrap());
    let ingestor = Ingestor::new(yahoo, memory_database().await);
    IngestRunner::new(ingestor, &runner_settings())
}

#[tokio::test]
async fn test_history_and_dividends_stored() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/7203.T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chart_response("7203.T")))
        .mount(&server)
        .await;

    let runner = runner(&server).await;
    let symbols = vec!["7203.T".to_string()];

    let report = runner
        .run(&symbols, &[Dataset::History, Dataset::Dividends])
        .await;

    assert!(report.is_success(), "{:?}", report.errors);
    assert_eq!(report.symbols, 1);
    assert_eq!(report.processed_for(Dataset::History), 2);
    assert_eq!(report.processed_for(Dataset::Dividends), 1);

    let db = runner.ingestor().db();
    assert_eq!(db.count(Table::History).await.unwrap(), 2);
    assert_eq!(db.count(Table::Dividends).await.unwrap(), 1);

    let (date, close): (String, f64) =
        sqlx::query_as("SELECT date, close FROM history WHERE symbol = ? ORDER BY date LIMIT 1")
            .bind("7203.T")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(date, "2024-04-01T00:00:00");
    assert_eq!(close, 3540.0);

    // Second run updates the same rows
    let again = runner.run(&symbols, &[Dataset::History]).await;
    assert_eq!(again.rows[&Dataset::History].updated, 2);
    assert_eq!(db.count(Table::History).await.unwrap(), 2);
}

#[tokio::test]
async fn test_failing_dataset_does_not_abort_run() {
    let server = MockServer::start().await;
    mount_crumb(&server, 1).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v8/finance/chart/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chart_response("7203.T")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/7203.T"))
        .and(query_param("modules", "recommendationTrend"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/6758.T"))
        .and(query_param("modules", "recommendationTrend"))
        .respond_with(ResponseTemplate::new(200).set_body_json(summary_response(json!({
            "recommendationTrend": {
                "trend": [
                    {"period": "0m", "strongBuy": 5, "buy": 8, "hold": 3, "sell": 0, "strongSell": 0},
                    {"period": "-1m", "strongBuy": 4, "buy": 9, "hold": 3, "sell": 1, "strongSell": 0}
                ]
            }
        }))))
        .mount(&server)
        .await;

    let runner = runner(&server).await;
    let symbols = vec!["7203.T".to_string(), "6758.T".to_string()];
    let report = runner
        .run(&symbols, &[Dataset::Recommendations, Dataset::History])
        .await;

    assert_eq!(report.symbols, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].symbol, "7203.T");
    assert_eq!(report.errors[0].dataset, Some(Dataset::Recommendations));
    assert!(report.errors[0].to_string().starts_with("7203.T recommendations: "));

    // History still ran for both symbols after the failure
    assert_eq!(report.processed_for(Dataset::History), 4);
    assert_eq!(report.processed_for(Dataset::Recommendations), 2);

    let db = runner.ingestor().db();
    assert_eq!(db.count(Table::StockInfo).await.unwrap(), 2);
    assert_eq!(db.count(Table::Recommendations).await.unwrap(), 2);
}

#[tokio::test]
async fn test_unknown_symbol_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/0000.T"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let runner = runner(&server).await;
    let report = runner.run(&["0000.T".to_string()], &[Dataset::History]).await;

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.processed(), 0);
    assert_eq!(runner.ingestor().db().count(Table::History).await.unwrap(), 0);
}
