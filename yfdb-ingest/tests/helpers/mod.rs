//! Test Helper Utilities
//!
//! Mock Yahoo Finance server setup and canned responses shared by the
//! integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yfdb_common::db::DatabaseOptions;
use yfdb_ingest::config::YahooSettings;
use yfdb_ingest::Database;

pub const CRUMB: &str = "Xk3pQ9zT1mA";

/// Settings pointing every Yahoo endpoint at the mock server
pub fn yahoo_settings(server: &MockServer) -> YahooSettings {
    YahooSettings {
        base_url: server.uri(),
        cookie_url: format!("{}/cookie", server.uri()),
        news_url: format!("{}/xhr/ncp", server.uri()),
        requests_per_second: 1000,
        timeout_secs: 5,
        ..YahooSettings::default()
    }
}

/// Serve the crumb, expecting exactly `times` crumb requests
pub async fn mount_crumb(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/test/getcrumb"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CRUMB))
        .expect(times)
        .mount(server)
        .await;
}

/// Fresh in-memory database with every table
pub async fn memory_database() -> Database {
    Database::open(&DatabaseOptions::in_memory())
        .await
        .expect("in-memory database")
}

/// v8 chart envelope with three Tokyo daily bars, the middle one empty
pub fn chart_response(symbol: &str) -> Value {
    json!({
        "chart": {
            "result": [{
                "meta": {
                    "currency": "JPY",
                    "symbol": symbol,
                    "exchangeName": "JPX",
                    "instrumentType": "EQUITY",
                    "exchangeTimezoneName": "Asia/Tokyo",
                    "gmtoffset": 32400,
                    "regularMarketPrice": 3550.0
                },
                "timestamp": [1_711_897_200, 1_711_983_600, 1_712_070_000],
                "events": {
                    "dividends": {
                        "1711897200": {"amount": 30.0, "date": 1_711_897_200}
                    }
                },
                "indicators": {
                    "quote": [{
                        "open":   [3500.0, null, 3520.0],
                        "high":   [3560.0, null, 3580.0],
                        "low":    [3480.0, null, 3500.0],
                        "close":  [3540.0, null, 3550.0],
                        "volume": [20_000_000, null, 21_000_000]
                    }],
                    "adjclose": [{"adjclose": [3540.0, null, 3550.0]}]
                }
            }],
            "error": null
        }
    })
}

/// quoteSummary envelope around one result object
pub fn summary_response(result: Value) -> Value {
    json!({"quoteSummary": {"result": [result], "error": null}})
}
