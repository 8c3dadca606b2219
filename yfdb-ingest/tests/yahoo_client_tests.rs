//! Yahoo Finance client against a mock server
//!
//! Covers crumb caching, the single retry after a rejected crumb, HTTP
//! status mapping and envelope unwrapping.

mod helpers;

use helpers::{chart_response, mount_crumb, summary_response, yahoo_settings, CRUMB};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yfdb_ingest::services::{YahooClient, YahooError};

#[tokio::test]
async fn test_crumb_fetched_once_and_sent_with_requests() {
    let server = MockServer::start().await;
    mount_crumb(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/7203.T"))
        .and(query_param("crumb", CRUMB))
        .and(query_param("modules", "calendarEvents,defaultKeyStatistics"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(summary_response(json!({"calendarEvents": {"maxAge": 1}}))),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = YahooClient::new(&yahoo_settings(&server)).unwrap();
    let modules = ["calendarEvents", "defaultKeyStatistics"];

    let first = client.quote_summary("7203.T", &modules).await.unwrap();
    let second = client.quote_summary("7203.T", &modules).await.unwrap();

    assert_eq!(first["calendarEvents"]["maxAge"], 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_rejected_crumb_is_refreshed_once() {
    let server = MockServer::start().await;
    mount_crumb(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/v7/finance/quote"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v7/finance/quote"))
        .and(query_param("symbols", "6758.T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteResponse": {"result": [{"symbol": "6758.T", "sharesOutstanding": 1_230_000_000}], "error": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = YahooClient::new(&yahoo_settings(&server)).unwrap();
    let quote = client.quote("6758.T").await.unwrap();
    assert_eq!(quote["sharesOutstanding"], 1_230_000_000);
}

#[tokio::test]
async fn test_second_rejection_is_unauthorized() {
    let server = MockServer::start().await;
    mount_crumb(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/v7/finance/quote"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let client = YahooClient::new(&yahoo_settings(&server)).unwrap();
    let err = client.quote("6758.T").await.unwrap_err();
    assert!(matches!(err, YahooError::Unauthorized(403)));
}

#[tokio::test]
async fn test_status_mapping() {
    let server = MockServer::start().await;

    for (symbol, status) in [("NOPE.T", 404), ("BUSY.T", 429), ("FAIL.T", 500)] {
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{}", symbol)))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream says no"))
            .mount(&server)
            .await;
    }

    let client = YahooClient::new(&yahoo_settings(&server)).unwrap();

    assert!(matches!(
        client.chart("NOPE.T", "1y", "1d").await,
        Err(YahooError::NotFound(_))
    ));
    assert!(matches!(
        client.chart("BUSY.T", "1y", "1d").await,
        Err(YahooError::RateLimitExceeded)
    ));
    match client.chart("FAIL.T", "1y", "1d").await {
        Err(YahooError::ApiError(500, body)) => assert_eq!(body, "upstream says no"),
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chart_does_not_need_crumb() {
    let server = MockServer::start().await;
    mount_crumb(&server, 0).await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/7203.T"))
        .and(query_param("range", "1y"))
        .and(query_param("interval", "1d"))
        .and(query_param("events", "div,splits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chart_response("7203.T")))
        .expect(1)
        .mount(&server)
        .await;

    let client = YahooClient::new(&yahoo_settings(&server)).unwrap();
    let chart = client.chart("7203.T", "1y", "1d").await.unwrap();
    assert_eq!(chart["meta"]["symbol"], "7203.T");
    assert_eq!(chart["timestamp"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_summary_not_found_envelope() {
    let server = MockServer::start().await;
    mount_crumb(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/XXXX.T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for symbol: XXXX.T"}
            }
        })))
        .mount(&server)
        .await;

    let client = YahooClient::new(&yahoo_settings(&server)).unwrap();
    let err = client.quote_summary("XXXX.T", &["price"]).await.unwrap_err();
    assert!(matches!(err, YahooError::NotFound(s) if s == "XXXX.T"));
}

#[tokio::test]
async fn test_news_and_timeseries_unwrap_arrays() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/xhr/ncp"))
        .and(query_param("queryRef", "latestNews"))
        .and(body_partial_json(json!({"serviceConfig": {"snippetCount": 5, "s": ["7203.T"]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"tickerStream": {"stream": [{"id": "a1"}, {"id": "a2"}]}}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/xhr/ncp"))
        .and(body_partial_json(json!({"serviceConfig": {"s": ["1301.T"]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"tickerStream": {"stream": null}}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ws/fundamentals-timeseries/v1/finance/timeseries/7203.T"))
        .and(query_param("type", "annualTotalRevenue,annualNetIncome"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timeseries": {"result": [{"meta": {"type": ["annualTotalRevenue"]}}], "error": null}
        })))
        .mount(&server)
        .await;

    let client = YahooClient::new(&yahoo_settings(&server)).unwrap();

    let stream = client.news("7203.T", 5).await.unwrap();
    assert_eq!(stream.as_array().unwrap().len(), 2);

    let types = vec!["annualTotalRevenue".to_string(), "annualNetIncome".to_string()];
    let series = client.timeseries("7203.T", &types, 0, 1).await.unwrap();
    assert_eq!(series[0]["meta"]["type"][0], "annualTotalRevenue");

    let empty = client.news("1301.T", 5).await.unwrap();
    assert_eq!(empty, json!([]));
}
