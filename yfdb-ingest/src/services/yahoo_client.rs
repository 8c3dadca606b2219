//! Yahoo Finance API client
//!
//! Covers the JSON endpoints the ingesters read: quoteSummary modules, v7
//! quote, v8 chart, fundamentals timeseries, the news stream and the
//! earnings calendar visualization query.
//!
//! quoteSummary, quote and visualization require a crumb. The crumb is
//! obtained once per client (cookie page, then `getcrumb`) and cached; an
//! HTTP 401/403 drops it and the request is retried once with a fresh one.
//! Every outgoing request waits on a `governor` rate limiter.

use crate::config::YahooSettings;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Method;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Modules merged into the `stock_info` record
pub const INFO_MODULES: &[&str] = &[
    "assetProfile",
    "summaryDetail",
    "financialData",
    "defaultKeyStatistics",
    "price",
    "quoteType",
];

/// Yahoo Finance client errors
#[derive(Debug, Error)]
pub enum YahooError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Unauthorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Yahoo Finance API client
pub struct YahooClient {
    http: reqwest::Client,
    settings: YahooSettings,
    crumb: Mutex<Option<String>>,
    rate_limiter: DefaultDirectRateLimiter,
}

impl YahooClient {
    pub fn new(settings: &YahooSettings) -> Result<Self, YahooError> {
        let per_second = NonZeroU32::new(settings.requests_per_second).ok_or_else(|| {
            YahooError::InvalidConfig("requests_per_second must be greater than zero".to_string())
        })?;

        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .cookie_store(true)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| YahooError::NetworkError(e.to_string()))?;

        Ok(Self {
            http,
            settings: settings.clone(),
            crumb: Mutex::new(None),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    pub fn settings(&self) -> &YahooSettings {
        &self.settings
    }

    /// quoteSummary modules for one symbol (`quoteSummary.result[0]`)
    pub async fn quote_summary(&self, symbol: &str, modules: &[&str]) -> Result<Value, YahooError> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}",
            self.settings.base_url, symbol
        );
        let query = vec![
            ("modules", modules.join(",")),
            ("formatted", "false".to_string()),
        ];
        let response = self.request_json(Method::GET, &url, &query, None, true).await?;
        first_result(&response, "quoteSummary", symbol)
    }

    /// v7 quote for one symbol (`quoteResponse.result[0]`)
    pub async fn quote(&self, symbol: &str) -> Result<Value, YahooError> {
        let url = format!("{}/v7/finance/quote", self.settings.base_url);
        let query = vec![("symbols", symbol.to_string())];
        let response = self.request_json(Method::GET, &url, &query, None, true).await?;
        first_result(&response, "quoteResponse", symbol)
    }

    /// v8 chart with dividend and split events (`chart.result[0]`)
    pub async fn chart(&self, symbol: &str, range: &str, interval: &str) -> Result<Value, YahooError> {
        let url = format!("{}/v8/finance/chart/{}", self.settings.base_url, symbol);
        let query = vec![
            ("range", range.to_string()),
            ("interval", interval.to_string()),
            ("events", "div,splits".to_string()),
            ("includePrePost", "false".to_string()),
        ];
        let response = self.request_json(Method::GET, &url, &query, None, false).await?;
        first_result(&response, "chart", symbol)
    }

    /// Fundamentals timeseries entries (`timeseries.result`)
    pub async fn timeseries(
        &self,
        symbol: &str,
        types: &[String],
        period1: i64,
        period2: i64,
    ) -> Result<Value, YahooError> {
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}",
            self.settings.base_url, symbol
        );
        let query = vec![
            ("symbol", symbol.to_string()),
            ("type", types.join(",")),
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
        ];
        let response = self.request_json(Method::GET, &url, &query, None, false).await?;
        if let Some(message) = error_description(&response, "timeseries") {
            return Err(YahooError::ApiError(200, message));
        }
        Ok(array_or_empty(&response["timeseries"]["result"]))
    }

    /// Latest news stream items (`data.tickerStream.stream`)
    pub async fn news(&self, symbol: &str, count: u32) -> Result<Value, YahooError> {
        let query = vec![
            ("queryRef", "latestNews".to_string()),
            ("serviceKey", "ncp_fin".to_string()),
        ];
        let body = json!({
            "serviceConfig": {
                "snippetCount": count,
                "s": [symbol],
            }
        });
        let response = self
            .request_json(Method::POST, &self.settings.news_url, &query, Some(&body), false)
            .await?;
        Ok(array_or_empty(&response["data"]["tickerStream"]["stream"]))
    }

    /// Earnings calendar table (`finance.result[0].documents[0]`), `Null` when absent
    pub async fn earnings_calendar(&self, symbol: &str, size: u32) -> Result<Value, YahooError> {
        let url = format!("{}/v1/finance/visualization", self.settings.base_url);
        let query = vec![("lang", "en-US".to_string()), ("region", "US".to_string())];
        let body = json!({
            "size": size,
            "query": {
                "operator": "eq",
                "operands": ["ticker", symbol],
            },
            "sortField": "startdatetime",
            "sortType": "DESC",
            "entityIdType": "earnings",
            "includeFields": [
                "startdatetime",
                "timeZoneShortName",
                "gmtOffsetMilliSeconds",
                "epsestimate",
                "epsactual",
                "epssurprisepct",
            ],
        });
        let response = self
            .request_json(Method::POST, &url, &query, Some(&body), true)
            .await?;
        if let Some(message) = error_description(&response, "finance") {
            return Err(YahooError::ApiError(200, message));
        }
        Ok(response["finance"]["result"][0]["documents"][0].clone())
    }

    async fn request_json(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        with_crumb: bool,
    ) -> Result<Value, YahooError> {
        let mut retried = false;

        loop {
            let mut params: Vec<(&str, String)> = query.to_vec();
            if with_crumb {
                params.push(("crumb", self.crumb().await?));
            }

            self.rate_limiter.until_ready().await;
            debug!(method = %method, url = %url, "Querying Yahoo Finance");

            let mut request = self.http.request(method.clone(), url).query(&params);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| YahooError::NetworkError(e.to_string()))?;

            let status = response.status();
            if with_crumb && !retried && (status == 401 || status == 403) {
                warn!(url = %url, status = status.as_u16(), "Crumb rejected, refreshing session");
                self.clear_crumb().await;
                retried = true;
                continue;
            }

            return Self::parse_response(response, url).await;
        }
    }

    async fn parse_response(response: reqwest::Response, url: &str) -> Result<Value, YahooError> {
        let status = response.status();

        if status == 404 {
            return Err(YahooError::NotFound(url.to_string()));
        }

        if status == 429 {
            return Err(YahooError::RateLimitExceeded);
        }

        if status == 401 || status == 403 {
            return Err(YahooError::Unauthorized(status.as_u16()));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(YahooError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| YahooError::ParseError(e.to_string()))
    }

    /// Cached crumb, fetching cookie and crumb on first use
    async fn crumb(&self) -> Result<String, YahooError> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        // The cookie page answers with an error status but still sets the session cookie
        self.rate_limiter.until_ready().await;
        match self.http.get(&self.settings.cookie_url).send().await {
            Ok(response) => debug!(status = response.status().as_u16(), "Session cookie requested"),
            Err(e) => warn!("Session cookie request failed: {}", e),
        }

        self.rate_limiter.until_ready().await;
        let url = format!("{}/v1/test/getcrumb", self.settings.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| YahooError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 429 {
            return Err(YahooError::RateLimitExceeded);
        }
        if !status.is_success() {
            return Err(YahooError::Unauthorized(status.as_u16()));
        }

        let crumb = response
            .text()
            .await
            .map_err(|e| YahooError::NetworkError(e.to_string()))?
            .trim()
            .to_string();

        if crumb.is_empty() || crumb.contains('<') || crumb.contains(char::is_whitespace) {
            return Err(YahooError::ParseError(format!("Invalid crumb: {:?}", crumb)));
        }

        debug!("Obtained Yahoo crumb");
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn clear_crumb(&self) {
        *self.crumb.lock().await = None;
    }
}

/// `<root>.error.description`, if the envelope reports an error
fn error_description(response: &Value, root: &str) -> Option<String> {
    let error = &response[root]["error"];
    error["description"]
        .as_str()
        .or_else(|| error["code"].as_str())
        .map(str::to_string)
}

/// `<root>.result[0]` of a Yahoo envelope
fn first_result(response: &Value, root: &str, symbol: &str) -> Result<Value, YahooError> {
    if let Some(message) = error_description(response, root) {
        if message.to_ascii_lowercase().contains("not found") {
            return Err(YahooError::NotFound(symbol.to_string()));
        }
        return Err(YahooError::ApiError(200, message));
    }

    match response[root]["result"].get(0) {
        Some(result) if !result.is_null() => Ok(result.clone()),
        _ => Err(YahooError::NotFound(symbol.to_string())),
    }
}

fn array_or_empty(value: &Value) -> Value {
    if value.is_array() {
        value.clone()
    } else {
        Value::Array(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_result() {
        let response = json!({"chart": {"result": [{"meta": {"symbol": "7203.T"}}], "error": null}});
        let result = first_result(&response, "chart", "7203.T").unwrap();
        assert_eq!(result["meta"]["symbol"], "7203.T");
    }

    #[test]
    fn test_first_result_not_found() {
        let response = json!({
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for symbol: XXXX.T"}
            }
        });
        assert!(matches!(
            first_result(&response, "quoteSummary", "XXXX.T"),
            Err(YahooError::NotFound(s)) if s == "XXXX.T"
        ));

        let empty = json!({"quoteResponse": {"result": [], "error": null}});
        assert!(matches!(
            first_result(&empty, "quoteResponse", "XXXX.T"),
            Err(YahooError::NotFound(_))
        ));
    }

    #[test]
    fn test_envelope_error_is_api_error() {
        let response = json!({"chart": {"result": null, "error": {"code": "Bad Request", "description": "Invalid input - interval=1m is not supported"}}});
        assert!(matches!(
            first_result(&response, "chart", "7203.T"),
            Err(YahooError::ApiError(200, _))
        ));
    }

    #[test]
    fn test_zero_rate_rejected() {
        let settings = YahooSettings {
            requests_per_second: 0,
            ..YahooSettings::default()
        };
        assert!(matches!(YahooClient::new(&settings), Err(YahooError::InvalidConfig(_))));
    }
}
