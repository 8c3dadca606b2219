//! J-Quants API client
//!
//! Authenticates with mail address and password (refresh token, then ID
//! token) and lists the companies listed on the Tokyo Stock Exchange.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// J-Quants client errors
#[derive(Debug, Error)]
pub enum JQuantsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Response missing {0}")]
    MissingToken(&'static str),
}

/// One entry of `/listed/info`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListedCompany {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_name_english: Option<String>,
    #[serde(default)]
    pub market_code: Option<String>,
    #[serde(default)]
    pub sector17_code: Option<String>,
    #[serde(default)]
    pub sector33_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenResponse {
    #[serde(rename = "idToken")]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListedInfoResponse {
    #[serde(default)]
    info: Option<Vec<ListedCompany>>,
}

/// Authenticated J-Quants client
pub struct JQuantsClient {
    http: reqwest::Client,
    base_url: String,
    id_token: String,
}

impl JQuantsClient {
    /// Authenticate and return a client carrying the ID token
    pub async fn authenticate(base_url: &str, mail: &str, password: &str) -> Result<Self, JQuantsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| JQuantsError::NetworkError(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let response = http
            .post(format!("{}/token/auth_user", base_url))
            .json(&json!({ "mailaddress": mail, "password": password }))
            .send()
            .await
            .map_err(|e| JQuantsError::NetworkError(e.to_string()))?;
        let refresh: RefreshTokenResponse = Self::parse(response).await?;
        let refresh_token = refresh
            .refresh_token
            .ok_or(JQuantsError::MissingToken("refreshToken"))?;
        debug!("Obtained J-Quants refresh token");

        let response = http
            .post(format!("{}/token/auth_refresh", base_url))
            .query(&[("refreshtoken", refresh_token.as_str())])
            .send()
            .await
            .map_err(|e| JQuantsError::NetworkError(e.to_string()))?;
        let id: IdTokenResponse = Self::parse(response).await?;
        let id_token = id.id_token.ok_or(JQuantsError::MissingToken("idToken"))?;

        info!("Authenticated with J-Quants");

        Ok(Self {
            http,
            base_url,
            id_token,
        })
    }

    /// All listed companies; a response without `info` is an empty list
    pub async fn listed_companies(&self) -> Result<Vec<ListedCompany>, JQuantsError> {
        let response = self
            .http
            .get(format!("{}/listed/info", self.base_url))
            .bearer_auth(&self.id_token)
            .send()
            .await
            .map_err(|e| JQuantsError::NetworkError(e.to_string()))?;
        let listed: ListedInfoResponse = Self::parse(response).await?;
        let companies = listed.info.unwrap_or_default();
        info!(companies = companies.len(), "Fetched J-Quants listing");
        Ok(companies)
    }

    /// Ticker codes of the listing: first `code_length` characters of each
    /// `Code`, de-duplicated in listing order
    pub async fn symbols(&self, code_length: usize) -> Result<Vec<String>, JQuantsError> {
        let companies = self.listed_companies().await?;
        Ok(codes_from_companies(&companies, code_length))
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, JQuantsError> {
        let status = response.status();

        if status == 400 || status == 401 || status == 403 {
            let message = response.text().await.unwrap_or_default();
            return Err(JQuantsError::Unauthorized(message));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(JQuantsError::ApiError(status.as_u16(), message));
        }

        response
            .json()
            .await
            .map_err(|e| JQuantsError::ParseError(e.to_string()))
    }
}

/// Truncate and de-duplicate listing codes (`"72030"` → `"7203"`)
pub fn codes_from_companies(companies: &[ListedCompany], code_length: usize) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for company in companies {
        let code: String = company.code.trim().chars().take(code_length).collect();
        if code.is_empty() || codes.contains(&code) {
            continue;
        }
        codes.push(code);
    }
    codes
}
