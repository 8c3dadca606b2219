//! Configuration for yfdb-ingest
//!
//! Loaded from TOML (see `yfdb_common::config` for the file lookup order),
//! then overridden by environment variables:
//!
//! | variable | setting |
//! |---|---|
//! | `DATABASE_URL` | `database.url` |
//! | `PG_URL` | `database.url` when `DATABASE_URL` is unset (rejected at open: SQLite only) |
//! | `DB_ECHO` | `database.echo` |
//! | `JQUANTS_URL` | `jquants.base_url` |
//! | `JQUANTS_MAIL` | `jquants.mail` |
//! | `JQUANTS_PASS` | `jquants.password` |
//! | `YFDB_LOG` | `logging.level` |

use serde::Deserialize;
use std::path::{Path, PathBuf};
use yfdb_common::config::{env_flag, env_string, load_dotenv, load_toml_config, resolve_config_path};
use yfdb_common::db::DatabaseOptions;
use yfdb_common::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "YFDB_CONFIG";

/// Application name used for platform config paths
pub const APP_NAME: &str = "yfdb";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub database: DatabaseOptions,
    pub yahoo: YahooSettings,
    pub jquants: JQuantsSettings,
    pub runner: RunnerSettings,
    pub logging: LoggingSettings,
    /// File the settings were read from; `None` for built-in defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Yahoo Finance endpoints and request behaviour
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct YahooSettings {
    /// JSON API host
    pub base_url: String,
    /// Page fetched once to obtain the session cookie
    pub cookie_url: String,
    /// News stream endpoint
    pub news_url: String,
    pub requests_per_second: u32,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Adjust OHLC by the adjusted-close ratio
    pub auto_adjust: bool,
    /// Also ingest quarterly balance sheet, cash flow and financials
    pub quarterly_statements: bool,
    /// Articles requested per symbol
    pub news_count: u32,
    /// Earnings dates requested per symbol
    pub earnings_dates_limit: u32,
}

impl Default for YahooSettings {
    fn default() -> Self {
        Self {
            base_url: "https://query2.finance.yahoo.com".to_string(),
            cookie_url: "https://fc.yahoo.com".to_string(),
            news_url: "https://finance.yahoo.com/xhr/ncp".to_string(),
            requests_per_second: 2,
            timeout_secs: 30,
            user_agent: concat!(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
                "(KHTML, like Gecko) Chrome/124.0 Safari/537.36"
            )
            .to_string(),
            auto_adjust: true,
            quarterly_statements: false,
            news_count: 10,
            earnings_dates_limit: 12,
        }
    }
}

/// J-Quants API access
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct JQuantsSettings {
    pub base_url: String,
    pub mail: Option<String>,
    pub password: Option<String>,
}

impl Default for JQuantsSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.jquants.com/v1".to_string(),
            mail: None,
            password: None,
        }
    }
}

/// Symbol iteration behaviour
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Pause between symbols
    pub symbol_delay_ms: u64,
    /// Appended to codes without an exchange suffix
    pub ticker_suffix: String,
    /// Leading characters of a J-Quants `Code` that form the ticker
    pub code_length: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            symbol_delay_ms: 100,
            ticker_suffix: ".T".to_string(),
            code_length: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `info` or `yfdb_ingest=debug,info`
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl IngestConfig {
    /// Load `.env`, the resolved TOML file, then environment overrides
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        load_dotenv();
        let path = resolve_config_path(cli_path, CONFIG_ENV_VAR, APP_NAME);
        let mut config: IngestConfig = load_toml_config(path.as_deref())?;
        config.source = path;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_string("DATABASE_URL").or_else(|| env_string("PG_URL")) {
            self.database.url = url;
        }
        if let Some(echo) = env_flag("DB_ECHO") {
            self.database.echo = echo;
        }
        if let Some(url) = env_string("JQUANTS_URL") {
            self.jquants.base_url = url;
        }
        if let Some(mail) = env_string("JQUANTS_MAIL") {
            self.jquants.mail = Some(mail);
        }
        if let Some(password) = env_string("JQUANTS_PASS") {
            self.jquants.password = Some(password);
        }
        if let Some(level) = env_string("YFDB_LOG") {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.yahoo.requests_per_second == 0 {
            return Err(Error::Config(
                "yahoo.requests_per_second must be greater than zero".to_string(),
            ));
        }
        if self.runner.code_length == 0 {
            return Err(Error::Config("runner.code_length must be greater than zero".to_string()));
        }
        if self.yahoo.base_url.trim().is_empty() {
            return Err(Error::Config("yahoo.base_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// J-Quants credentials, required when symbols come from the listing
    pub fn jquants_credentials(&self) -> Result<(&str, &str)> {
        let mail = self.jquants.mail.as_deref().filter(|m| !m.is_empty());
        let password = self.jquants.password.as_deref().filter(|p| !p.is_empty());
        match (mail, password) {
            (Some(mail), Some(password)) => Ok((mail, password)),
            _ => Err(Error::Config(
                "J-Quants credentials missing: set JQUANTS_MAIL and JQUANTS_PASS \
                 (or jquants.mail / jquants.password), or pass --symbols"
                    .to_string(),
            )),
        }
    }
}
