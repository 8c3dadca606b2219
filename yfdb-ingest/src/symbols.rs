//! Symbol universe: J-Quants listing, CLI list or symbol file

use crate::config::{IngestConfig, RunnerSettings};
use crate::error::{IngestError, Result};
use crate::services::JQuantsClient;
use std::path::Path;
use tracing::info;

/// Where the symbols of a run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolSource {
    /// Every listed company on J-Quants
    JQuants,
    /// Explicit codes or tickers
    List(Vec<String>),
    /// One code per line; `#` starts a comment
    File(std::path::PathBuf),
}

/// Append the ticker suffix to bare codes (`7203` -> `7203.T`)
pub fn to_ticker(code: &str, suffix: &str) -> String {
    let code = code.trim();
    if code.contains('.') || suffix.is_empty() {
        code.to_string()
    } else {
        format!("{}{}", code, suffix)
    }
}

/// Split a comma/whitespace separated list
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Codes of a symbol file, comments and blank lines removed
pub fn parse_symbol_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(parse_list)
        .collect()
}

fn normalize(codes: Vec<String>, runner: &RunnerSettings, limit: Option<usize>) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    for code in codes {
        let ticker = to_ticker(&code, &runner.ticker_suffix);
        if !tickers.contains(&ticker) {
            tickers.push(ticker);
        }
    }
    if let Some(limit) = limit {
        tickers.truncate(limit);
    }
    tickers
}

async fn read_symbol_file(path: &Path) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        IngestError::InvalidInput(format!("cannot read symbol file {}: {}", path.display(), e))
    })?;
    Ok(parse_symbol_file(&contents))
}

/// Resolve the tickers of a run
pub async fn resolve_symbols(
    source: &SymbolSource,
    config: &IngestConfig,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let codes = match source {
        SymbolSource::List(codes) => codes.clone(),
        SymbolSource::File(path) => read_symbol_file(path).await?,
        SymbolSource::JQuants => {
            let (mail, password) = config.jquants_credentials()?;
            let client = JQuantsClient::authenticate(&config.jquants.base_url, mail, password).await?;
            client.symbols(config.runner.code_length).await?
        }
    };

    let tickers = normalize(codes, &config.runner, limit);
    info!(symbols = tickers.len(), source = ?source, "Resolved symbols");
    Ok(tickers)
}
