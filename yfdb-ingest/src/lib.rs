//! yfdb-ingest library interface
//!
//! Fetches Yahoo Finance data for Tokyo Stock Exchange tickers and upserts
//! it into SQLite, one table per dataset.

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod runner;
pub mod sample;
pub mod services;
pub mod symbols;

pub use crate::config::IngestConfig;
pub use crate::db::{Database, Table};
pub use crate::error::{IngestError, Result};
pub use crate::ingest::{Dataset, Ingestor};
pub use crate::runner::{IngestRunner, RunError, RunReport, Schedule};
pub use crate::symbols::{resolve_symbols, SymbolSource};
