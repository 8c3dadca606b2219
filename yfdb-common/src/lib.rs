//! # yfdb Common Library
//!
//! Shared code for the yfdb crates:
//! - Error type
//! - Configuration file resolution
//! - SQLite pool setup, declarative schema and generic upsert
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
