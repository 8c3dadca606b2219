//! Common error types for yfdb

use thiserror::Error;

/// Common result type for yfdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the yfdb crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (unknown column, malformed row, bad argument)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for SQLite writer contention (SQLITE_BUSY / SQLITE_LOCKED)
    ///
    /// Errors without a driver code fall back to the message text.
    pub fn is_lock_error(&self) -> bool {
        let Error::Database(db_err) = self else {
            return false;
        };
        if let sqlx::Error::Database(e) = db_err {
            if let Some(code) = e.code() {
                return is_busy_code(&code);
            }
        }
        let msg = db_err.to_string();
        msg.contains("database is locked") || msg.contains("database is busy")
    }
}

/// Primary result code 5 (BUSY) or 6 (LOCKED), extended codes included
fn is_busy_code(code: &str) -> bool {
    code.parse::<i32>()
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}
