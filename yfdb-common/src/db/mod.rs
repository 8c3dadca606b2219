//! Database access: pool setup, declarative schema, upsert, lock retry

pub mod init;
pub mod retry;
pub mod schema_sync;
pub mod upsert;

pub use init::*;
pub use retry::retry_on_lock;
pub use schema_sync::*;
pub use upsert::*;
