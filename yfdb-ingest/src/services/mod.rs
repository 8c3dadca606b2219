//! Remote data sources

pub mod jquants_client;
pub mod yahoo_client;

pub use jquants_client::{JQuantsClient, JQuantsError, ListedCompany};
pub use yahoo_client::{YahooClient, YahooError, INFO_MODULES};
