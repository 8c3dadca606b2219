//! Integration tests for configuration resolution
//!
//! Tests that manipulate process environment are marked with #[serial]
//! so they do not race each other.

use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use yfdb_common::config::{env_flag, env_string, load_toml_config, resolve_config_path};
use yfdb_common::db::DatabaseOptions;
use yfdb_common::Error;

#[derive(Debug, Default, Deserialize)]
struct TestConfig {
    #[serde(default)]
    database: DatabaseOptions,
}

#[test]
#[serial]
fn test_env_var_used_when_no_cli_argument() {
    env::set_var("YFDB_TEST_CONFIG", "/tmp/from-env.toml");

    let path = resolve_config_path(None, "YFDB_TEST_CONFIG", "yfdb-test-app");
    assert_eq!(path.as_deref(), Some(std::path::Path::new("/tmp/from-env.toml")));

    env::remove_var("YFDB_TEST_CONFIG");
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var("YFDB_TEST_CONFIG", "   ");

    let path = resolve_config_path(None, "YFDB_TEST_CONFIG", "yfdb-test-app-that-has-no-file");
    assert_eq!(path, None);

    env::remove_var("YFDB_TEST_CONFIG");
}

#[test]
#[serial]
fn test_env_flag_parsing() {
    for (raw, expected) in [("true", true), ("TRUE", true), ("1", true), ("yes", true), ("false", false), ("0", false)] {
        env::set_var("YFDB_TEST_FLAG", raw);
        assert_eq!(env_flag("YFDB_TEST_FLAG"), Some(expected), "value {raw}");
    }
    env::remove_var("YFDB_TEST_FLAG");
    assert_eq!(env_flag("YFDB_TEST_FLAG"), None);
    assert_eq!(env_string("YFDB_TEST_FLAG"), None);
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[database]\nurl = \"sqlite:///var/lib/yfdb/yfdb.db\"\necho = true").unwrap();

    let config: TestConfig = load_toml_config(Some(file.path())).unwrap();

    assert_eq!(config.database.url, "sqlite:///var/lib/yfdb/yfdb.db");
    assert!(config.database.echo);
    assert_eq!(config.database.max_connections, DatabaseOptions::default().max_connections);
}

#[test]
fn test_malformed_toml_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[database\nurl = ").unwrap();

    let result: yfdb_common::Result<TestConfig> = load_toml_config(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}
