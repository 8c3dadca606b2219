//! Configuration file resolution and loading
//!
//! Bootstrap configuration is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config file (`~/.config/<app>/config.toml` on Linux)
//! 4. System config file (`/etc/<app>/config.toml`)
//! 5. Compiled defaults (no file)
//!
//! Individual settings may then be overridden by environment variables,
//! which the calling crate applies on top of the parsed file.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load a `.env` file from the working directory (or its parents) if one exists
///
/// Existing process variables are never overwritten.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(_) => None,
    }
}

/// Resolve which configuration file to read, if any
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    app_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Some(path) = env_string(env_var_name) {
        return Some(PathBuf::from(path));
    }

    // Priority 3/4: platform config locations
    default_config_locations(app_name)
        .into_iter()
        .find(|path| path.exists())
}

/// Platform config file candidates, most specific first
pub fn default_config_locations(app_name: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(app_name).join("config.toml"));
    }

    if cfg!(unix) {
        candidates.push(PathBuf::from("/etc").join(app_name).join("config.toml"));
    }

    candidates
}

/// Parse a TOML configuration file, or return defaults when no file was resolved
///
/// A path that was resolved but cannot be read is an error: an explicitly
/// requested file must not be silently ignored.
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        debug!("No configuration file found, using built-in defaults");
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    debug!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Read an environment variable, treating empty / whitespace values as unset
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a boolean environment variable (`true`/`1`/`yes`/`on`, case-insensitive)
pub fn env_flag(name: &str) -> Option<bool> {
    env_string(name).map(|v| {
        matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        count: u32,
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        let config: Sample = load_toml_config(None).unwrap();
        assert_eq!(config, Sample::default());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result: Result<Sample> =
            load_toml_config(Some(Path::new("/nonexistent/yfdb/config.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_cli_argument_wins() {
        let path = resolve_config_path(
            Some(Path::new("/tmp/explicit.toml")),
            "YFDB_TEST_UNUSED_CONFIG_VAR",
            "yfdb-test",
        );
        assert_eq!(path, Some(PathBuf::from("/tmp/explicit.toml")));
    }

    #[test]
    fn test_default_locations_are_app_scoped() {
        let locations = default_config_locations("yfdb-test");
        assert!(!locations.is_empty());
        assert!(locations
            .iter()
            .all(|p| p.to_string_lossy().contains("yfdb-test")));
    }
}
