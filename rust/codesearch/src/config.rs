//! Engine configuration.
//!
//! Environment variables:
//! - `CODESEARCH_VOLUME` — data directory (default `./db`)
//! - `CODESEARCH_REPO_*` — repositories ingested at startup, one per variable
//! - `CODESEARCH_DEV` — `true` enables development mode (debug logging)

use std::env;
use std::path::PathBuf;

pub const VOLUME_VAR: &str = "CODESEARCH_VOLUME";
pub const REPO_VAR_PREFIX: &str = "CODESEARCH_REPO_";
pub const DEV_VAR: &str = "CODESEARCH_DEV";
pub const DEFAULT_DATA_DIR: &str = "./db";

/// Where the engine keeps its data and what it ingests on startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the segment file and the content store.
    pub data_dir: PathBuf,
    /// Repository locators ingested when the engine starts.
    pub initial_repositories: Vec<String>,
    pub dev_mode: bool,
}

impl Config {
    /// Config rooted at `data_dir` with no initial repositories.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
            initial_repositories: Vec::new(),
            dev_mode: false,
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a configuration from `(name, value)` pairs.
    ///
    /// Initial repositories are ordered by variable name so startup
    /// ingestion is deterministic.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut config = Config::new(DEFAULT_DATA_DIR);
        let mut repos: Vec<(String, String)> = Vec::new();

        for (name, value) in vars {
            if name == VOLUME_VAR {
                if !value.is_empty() {
                    config.data_dir = PathBuf::from(value);
                }
            } else if name == DEV_VAR {
                config.dev_mode = value == "true";
            } else if name.starts_with(REPO_VAR_PREFIX) && !value.trim().is_empty() {
                repos.push((name, value));
            }
        }

        repos.sort();
        config.initial_repositories = repos.into_iter().map(|(_, v)| v).collect();
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(DEFAULT_DATA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&[("HOME", "/root")]));
        assert_eq!(config, Config::default());
        assert_eq!(config.data_dir, PathBuf::from("./db"));
    }

    #[test]
    fn test_reads_variables() {
        let config = Config::from_vars(vars(&[
            ("CODESEARCH_VOLUME", "/data"),
            ("CODESEARCH_REPO_B", "https://git.example/b"),
            ("CODESEARCH_REPO_A", "https://git.example/a"),
            ("CODESEARCH_REPO_EMPTY", ""),
            ("CODESEARCH_DEV", "true"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert!(config.dev_mode);
        assert_eq!(
            config.initial_repositories,
            vec!["https://git.example/a", "https://git.example/b"]
        );
    }

    #[test]
    fn test_dev_mode_requires_true() {
        let config = Config::from_vars(vars(&[("CODESEARCH_DEV", "1")]));
        assert!(!config.dev_mode);
    }
}
