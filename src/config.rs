// Hardcover Mirror - Local cache and search for Hardcover libraries
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Runtime configuration
//!
//! A `Config` value is built once per invocation (usually from the environment
//! the launcher exports) and passed explicitly to every component that needs it.
//!
//! # Environment
//! - `HARDCOVER_API_TOKEN` - API token, sent verbatim in the `Authorization` header
//! - `alfred_workflow_data` - data directory holding the store and sidecar files
//! - `RESULT_LENGTH` - page size for remote catalog search (default 9)
//! - `CHECKRATE` - days between remote staleness checks (default 1)

use crate::error::{HardcoverError, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ENV_API_TOKEN: &str = "HARDCOVER_API_TOKEN";
pub const ENV_DATA_DIR: &str = "alfred_workflow_data";
pub const ENV_RESULT_LENGTH: &str = "RESULT_LENGTH";
pub const ENV_CHECK_RATE: &str = "CHECKRATE";

/// Default number of remote catalog results
pub const DEFAULT_RESULT_LENGTH: u32 = 9;

/// Default number of days between staleness checks
pub const DEFAULT_CHECK_RATE_DAYS: i64 = 1;

/// Longest accepted interval between staleness checks (ten years)
pub const MAX_CHECK_RATE_DAYS: i64 = 3650;

const DATABASE_FILE: &str = "books.db";
const COVERS_DIR: &str = "covers";
const LAST_SYNCED_FILE: &str = "lastUpdatedLocal";
const IDENTITY_FILE: &str = "userID";
const SEARCH_CACHE_FILE: &str = "searchCache.json";

/// Base URL for a book's public page; the book slug is appended
pub const BOOK_URL_BASE: &str = "https://hardcover.app/books/";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: Option<String>,
    pub data_dir: PathBuf,
    pub result_length: u32,
    pub check_rate_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            data_dir: PathBuf::from("."),
            result_length: DEFAULT_RESULT_LENGTH,
            check_rate_days: DEFAULT_CHECK_RATE_DAYS,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Build configuration from the process environment
    ///
    /// Unparseable numeric values fall back to their defaults with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ConfigBuilder::new();

        if let Some(token) = lookup(ENV_API_TOKEN).filter(|t| !t.trim().is_empty()) {
            builder = builder.api_token(token);
        }

        match lookup(ENV_DATA_DIR).filter(|d| !d.is_empty()) {
            Some(dir) => builder = builder.data_dir(dir),
            None => warn!("{} is not set, using the current directory", ENV_DATA_DIR),
        }

        if let Some(raw) = lookup(ENV_RESULT_LENGTH) {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => builder = builder.result_length(n),
                _ => warn!("Ignoring invalid {}={:?}", ENV_RESULT_LENGTH, raw),
            }
        }

        if let Some(raw) = lookup(ENV_CHECK_RATE) {
            match raw.trim().parse::<i64>() {
                Ok(n) if n > MAX_CHECK_RATE_DAYS => {
                    warn!("{}={} capped at {} days", ENV_CHECK_RATE, n, MAX_CHECK_RATE_DAYS);
                    builder = builder.check_rate_days(MAX_CHECK_RATE_DAYS);
                }
                Ok(n) if n >= 0 => builder = builder.check_rate_days(n),
                _ => warn!("Ignoring invalid {}={:?}", ENV_CHECK_RATE, raw),
            }
        }

        builder.build()
    }

    /// Return the API token or fail with `MissingApiToken`
    pub fn require_token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .ok_or(HardcoverError::MissingApiToken)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn covers_dir(&self) -> PathBuf {
        self.data_dir.join(COVERS_DIR)
    }

    pub fn last_synced_path(&self) -> PathBuf {
        self.data_dir.join(LAST_SYNCED_FILE)
    }

    pub fn identity_path(&self) -> PathBuf {
        self.data_dir.join(IDENTITY_FILE)
    }

    pub fn search_cache_path(&self) -> PathBuf {
        self.data_dir.join(SEARCH_CACHE_FILE)
    }

    /// Create the data and covers directories if they are missing
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.data_dir.as_path(), self.covers_dir().as_path()] {
            create_dir(dir)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        HardcoverError::FileIoError(format!(
            "Failed to create directory {}: {}",
            dir.display(),
            e
        ))
    })
}

/// Builder for Config
#[derive(Debug)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn api_token<S: Into<String>>(mut self, token: S) -> Self {
        self.config.api_token = Some(token.into());
        self
    }

    pub fn data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn result_length(mut self, result_length: u32) -> Self {
        self.config.result_length = result_length;
        self
    }

    pub fn check_rate_days(mut self, days: i64) -> Self {
        self.config.check_rate_days = days;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_API_TOKEN, "Bearer abc"),
            (ENV_DATA_DIR, "/tmp/hc"),
            (ENV_RESULT_LENGTH, "15"),
            (ENV_CHECK_RATE, "3"),
        ]));

        assert_eq!(config.api_token.as_deref(), Some("Bearer abc"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/hc/books.db"));
        assert_eq!(config.covers_dir(), PathBuf::from("/tmp/hc/covers"));
        assert_eq!(config.result_length, 15);
        assert_eq!(config.check_rate_days, 3);
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_RESULT_LENGTH, "lots"),
            (ENV_CHECK_RATE, "-2"),
        ]));

        assert_eq!(config.result_length, DEFAULT_RESULT_LENGTH);
        assert_eq!(config.check_rate_days, DEFAULT_CHECK_RATE_DAYS);
        assert!(matches!(
            config.require_token(),
            Err(HardcoverError::MissingApiToken)
        ));
    }

    #[test]
    fn test_huge_check_rate_is_capped() {
        let config = Config::from_lookup(lookup_from(&[(ENV_CHECK_RATE, "100000000")]));
        assert_eq!(config.check_rate_days, MAX_CHECK_RATE_DAYS);

        let config = Config::from_lookup(lookup_from(&[(ENV_CHECK_RATE, "3650")]));
        assert_eq!(config.check_rate_days, 3650);
    }

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .api_token("token")
            .data_dir("/data")
            .result_length(20)
            .check_rate_days(7)
            .build();

        assert_eq!(config.require_token().expect("token set"), "token");
        assert_eq!(config.last_synced_path(), PathBuf::from("/data/lastUpdatedLocal"));
        assert_eq!(config.identity_path(), PathBuf::from("/data/userID"));
        assert_eq!(config.result_length, 20);
        assert_eq!(config.check_rate_days, 7);
    }
}
