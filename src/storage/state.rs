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


//! Sidecar files kept next to the store
//!
//! - last-synced stamp, written after every successful rebuild
//! - identity file, the raw `me` response
//! - single-slot catalog search cache

use crate::api::payloads::{CatalogBook, Identity, IdentityResponse};
use crate::error::{HardcoverError, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Timestamp layout of the last-synced file (microseconds, numeric offset)
pub const LAST_SYNCED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HardcoverError::FileIoError(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(path, contents).await.map_err(|e| {
        HardcoverError::FileIoError(format!("Failed to write {}: {}", path.display(), e))
    })
}

// ============================================================================
// LAST SYNCED
// ============================================================================

pub fn format_last_synced(at: DateTime<Utc>) -> String {
    at.format(LAST_SYNCED_FORMAT).to_string()
}

pub fn parse_last_synced(raw: &str) -> Result<DateTime<FixedOffset>> {
    Ok(DateTime::parse_from_str(raw.trim(), LAST_SYNCED_FORMAT)?)
}

/// Read the last-synced stamp; `None` if the store was never synced
pub async fn read_last_synced(path: &Path) -> Result<Option<DateTime<FixedOffset>>> {
    match read_optional(path).await? {
        Some(raw) => parse_last_synced(&raw).map(Some),
        None => Ok(None),
    }
}

pub async fn write_last_synced(path: &Path, at: DateTime<Utc>) -> Result<()> {
    write_file(path, format_last_synced(at).as_bytes()).await
}

// ============================================================================
// IDENTITY
// ============================================================================

/// Read the cached identity, if the file exists and holds a user
pub async fn read_identity(path: &Path) -> Result<Option<Identity>> {
    let Some(raw) = read_optional(path).await? else {
        return Ok(None);
    };

    let response: IdentityResponse = serde_json::from_str(&raw)?;
    let identity = response.into_identity();
    if identity.is_none() {
        warn!("Identity file {} holds no user", path.display());
    }
    Ok(identity)
}

/// Persist the raw identity response exactly as received
pub async fn write_identity(path: &Path, raw_response: &str) -> Result<()> {
    write_file(path, raw_response.as_bytes()).await
}

// ============================================================================
// SEARCH CACHE
// ============================================================================

/// Single-slot cache of the last remote catalog search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCache {
    /// Normalized search string the results belong to
    pub query: String,
    pub results: Vec<CatalogBook>,
}

/// Read the cache; a missing or unreadable file is treated as empty
pub async fn read_search_cache(path: &Path) -> Result<Option<SearchCache>> {
    let Some(raw) = read_optional(path).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(cache) => Ok(Some(cache)),
        Err(e) => {
            debug!("Discarding unreadable search cache: {}", e);
            Ok(None)
        }
    }
}

pub async fn write_search_cache(path: &Path, cache: &SearchCache) -> Result<()> {
    let json = serde_json::to_vec(cache)?;
    write_file(path, &json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_last_synced_format_has_microseconds_and_offset() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 1).single().expect("valid date");
        let formatted = format_last_synced(at);

        assert_eq!(formatted, "2025-03-09T07:05:01.000000+00:00");
        let parsed = parse_last_synced(&formatted).expect("Failed to parse");
        assert_eq!(parsed, at);
    }

    #[tokio::test]
    async fn test_missing_files_read_as_none() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        assert!(read_last_synced(&dir.path().join("lastUpdatedLocal")).await.expect("read").is_none());
        assert!(read_identity(&dir.path().join("userID")).await.expect("read").is_none());
        assert!(read_search_cache(&dir.path().join("cache.json")).await.expect("read").is_none());
    }

    #[tokio::test]
    async fn test_identity_round_trip_keeps_raw_body() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("userID");
        let raw = r#"{"data":{"me":[{"id":42,"username":"reader","updated_at":"2025-01-02T03:04:05.123456+00:00"}]}}"#;

        write_identity(&path, raw).await.expect("Failed to write identity");
        let identity = read_identity(&path).await.expect("Failed to read").expect("identity present");

        assert_eq!(identity.id, 42);
        assert_eq!(identity.username, "reader");
        assert_eq!(std::fs::read_to_string(&path).expect("read raw"), raw);
    }

    #[tokio::test]
    async fn test_corrupt_search_cache_is_ignored() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").expect("write");

        assert!(read_search_cache(&path).await.expect("read").is_none());
    }
}
