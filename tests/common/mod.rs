//! Shared fixtures for the integration tests: an in-process remote library
//! serving the JSON files under `tests/fixtures`, counting every call.

#![allow(dead_code)]

use async_trait::async_trait;
use hardcover_core::api::payloads::Identity;
use hardcover_core::api::{
    CatalogBook, FetchedIdentity, RemoteLibrary, ShelfList, ShelfMetadata, UserBook,
};
use hardcover_core::config::Config;
use hardcover_core::error::{HardcoverError, Result};
use hardcover_core::storage::Database;
use hardcover_core::sync::{self, RebuildReport};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub const USER_ID: i64 = 42;

fn fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    let raw = std::fs::read_to_string(&path).expect("Failed to read fixture");
    serde_json::from_str(&raw).expect("Failed to parse fixture")
}

#[derive(Debug, Default)]
pub struct CallCounts {
    pub identity: AtomicUsize,
    pub owned: AtomicUsize,
    pub shelves: AtomicUsize,
    pub shelf_metadata: AtomicUsize,
    pub catalog: AtomicUsize,
}

impl CallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Remote library backed by the fixture files
pub struct FakeRemote {
    pub owned: Vec<UserBook>,
    pub shelves: Vec<ShelfList>,
    pub shelf_metadata: Vec<ShelfMetadata>,
    pub catalog: Vec<CatalogBook>,
    pub updated_at: Option<String>,
    pub fail_shelves: bool,
    pub offline: bool,
    pub calls: CallCounts,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            owned: fixture("owned_library.json"),
            shelves: fixture("shelves.json"),
            shelf_metadata: fixture("shelf_metadata.json"),
            catalog: fixture("catalog.json"),
            updated_at: Some("2025-03-01T10:00:00.000000+00:00".to_string()),
            fail_shelves: false,
            offline: false,
            calls: CallCounts::default(),
        }
    }

    pub fn updated_at(mut self, updated_at: &str) -> Self {
        self.updated_at = Some(updated_at.to_string());
        self
    }

    pub fn failing_shelves(mut self) -> Self {
        self.fail_shelves = true;
        self
    }

    /// Every call fails as if the network were down
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(HardcoverError::network_error("offline", true));
        }
        Ok(())
    }

    pub fn identity_calls(&self) -> usize {
        CallCounts::get(&self.calls.identity)
    }

    pub fn catalog_calls(&self) -> usize {
        CallCounts::get(&self.calls.catalog)
    }
}

#[async_trait]
impl RemoteLibrary for FakeRemote {
    async fn fetch_identity(&self) -> Result<FetchedIdentity> {
        self.calls.identity.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let identity = Identity {
            id: USER_ID,
            username: "reader".to_string(),
            updated_at: self.updated_at.clone(),
        };
        let raw = json!({ "data": { "me": [&identity] } }).to_string();
        Ok(FetchedIdentity { identity, raw })
    }

    async fn fetch_owned_library(&self, user_id: i64) -> Result<Vec<UserBook>> {
        assert_eq!(user_id, USER_ID);
        self.calls.owned.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.owned.clone())
    }

    async fn fetch_shelves(&self, user_id: i64) -> Result<Vec<ShelfList>> {
        assert_eq!(user_id, USER_ID);
        self.calls.shelves.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.fail_shelves {
            return Err(HardcoverError::network_error("connection reset", true));
        }
        Ok(self.shelves.clone())
    }

    async fn fetch_shelf_metadata(&self) -> Result<Vec<ShelfMetadata>> {
        self.calls.shelf_metadata.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.shelf_metadata.clone())
    }

    async fn search_catalog(&self, _query: &str, per_page: u32) -> Result<Vec<CatalogBook>> {
        self.calls.catalog.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.catalog.iter().take(per_page as usize).cloned().collect())
    }
}

/// Config whose sidecar files live in a fresh temporary directory
pub fn temp_config() -> (TempDir, Config) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config::builder()
        .api_token("test-token")
        .data_dir(dir.path())
        .build();
    config.ensure_dirs().expect("Failed to create data dirs");
    (dir, config)
}

/// In-memory store rebuilt from the fixtures
pub async fn rebuilt_store(config: &Config) -> (Database, RebuildReport) {
    let db = Database::new_in_memory().await.expect("Failed to create database");
    let remote = FakeRemote::new();
    let report = sync::rebuild(&db, &remote, config, None)
        .await
        .expect("Rebuild failed");
    (db, report)
}
