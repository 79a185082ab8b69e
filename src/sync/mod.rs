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


//! Full rebuild of the local mirror
//!
//! A rebuild runs in two phases:
//!
//! 1. **Fetch.** Identity, owned library, shelves and shelf metadata are
//!    fetched one after the other. Any failure here returns before the store
//!    is touched, so the previous mirror stays usable.
//! 2. **Write.** One transaction drops and recreates the relational tables,
//!    reconciles both collections, stores shelf metadata, recomputes the
//!    derived shelf strings and histograms, and rebuilds the full-text index.
//!
//! After commit the WAL is checkpointed, covers are downloaded (failures are
//! counted, never returned) and the last-synced stamp is written.
//!
//! # Example
//!
//! ```rust,ignore
//! use hardcover_core::api::HardcoverClient;
//! use hardcover_core::config::Config;
//! use hardcover_core::download::CoverDownloader;
//! use hardcover_core::storage::Database;
//! use hardcover_core::sync;
//!
//! let config = Config::from_env();
//! let client = HardcoverClient::new(config.require_token()?)?;
//! let db = Database::new(&config.database_path()).await?;
//! let covers = CoverDownloader::new(config.covers_dir())?;
//!
//! let report = sync::rebuild(&db, &client, &config, Some(&covers)).await?;
//! println!("{} books mirrored", report.books);
//! ```

pub mod aggregates;
pub mod fts;
pub mod reconciler;
pub mod staleness;

pub use reconciler::{ReconcileStats, Reconciler};
pub use staleness::{check_staleness, resolve_identity, RebuildReason};

use crate::api::RemoteLibrary;
use crate::config::Config;
use crate::download::{CoverDownloader, CoverReport};
use crate::error::{HardcoverError, Result};
use crate::storage::{queries, schema, state, Database};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Summary of a finished rebuild
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub user_id: i64,
    pub username: String,

    /// Rows in `books` after the rebuild, shelf-only placeholders included
    pub books: i64,

    /// Books in the full-text index
    pub indexed: u64,

    /// Entries sitting on at least one shelf
    pub shelved_entries: usize,

    pub reconcile: ReconcileStats,

    /// `None` when covers were not requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub covers: Option<CoverReport>,

    /// Value written to the last-synced file
    pub synced_at: String,

    pub duration_ms: u64,
}

/// Drop and rebuild the whole mirror from the remote library
pub async fn rebuild<R>(
    db: &Database,
    remote: &R,
    config: &Config,
    covers: Option<&CoverDownloader>,
) -> Result<RebuildReport>
where
    R: RemoteLibrary + ?Sized,
{
    let started = Instant::now();

    // Phase 1: fetch everything before touching the store
    let fetched_identity = remote.fetch_identity().await?;
    let user_id = fetched_identity.identity.id;
    let owned = remote.fetch_owned_library(user_id).await?;
    let shelves = remote.fetch_shelves(user_id).await?;
    let shelf_metadata = remote.fetch_shelf_metadata().await?;
    info!(
        user_id,
        owned = owned.len(),
        shelves = shelves.len(),
        "Remote library fetched in {:?}",
        started.elapsed()
    );

    state::write_identity(&config.identity_path(), &fetched_identity.raw).await?;

    // Phase 2: one transaction for the whole write
    let mut tx = db.pool().begin().await?;
    schema::recreate(&mut tx).await?;

    let mut reconciler = Reconciler::new();
    reconciler.reconcile_owned(&mut tx, &owned).await;
    reconciler.reconcile_shelves(&mut tx, &shelves).await;
    reconciler.insert_shelf_metadata(&mut tx, &shelf_metadata).await;

    let shelved_entries = aggregates::recompute_shelf_strings(&mut tx).await?;
    aggregates::recompute_rating_histogram(&mut tx).await?;
    aggregates::recompute_status_histogram(&mut tx).await?;
    let indexed = fts::rebuild_index(&mut tx).await?;

    tx.commit().await?;
    info!("Store rebuilt in {:?}", started.elapsed());

    if let Err(e) = db.checkpoint().await {
        warn!("WAL checkpoint failed: {}", e);
    }

    let cover_urls = reconciler.cover_urls().to_vec();
    let reconcile = reconciler.finish();

    let cover_report = match covers {
        Some(downloader) => Some(downloader.download_all(cover_urls).await),
        None => None,
    };

    let now = Utc::now();
    state::write_last_synced(&config.last_synced_path(), now).await?;

    let report = RebuildReport {
        user_id,
        username: fetched_identity.identity.username,
        books: queries::count_books(db.pool()).await?,
        indexed,
        shelved_entries,
        reconcile,
        covers: cover_report,
        synced_at: state::format_last_synced(now),
        duration_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        books = report.books,
        skipped = report.reconcile.skipped_rows,
        "Rebuild finished in {}ms",
        report.duration_ms
    );
    Ok(report)
}

/// Open the store, rebuilding it first when it is missing or outdated
///
/// Without a remote, an existing store is served as is. Once a store file
/// exists, a failed staleness check or rebuild is logged and the previous
/// mirror is served instead.
pub async fn open_mirror<R>(
    config: &Config,
    remote: Option<&R>,
    covers: Option<&CoverDownloader>,
) -> Result<Database>
where
    R: RemoteLibrary + ?Sized,
{
    open_mirror_at(config, remote, covers, Utc::now()).await
}

/// [`open_mirror`] as of `now`
pub async fn open_mirror_at<R>(
    config: &Config,
    remote: Option<&R>,
    covers: Option<&CoverDownloader>,
    now: DateTime<Utc>,
) -> Result<Database>
where
    R: RemoteLibrary + ?Sized,
{
    let path = config.database_path();
    let store_exists = tokio::fs::try_exists(&path).await.unwrap_or(false);

    let Some(remote) = remote else {
        if !store_exists {
            return Err(HardcoverError::MissingApiToken);
        }
        warn!("No API token, staleness check skipped");
        return Database::new(&path).await;
    };

    let reason = match staleness::check_staleness_at(config, remote, now).await {
        Ok(reason) => reason,
        Err(e) if store_exists => {
            warn!("Staleness check failed, serving the local store: {}", e);
            None
        }
        Err(e) => return Err(e),
    };

    let db = Database::new(&path).await?;
    if let Some(reason) = reason {
        info!(?reason, "Rebuilding before answering");
        match rebuild(&db, remote, config, covers).await {
            Ok(_) => {}
            Err(e) if store_exists => {
                warn!("Rebuild failed, serving the previous store: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(db)
}
