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


//! When to rebuild, and who the user is
//!
//! The store is rebuilt when it does not exist, when it was never stamped,
//! or when the check interval has passed and the remote profile changed
//! after the last successful rebuild. The profile is only fetched once the
//! interval has passed, so most invocations make no request at all.

use crate::api::payloads::Identity;
use crate::api::RemoteLibrary;
use crate::config::{Config, MAX_CHECK_RATE_DAYS};
use crate::error::Result;
use crate::storage::state::{self, LAST_SYNCED_FORMAT};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Why a rebuild is needed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildReason {
    StoreMissing,
    NeverSynced,
    RemoteChanged { remote_updated_at: String },
}

/// Parse a remote `updated_at` value
///
/// The API answers in RFC 3339; the last-synced layout is accepted too.
pub fn parse_remote_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, LAST_SYNCED_FORMAT))
        .ok()
}

/// Identity from the identity file, fetched and stored when missing
pub async fn resolve_identity<R>(config: &Config, remote: &R) -> Result<Identity>
where
    R: RemoteLibrary + ?Sized,
{
    let path = config.identity_path();
    if let Some(identity) = state::read_identity(&path).await? {
        debug!("Using cached identity for user {}", identity.id);
        return Ok(identity);
    }

    info!("No identity file, fetching profile");
    let fetched = remote.fetch_identity().await?;
    state::write_identity(&path, &fetched.raw).await?;
    Ok(fetched.identity)
}

/// Decide whether the store needs a rebuild, as of now
pub async fn check_staleness<R>(config: &Config, remote: &R) -> Result<Option<RebuildReason>>
where
    R: RemoteLibrary + ?Sized,
{
    check_staleness_at(config, remote, Utc::now()).await
}

/// Decide whether the store needs a rebuild, as of `now`
pub async fn check_staleness_at<R>(
    config: &Config,
    remote: &R,
    now: DateTime<Utc>,
) -> Result<Option<RebuildReason>>
where
    R: RemoteLibrary + ?Sized,
{
    if !tokio::fs::try_exists(config.database_path()).await.unwrap_or(false) {
        return Ok(Some(RebuildReason::StoreMissing));
    }

    let last_synced = match state::read_last_synced(&config.last_synced_path()).await {
        Ok(Some(at)) => at,
        Ok(None) => return Ok(Some(RebuildReason::NeverSynced)),
        Err(e) => {
            warn!("Unreadable last-synced stamp, rebuilding: {}", e);
            return Ok(Some(RebuildReason::NeverSynced));
        }
    };

    let interval = Duration::days(config.check_rate_days.clamp(0, MAX_CHECK_RATE_DAYS));
    let Some(next_check) = last_synced.checked_add_signed(interval) else {
        debug!("Next staleness check out of range, store kept");
        return Ok(None);
    };
    if next_check > now {
        debug!("Next staleness check at {}", next_check);
        return Ok(None);
    }

    // Interval passed: refresh the identity file and compare
    let fetched = remote.fetch_identity().await?;
    state::write_identity(&config.identity_path(), &fetched.raw).await?;

    let Some(raw_updated_at) = fetched.identity.updated_at else {
        debug!("Profile has no updated_at, store kept");
        return Ok(None);
    };
    let Some(remote_updated_at) = parse_remote_timestamp(&raw_updated_at) else {
        warn!("Cannot parse remote updated_at {:?}, store kept", raw_updated_at);
        return Ok(None);
    };

    if remote_updated_at > last_synced {
        info!("Remote library changed at {}, store is outdated", remote_updated_at);
        Ok(Some(RebuildReason::RemoteChanged {
            remote_updated_at: raw_updated_at,
        }))
    } else {
        debug!("Store is up to date");
        Ok(None)
    }
}
