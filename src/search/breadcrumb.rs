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


//! Drill-down context carried between invocations
//!
//! The launcher remembers which browse view a search was opened from and
//! passes it back as a marker plus one context variable. A malformed
//! variable drops the predicate with a warning; the search still runs.

use crate::storage::models::ReadingStatus;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Marker value: opened from a shelf
pub const MARKER_SHELF: &str = "listShelfBooks";
/// Marker value: opened from a status
pub const MARKER_STATUS: &str = "listStatusBooks";
/// Marker value: opened from a rating bucket
pub const MARKER_RATING: &str = "listRatings";

/// Context variable names, as set by the launcher
pub const VAR_MARKER: &str = "breadCrumb";
pub const VAR_SHELF_ID: &str = "current_listID";
pub const VAR_STATUS_ID: &str = "newStatus";
pub const VAR_RATING: &str = "newRating";

/// Extra equality predicate layered on top of a search
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Breadcrumb {
    #[default]
    None,
    Shelf(i64),
    Status(ReadingStatus),
    /// Personal rating; unrated books match 0.0
    Rating(f64),
}

/// Raw context values, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreadcrumbContext {
    pub marker: Option<String>,
    pub shelf_id: Option<String>,
    pub status_id: Option<String>,
    pub rating: Option<String>,
}

impl BreadcrumbContext {
    /// Read the context variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            marker: lookup(VAR_MARKER),
            shelf_id: lookup(VAR_SHELF_ID),
            status_id: lookup(VAR_STATUS_ID),
            rating: lookup(VAR_RATING),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Validate into a predicate
    pub fn resolve(&self) -> Breadcrumb {
        let marker = self.marker.as_deref().map(str::trim).unwrap_or_default();

        match marker {
            "" => Breadcrumb::None,
            MARKER_SHELF => parse_shelf(self.shelf_id.as_deref()),
            MARKER_STATUS => parse_status(self.status_id.as_deref()),
            MARKER_RATING => parse_rating(self.rating.as_deref()),
            other => {
                warn!("Unknown breadcrumb marker {:?}, ignored", other);
                Breadcrumb::None
            }
        }
    }
}

fn parse_shelf(raw: Option<&str>) -> Breadcrumb {
    match raw.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(id)) => Breadcrumb::Shelf(id),
        _ => {
            warn!("Malformed {} {:?}, shelf filter dropped", VAR_SHELF_ID, raw);
            Breadcrumb::None
        }
    }
}

fn parse_status(raw: Option<&str>) -> Breadcrumb {
    let status = raw
        .and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(ReadingStatus::from_id);

    match status {
        Some(status) => Breadcrumb::Status(status),
        None => {
            warn!("Malformed {} {:?}, status filter dropped", VAR_STATUS_ID, raw);
            Breadcrumb::None
        }
    }
}

fn parse_rating(raw: Option<&str>) -> Breadcrumb {
    let rating = raw
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|r| (0.0..=5.0).contains(r));

    match rating {
        // Same half-star snapping as the rating histogram
        Some(r) => Breadcrumb::Rating((r * 2.0).round() / 2.0),
        None => {
            warn!("Malformed {} {:?}, rating filter dropped", VAR_RATING, raw);
            Breadcrumb::None
        }
    }
}
