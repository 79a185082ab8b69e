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


//! Database models
//!
//! Row types written by the reconciler (`New*`) and typed records read back
//! by the query planner and browse views. Rendering (icons, emoji, subtitles)
//! is left to the caller; everything here carries plain numeric values.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// ENUMS
// ============================================================================

/// Reading status of a library entry
///
/// Discriminants match Hardcover's `status_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i64)]
pub enum ReadingStatus {
    /// Shelf-only books and entries without a status
    Unset = 0,
    ToRead = 1,
    Reading = 2,
    Read = 3,
    DidNotFinish = 4,
}

impl ReadingStatus {
    /// Every status that can be assigned or searched with `@name`, in display order
    pub const ASSIGNABLE: [ReadingStatus; 4] = [
        ReadingStatus::ToRead,
        ReadingStatus::Reading,
        ReadingStatus::Read,
        ReadingStatus::DidNotFinish,
    ];

    /// All histogram buckets, including `Unset`
    pub const ALL: [ReadingStatus; 5] = [
        ReadingStatus::Unset,
        ReadingStatus::ToRead,
        ReadingStatus::Reading,
        ReadingStatus::Read,
        ReadingStatus::DidNotFinish,
    ];

    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(ReadingStatus::Unset),
            1 => Some(ReadingStatus::ToRead),
            2 => Some(ReadingStatus::Reading),
            3 => Some(ReadingStatus::Read),
            4 => Some(ReadingStatus::DidNotFinish),
            _ => None,
        }
    }

    /// Search-grammar name of the status
    pub fn label(self) -> &'static str {
        match self {
            ReadingStatus::Unset => "noStatus",
            ReadingStatus::ToRead => "toRead",
            ReadingStatus::Reading => "Reading",
            ReadingStatus::Read => "Read",
            ReadingStatus::DidNotFinish => "DNF",
        }
    }

    /// Resolve an `@name` token. Matching is exact and case-sensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ASSIGNABLE.into_iter().find(|s| s.label() == label)
    }
}

// ============================================================================
// REBUILD ROWS
// ============================================================================

/// One `books` row: the book and its library entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewBookRow {
    pub book_id: i64,
    pub user_book_id: i64,
    /// `None` stores NULL (shelf-only books)
    pub user_rating: Option<f64>,
    pub status_id: i64,
    pub title: String,
    /// Aggregate community rating, already rounded to 2 decimals
    pub rating: f64,
    pub ratings_count: i64,
    pub release_year: Option<i64>,
    pub image_url: Option<String>,
    pub cover_file: Option<String>,
    pub isbn_10: Option<String>,
    pub isbn_13: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewJourney {
    pub journey_id: i64,
    pub user_book_id: i64,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContribution {
    pub book_id: i64,
    pub name: String,
    pub contribution: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMembership {
    pub shelf_id: i64,
    pub user_book_id: i64,
    pub list_book_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewShelfMetadata {
    pub shelf_id: i64,
    pub name: String,
    pub books_count: i64,
    pub public: bool,
    pub slug: Option<String>,
}

// ============================================================================
// QUERY RESULTS
// ============================================================================

/// One row of a library search, with window counts over the whole filtered set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SearchHit {
    pub book_id: i64,
    pub title: String,
    pub authors: String,
    pub release_year: Option<i64>,
    pub user_rating: Option<f64>,
    pub rating: Option<f64>,
    pub ratings_count: Option<i64>,
    pub shelves: String,
    pub cover_file: Option<String>,
    pub status_id: i64,
    pub user_book_id: i64,
    pub slug: Option<String>,
    pub total_count: i64,
    pub count_status_1: i64,
    pub count_status_2: i64,
    pub count_status_3: i64,
    pub count_status_4: i64,
}

impl SearchHit {
    pub fn status(&self) -> Option<ReadingStatus> {
        ReadingStatus::from_id(self.status_id)
    }

    /// Whether the row is a placeholder for a book only present on shelves
    pub fn is_shelf_only(&self) -> bool {
        self.user_book_id < 0
    }

    /// Window count of the filtered set for one status
    pub fn count_for(&self, status: ReadingStatus) -> i64 {
        match status {
            ReadingStatus::ToRead => self.count_status_1,
            ReadingStatus::Reading => self.count_status_2,
            ReadingStatus::Read => self.count_status_3,
            ReadingStatus::DidNotFinish => self.count_status_4,
            ReadingStatus::Unset => {
                self.total_count
                    - self.count_status_1
                    - self.count_status_2
                    - self.count_status_3
                    - self.count_status_4
            }
        }
    }
}

/// A status offered while the user is typing an `@` fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTag {
    pub status: ReadingStatus,
    pub label: String,
    /// Live count in the current filtered set
    pub count: i64,
    /// Search string the launcher should re-run when the tag is picked
    pub search_string: String,
}

/// One shelf in the shelves browse view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfRow {
    pub shelf_id: i64,
    pub name: String,
    pub books_count: i64,
    pub public: bool,
    pub slug: Option<String>,
    /// Whether the book the view was opened for is on this shelf
    pub contains_book: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StatusRow {
    pub status_id: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RatingRow {
    pub rating: f64,
    pub count: i64,
}

impl RatingRow {
    /// Bucket 0.0 collects unrated books
    pub fn is_unrated(&self) -> bool {
        self.rating == 0.0
    }
}

/// Local state of a book, used to annotate remote catalog results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BookAnnotation {
    pub status_id: i64,
    pub user_rating: Option<f64>,
    pub shelves: String,
}

/// Membership row needed to remove a book from a shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MembershipRef {
    pub list_book_id: i64,
    pub name: String,
}
