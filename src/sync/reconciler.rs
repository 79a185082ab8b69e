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


//! Reconciliation of the owned library and the shelves into one schema
//!
//! The remote service returns two overlapping collections. Owned entries
//! carry the personal state (status, rating, journeys, edition). Shelves
//! carry memberships, and may contain books the user never added to the
//! library. Those shelf-only books get a placeholder entry with a synthetic
//! negative id so that every membership points at a `books` row.
//!
//! # Synthetic ids
//!
//! Ids are handed out as -1, -2, -3, ... in the order shelf-only books are
//! first met. A book sitting on several shelves keeps the id it got first.
//! An id is never handed out twice within one reconciler, even when the
//! placeholder insert fails.
//!
//! # Failures
//!
//! Every insert is a single statement. A failing row is logged, recorded in
//! [`ReconcileStats::errors`] and skipped; rows depending on it (journeys,
//! memberships) are skipped with it.

use crate::api::payloads::{BookSnapshot, ShelfList, ShelfMetadata, UserBook};
use crate::download::cover_file_name;
use crate::storage::models::{
    NewBookRow, NewContribution, NewJourney, NewMembership, NewShelfMetadata, ReadingStatus,
};
use crate::storage::queries;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Counters of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Owned library entries inserted
    pub owned_entries: usize,

    /// Placeholder entries created for shelf-only books
    pub shelf_only_books: usize,

    pub journeys: usize,
    pub contributions: usize,
    pub memberships: usize,

    /// Rows of shelf metadata inserted
    pub shelves: usize,

    /// Rows that failed to insert and were skipped
    pub skipped_rows: usize,

    /// Messages for every skipped row (non-fatal)
    pub errors: Vec<String>,
}

impl ReconcileStats {
    fn record_skip(&mut self, message: String) {
        warn!("{}", message);
        self.skipped_rows += 1;
        self.errors.push(message);
    }
}

/// Round an aggregate rating to 2 decimals
pub fn round_rating(rating: Option<f64>) -> f64 {
    (rating.unwrap_or(0.0) * 100.0).round() / 100.0
}

/// Status id stored for an entry; unknown ids fall back to unset
fn normalize_status(status_id: Option<i64>, user_book_id: i64) -> i64 {
    match status_id {
        None => ReadingStatus::Unset.id(),
        Some(id) => match ReadingStatus::from_id(id) {
            Some(status) => status.id(),
            None => {
                warn!("Entry {} has unknown status {}, stored as unset", user_book_id, id);
                ReadingStatus::Unset.id()
            }
        },
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// Stateful reconciler for one rebuild
#[derive(Debug)]
pub struct Reconciler {
    /// Last synthetic id handed out (0 before the first)
    last_synthetic_id: i64,

    /// Remote book id -> synthetic entry id
    synthetic_ids: HashMap<i64, i64>,

    /// Owned entry ids successfully inserted
    owned_entries: HashSet<i64>,

    /// Remote book id -> owned entry id
    owned_books: HashMap<i64, i64>,

    /// Books whose contributions are already stored
    contributed_books: HashSet<i64>,

    cover_urls: Vec<String>,
    stats: ReconcileStats,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            last_synthetic_id: 0,
            synthetic_ids: HashMap::new(),
            owned_entries: HashSet::new(),
            owned_books: HashMap::new(),
            contributed_books: HashSet::new(),
            cover_urls: Vec::new(),
            stats: ReconcileStats::default(),
        }
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    /// Image URLs of every inserted book, in insertion order
    pub fn cover_urls(&self) -> &[String] {
        &self.cover_urls
    }

    pub fn finish(self) -> ReconcileStats {
        self.stats
    }

    fn next_synthetic_id(&mut self) -> i64 {
        self.last_synthetic_id -= 1;
        self.last_synthetic_id
    }

    /// Insert every owned entry with its journeys and contributions
    pub async fn reconcile_owned(&mut self, conn: &mut SqliteConnection, entries: &[UserBook]) {
        for entry in entries {
            self.insert_owned(conn, entry).await;
        }

        debug!(
            "Owned entries reconciled: {} inserted, {} skipped so far",
            self.stats.owned_entries, self.stats.skipped_rows
        );
    }

    async fn insert_owned(&mut self, conn: &mut SqliteConnection, entry: &UserBook) {
        let book_id = match entry.book.id {
            Some(id) => id,
            None => {
                self.stats
                    .record_skip(format!("Entry {} has no book id, skipped", entry.id));
                return;
            }
        };

        let edition = entry.edition.clone().unwrap_or_default();
        let row = book_row(
            book_id,
            entry.id,
            &entry.book,
            // Owned entries without a rating store 0
            Some(entry.rating.unwrap_or(0.0)),
            normalize_status(entry.status_id, entry.id),
            non_empty(edition.isbn_10.as_ref()),
            non_empty(edition.isbn_13.as_ref()),
        );

        if let Err(e) = queries::insert_book(conn, &row).await {
            self.stats.record_skip(format!(
                "Failed to insert book {} (entry {}): {}",
                book_id, entry.id, e
            ));
            return;
        }
        self.stats.owned_entries += 1;
        self.owned_entries.insert(entry.id);
        self.owned_books.insert(book_id, entry.id);
        if let Some(url) = row.image_url {
            self.cover_urls.push(url);
        }

        for read in &entry.user_book_reads {
            let journey = NewJourney {
                journey_id: read.id,
                user_book_id: entry.id,
                started_at: read.started_at.clone(),
                finished_at: read.finished_at.clone(),
            };
            match queries::insert_journey(conn, &journey).await {
                Ok(()) => self.stats.journeys += 1,
                Err(e) => self.stats.record_skip(format!(
                    "Failed to insert journey {} of entry {}: {}",
                    read.id, entry.id, e
                )),
            }
        }

        self.insert_contributions(conn, book_id, &entry.book).await;
    }

    async fn insert_contributions(
        &mut self,
        conn: &mut SqliteConnection,
        book_id: i64,
        book: &BookSnapshot,
    ) {
        if !self.contributed_books.insert(book_id) {
            return;
        }

        for contributor in &book.cached_contributors {
            let Some(name) = contributor.author_name() else {
                debug!("Contributor without a name on book {}", book_id);
                continue;
            };
            let contribution = NewContribution {
                book_id,
                name: name.to_string(),
                contribution: contributor.contribution.clone(),
            };
            match queries::insert_contribution(conn, &contribution).await {
                Ok(()) => self.stats.contributions += 1,
                Err(e) => self.stats.record_skip(format!(
                    "Failed to insert author {:?} of book {}: {}",
                    name, book_id, e
                )),
            }
        }
    }

    /// Resolve the entry a shelf member belongs to, creating a placeholder
    /// for shelf-only books. `None` means the member has to be skipped.
    async fn resolve_member(
        &mut self,
        conn: &mut SqliteConnection,
        book_id: i64,
        owned_entry_id: Option<i64>,
        book: &BookSnapshot,
    ) -> Option<i64> {
        if let Some(id) = owned_entry_id.filter(|id| self.owned_entries.contains(id)) {
            return Some(id);
        }
        if let Some(&id) = self.owned_books.get(&book_id) {
            return Some(id);
        }
        if let Some(&id) = self.synthetic_ids.get(&book_id) {
            return Some(id);
        }

        let synthetic_id = self.next_synthetic_id();
        let row = book_row(book_id, synthetic_id, book, None, ReadingStatus::Unset.id(), None, None);

        if let Err(e) = queries::insert_book(conn, &row).await {
            self.stats.record_skip(format!(
                "Failed to insert shelf-only book {} (entry {}): {}",
                book_id, synthetic_id, e
            ));
            return None;
        }
        self.synthetic_ids.insert(book_id, synthetic_id);
        self.stats.shelf_only_books += 1;
        if let Some(url) = row.image_url {
            self.cover_urls.push(url);
        }

        self.insert_contributions(conn, book_id, book).await;
        Some(synthetic_id)
    }

    /// Insert the memberships of every shelf
    pub async fn reconcile_shelves(&mut self, conn: &mut SqliteConnection, shelves: &[ShelfList]) {
        for shelf in shelves {
            for member in &shelf.list_books {
                let Some(user_book_id) = self
                    .resolve_member(conn, member.book_id, member.owned_entry_id(), &member.book)
                    .await
                else {
                    continue;
                };

                let membership = NewMembership {
                    shelf_id: shelf.id,
                    user_book_id,
                    list_book_id: member.id,
                    name: shelf.name.clone(),
                };
                match queries::insert_membership(conn, &membership).await {
                    Ok(()) => self.stats.memberships += 1,
                    Err(e) => self.stats.record_skip(format!(
                        "Failed to insert membership {} on shelf {}: {}",
                        member.id, shelf.name, e
                    )),
                }
            }
        }

        debug!(
            "Shelves reconciled: {} memberships, {} shelf-only books",
            self.stats.memberships, self.stats.shelf_only_books
        );
    }

    /// Insert one metadata row per shelf
    pub async fn insert_shelf_metadata(
        &mut self,
        conn: &mut SqliteConnection,
        shelves: &[ShelfMetadata],
    ) {
        for shelf in shelves {
            let row = NewShelfMetadata {
                shelf_id: shelf.id,
                name: shelf.name.clone(),
                books_count: shelf.books_count,
                public: shelf.public,
                slug: shelf.slug.clone(),
            };
            match queries::insert_shelf_metadata(conn, &row).await {
                Ok(()) => self.stats.shelves += 1,
                Err(e) => self.stats.record_skip(format!(
                    "Failed to insert shelf {} ({}): {}",
                    shelf.id, shelf.name, e
                )),
            }
        }
    }
}

fn book_row(
    book_id: i64,
    user_book_id: i64,
    book: &BookSnapshot,
    user_rating: Option<f64>,
    status_id: i64,
    isbn_10: Option<String>,
    isbn_13: Option<String>,
) -> NewBookRow {
    let image_url = book.image_url().map(str::to_string);
    let cover_file = image_url.as_deref().and_then(cover_file_name);

    NewBookRow {
        book_id,
        user_book_id,
        user_rating,
        status_id,
        title: book.title.clone().unwrap_or_default(),
        rating: round_rating(book.rating),
        ratings_count: book.ratings_count.unwrap_or(0),
        release_year: book.release_year,
        image_url,
        cover_file,
        isbn_10,
        isbn_13,
        slug: book.slug.clone(),
    }
}
