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


//! Database storage and models
//!
//! The local mirror is a single SQLite file rebuilt wholesale from the remote
//! service, plus a few sidecar files (last-synced stamp, identity, search cache).
//!
//! # Usage Example
//! ```no_run
//! use hardcover_core::storage::{Database, queries};
//!
//! # async fn example() -> hardcover_core::error::Result<()> {
//! let db = Database::new("./books.db").await?;
//! let books = queries::count_books(db.pool()).await?;
//! println!("{} books mirrored", books);
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod models;
pub mod queries;
pub mod schema;
pub mod state;

// Re-export commonly used types
pub use database::Database;
pub use models::{
    BookAnnotation, MembershipRef, RatingRow, ReadingStatus, SearchHit, ShelfRow, StatusRow,
    StatusTag,
};
