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


//! Relational schema
//!
//! The store has no versioned migrations. Every rebuild drops and recreates
//! all tables inside the rebuild transaction, so a schema change simply takes
//! effect on the next rebuild. Opening a store only makes sure the tables
//! exist so that queries against a never-synced store return empty results
//! instead of errors.
//!
//! # Tables
//! - `books` - one row per book; also carries the library entry (`user_book_id`)
//! - `journey` - reading journeys (start/finish dates) per entry
//! - `author` - contributions per book, duplicates across roles preserved
//! - `shelf` - shelf memberships, one row per (shelf, entry)
//! - `bookshelves` - shelf metadata from the shelf-list query
//! - `ratings` - rating histogram (11 buckets)
//! - `status_counts` - status histogram (5 buckets)

use crate::error::Result;
use crate::sync::fts;
use sqlx::{Executor, SqliteConnection, SqlitePool};

/// Table creation statements, parents first
const CREATE_TABLES: [&str; 7] = [
    r#"
    CREATE TABLE IF NOT EXISTS books (
        book_id INTEGER PRIMARY KEY,
        user_book_id INTEGER UNIQUE,
        user_rating REAL,
        status_id INTEGER NOT NULL DEFAULT 0,
        title TEXT NOT NULL DEFAULT '',
        rating REAL,
        ratings_count INTEGER,
        release_year INTEGER,
        image_url TEXT,
        cover_file TEXT,
        isbn_10 TEXT,
        isbn_13 TEXT,
        slug TEXT,
        shelves TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS idx_books_status ON books(status_id);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS journey (
        journey_id INTEGER PRIMARY KEY,
        user_book_id INTEGER NOT NULL,
        started_at TEXT,
        finished_at TEXT,
        FOREIGN KEY(user_book_id) REFERENCES books(user_book_id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS author (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        book_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        contribution TEXT,
        FOREIGN KEY(book_id) REFERENCES books(book_id)
    );
    CREATE INDEX IF NOT EXISTS idx_author_book ON author(book_id);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS shelf (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        shelf_id INTEGER NOT NULL,
        user_book_id INTEGER NOT NULL,
        list_book_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        FOREIGN KEY(user_book_id) REFERENCES books(user_book_id)
    );
    CREATE INDEX IF NOT EXISTS idx_shelf_userbook ON shelf(user_book_id);
    CREATE INDEX IF NOT EXISTS idx_shelf_shelf ON shelf(shelf_id);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bookshelves (
        shelf_id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        books_count INTEGER NOT NULL DEFAULT 0,
        public BOOLEAN NOT NULL DEFAULT 0,
        slug TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ratings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        rating REAL NOT NULL,
        count INTEGER NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS status_counts (
        status_id INTEGER PRIMARY KEY,
        count INTEGER NOT NULL
    );
    "#,
];

/// Drop order: children before the parents they reference
const DROP_TABLES: [&str; 7] = [
    "DROP TABLE IF EXISTS journey",
    "DROP TABLE IF EXISTS author",
    "DROP TABLE IF EXISTS shelf",
    "DROP TABLE IF EXISTS bookshelves",
    "DROP TABLE IF EXISTS ratings",
    "DROP TABLE IF EXISTS status_counts",
    "DROP TABLE IF EXISTS books",
];

/// Create any missing table, leaving existing data alone
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    let mut conn = pool.acquire().await?;

    for statement in CREATE_TABLES {
        (&mut *conn).execute(statement).await?;
    }
    fts::ensure_index(&mut conn).await?;

    Ok(())
}

/// Drop every relational table and create it again, empty
///
/// Meant to run inside the rebuild transaction. The full-text table is
/// handled separately by the indexer at the end of the rebuild.
pub async fn recreate(conn: &mut SqliteConnection) -> Result<()> {
    for statement in DROP_TABLES {
        (&mut *conn).execute(statement).await?;
    }
    for statement in CREATE_TABLES {
        (&mut *conn).execute(statement).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    #[tokio::test]
    async fn test_schema_creates_all_tables() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .expect("Failed to list tables");

        for expected in [
            "author",
            "books",
            "books_authors_fts",
            "bookshelves",
            "journey",
            "ratings",
            "shelf",
            "status_counts",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
        }
    }

    #[tokio::test]
    async fn test_recreate_empties_tables() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        sqlx::query("INSERT INTO books (book_id, user_book_id, title) VALUES (1, 10, 'Dune')")
            .execute(db.pool())
            .await
            .expect("Failed to insert book");

        let mut conn = db.pool().acquire().await.expect("Failed to acquire connection");
        super::recreate(&mut conn).await.expect("Failed to recreate schema");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&mut *conn)
            .await
            .expect("Failed to count books");
        assert_eq!(count, 0);
    }
}
