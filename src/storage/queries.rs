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


//! Row-level insert and lookup functions
//!
//! Inserts take a `&mut SqliteConnection` so the reconciler can run them on
//! the rebuild transaction. Each call is one statement; a failure leaves the
//! transaction usable and the caller decides whether to skip the row.

use crate::error::Result;
use crate::storage::models::{
    NewBookRow, NewContribution, NewJourney, NewMembership, NewShelfMetadata,
};
use sqlx::{SqliteConnection, SqlitePool};

// ============================================================================
// BOOK QUERIES
// ============================================================================

/// Insert a book together with its library entry
pub async fn insert_book(conn: &mut SqliteConnection, book: &NewBookRow) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO books (
            book_id, user_book_id, user_rating, status_id, title,
            rating, ratings_count, release_year, image_url, cover_file,
            isbn_10, isbn_13, slug
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(book.book_id)
    .bind(book.user_book_id)
    .bind(book.user_rating)
    .bind(book.status_id)
    .bind(&book.title)
    .bind(book.rating)
    .bind(book.ratings_count)
    .bind(book.release_year)
    .bind(&book.image_url)
    .bind(&book.cover_file)
    .bind(&book.isbn_10)
    .bind(&book.isbn_13)
    .bind(&book.slug)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrite the derived shelf-name string of one entry
pub async fn update_book_shelves(
    conn: &mut SqliteConnection,
    user_book_id: i64,
    shelves: &str,
) -> Result<()> {
    sqlx::query("UPDATE books SET shelves = ? WHERE user_book_id = ?")
        .bind(shelves)
        .bind(user_book_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Count all books in the store
pub async fn count_books(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

// ============================================================================
// JOURNEY / CONTRIBUTION QUERIES
// ============================================================================

pub async fn insert_journey(conn: &mut SqliteConnection, journey: &NewJourney) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO journey (journey_id, user_book_id, started_at, finished_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(journey.journey_id)
    .bind(journey.user_book_id)
    .bind(&journey.started_at)
    .bind(&journey.finished_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_contribution(
    conn: &mut SqliteConnection,
    contribution: &NewContribution,
) -> Result<()> {
    sqlx::query("INSERT INTO author (book_id, name, contribution) VALUES (?, ?, ?)")
        .bind(contribution.book_id)
        .bind(&contribution.name)
        .bind(&contribution.contribution)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// ============================================================================
// SHELF QUERIES
// ============================================================================

pub async fn insert_membership(
    conn: &mut SqliteConnection,
    membership: &NewMembership,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO shelf (shelf_id, user_book_id, list_book_id, name)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(membership.shelf_id)
    .bind(membership.user_book_id)
    .bind(membership.list_book_id)
    .bind(&membership.name)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_shelf_metadata(
    conn: &mut SqliteConnection,
    shelf: &NewShelfMetadata,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bookshelves (shelf_id, name, books_count, public, slug)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(shelf.shelf_id)
    .bind(&shelf.name)
    .bind(shelf.books_count)
    .bind(shelf.public)
    .bind(&shelf.slug)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Memberships as `(user_book_id, shelf name)`, in insertion order
pub async fn list_memberships(conn: &mut SqliteConnection) -> Result<Vec<(i64, String)>> {
    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT user_book_id, name FROM shelf ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;

    Ok(rows)
}
