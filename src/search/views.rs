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


//! Browse views over the mirror

use crate::error::{HardcoverError, Result};
use crate::storage::models::{BookAnnotation, MembershipRef, RatingRow, ShelfRow, StatusRow};
use sqlx::SqlitePool;
use std::collections::HashMap;

type ShelfTuple = (i64, String, i64, bool, Option<String>, i64);

/// All shelves, largest first
///
/// With `current_book`, each row tells whether that book is on the shelf.
pub async fn list_shelves(pool: &SqlitePool, current_book: Option<i64>) -> Result<Vec<ShelfRow>> {
    let rows: Vec<ShelfTuple> = sqlx::query_as(
        r#"
        SELECT
            bs.shelf_id,
            COALESCE(bs.name, ''),
            COALESCE(bs.books_count, 0),
            COALESCE(bs.public, 0),
            bs.slug,
            EXISTS (
                SELECT 1
                FROM shelf s
                JOIN books b ON b.user_book_id = s.user_book_id
                WHERE s.shelf_id = bs.shelf_id AND b.book_id = ?
            )
        FROM bookshelves bs
        ORDER BY bs.books_count DESC, bs.shelf_id
        "#,
    )
    .bind(current_book)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(shelf_id, name, books_count, public, slug, contains)| ShelfRow {
            shelf_id,
            name,
            books_count,
            public,
            slug,
            contains_book: contains != 0,
        })
        .collect())
}

/// Status histogram, status 0 first
pub async fn status_counts(pool: &SqlitePool) -> Result<Vec<StatusRow>> {
    let rows = sqlx::query_as::<_, StatusRow>(
        "SELECT status_id, count FROM status_counts ORDER BY status_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Rating histogram, highest bucket first
pub async fn rating_counts(pool: &SqlitePool) -> Result<Vec<RatingRow>> {
    let rows = sqlx::query_as::<_, RatingRow>(
        "SELECT rating, count FROM ratings ORDER BY rating DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Local state of every mirrored book, keyed by remote book id
pub async fn book_annotations(pool: &SqlitePool) -> Result<HashMap<i64, BookAnnotation>> {
    let rows: Vec<(i64, i64, Option<f64>, String)> =
        sqlx::query_as("SELECT book_id, status_id, user_rating, shelves FROM books")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(book_id, status_id, user_rating, shelves)| {
            (
                book_id,
                BookAnnotation {
                    status_id,
                    user_rating,
                    shelves,
                },
            )
        })
        .collect())
}

/// Membership of `book_id` on `shelf_id`, needed to remove it
pub async fn find_membership(pool: &SqlitePool, book_id: i64, shelf_id: i64) -> Result<MembershipRef> {
    sqlx::query_as::<_, MembershipRef>(
        r#"
        SELECT s.list_book_id, s.name
        FROM shelf s
        JOIN books b ON b.user_book_id = s.user_book_id
        WHERE b.book_id = ? AND s.shelf_id = ?
        ORDER BY s.id
        LIMIT 1
        "#,
    )
    .bind(book_id)
    .bind(shelf_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        HardcoverError::not_found(format!("book {} on shelf {}", book_id, shelf_id))
    })
}

/// Library entry id of a mirrored book, `None` if the book is not mirrored
pub async fn entry_id_for_book(pool: &SqlitePool, book_id: i64) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT user_book_id FROM books WHERE book_id = ?")
        .bind(book_id)
        .fetch_optional(pool)
        .await?;

    Ok(id)
}
