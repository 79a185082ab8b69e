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


//! Derived data recomputed at the end of every rebuild
//!
//! None of these functions look at remote payloads. They read the final
//! state of `books` and `shelf` and overwrite what is derived from it:
//!
//! - the comma-joined shelf names on each `books` row
//! - the rating histogram, 11 buckets from 0.0 to 5.0 in steps of 0.5
//! - the status histogram, one row per status 0..=4
//!
//! Every bucket is written even when its count is zero.

use crate::error::Result;
use crate::storage::queries;
use sqlx::{Executor, SqliteConnection};
use std::collections::HashMap;
use tracing::debug;

/// Number of rating buckets (0.0, 0.5, ..., 5.0)
pub const RATING_BUCKETS: usize = 11;

/// Number of status buckets (0 unset through 4 did-not-finish)
pub const STATUS_BUCKETS: usize = 5;

// Personal ratings are snapped to the nearest half star. NULL counts as 0.0,
// so every books row lands in exactly one bucket.
const RATING_HISTOGRAM: &str = r#"
WITH RECURSIVE steps(n) AS (
    SELECT 0
    UNION ALL
    SELECT n + 1 FROM steps WHERE n < 10
)
INSERT INTO ratings (rating, count)
SELECT
    steps.n * 0.5,
    (SELECT COUNT(*)
     FROM books b
     WHERE CAST(ROUND(MIN(MAX(COALESCE(b.user_rating, 0.0), 0.0), 5.0) * 2) AS INTEGER) = steps.n)
FROM steps
ORDER BY steps.n
"#;

const STATUS_HISTOGRAM: &str = r#"
WITH RECURSIVE steps(n) AS (
    SELECT 0
    UNION ALL
    SELECT n + 1 FROM steps WHERE n < 4
)
INSERT INTO status_counts (status_id, count)
SELECT
    steps.n,
    (SELECT COUNT(*) FROM books b WHERE b.status_id = steps.n)
FROM steps
ORDER BY steps.n
"#;

/// Join shelf names per entry in membership order, without repeats
fn group_shelf_names(memberships: Vec<(i64, String)>) -> Vec<(i64, String)> {
    let mut order: Vec<i64> = Vec::new();
    let mut names: HashMap<i64, Vec<String>> = HashMap::new();

    for (user_book_id, name) in memberships {
        let entry = names.entry(user_book_id).or_insert_with(|| {
            order.push(user_book_id);
            Vec::new()
        });
        if !entry.contains(&name) {
            entry.push(name);
        }
    }

    order
        .into_iter()
        .map(|id| {
            let joined = names.remove(&id).unwrap_or_default().join(", ");
            (id, joined)
        })
        .collect()
}

/// Rewrite `books.shelves` from the membership table
///
/// Entries without memberships get an empty string. Returns how many
/// entries are on at least one shelf.
pub async fn recompute_shelf_strings(conn: &mut SqliteConnection) -> Result<usize> {
    (&mut *conn)
        .execute("UPDATE books SET shelves = ''")
        .await?;

    let grouped = group_shelf_names(queries::list_memberships(conn).await?);
    for (user_book_id, shelves) in &grouped {
        queries::update_book_shelves(conn, *user_book_id, shelves).await?;
    }

    debug!("Shelf names written for {} entries", grouped.len());
    Ok(grouped.len())
}

/// Replace the rating histogram
pub async fn recompute_rating_histogram(conn: &mut SqliteConnection) -> Result<()> {
    (&mut *conn).execute("DELETE FROM ratings").await?;
    let written = (&mut *conn).execute(RATING_HISTOGRAM).await?.rows_affected();

    debug!("Rating histogram written ({} buckets)", written);
    Ok(())
}

/// Replace the status histogram
pub async fn recompute_status_histogram(conn: &mut SqliteConnection) -> Result<()> {
    (&mut *conn).execute("DELETE FROM status_counts").await?;
    let written = (&mut *conn).execute(STATUS_HISTOGRAM).await?.rows_affected();

    debug!("Status histogram written ({} buckets)", written);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn insert_book(conn: &mut SqliteConnection, book_id: i64, user_book_id: i64, rating: Option<f64>, status: i64) {
        sqlx::query(
            "INSERT INTO books (book_id, user_book_id, user_rating, status_id, title) VALUES (?, ?, ?, ?, 'x')",
        )
        .bind(book_id)
        .bind(user_book_id)
        .bind(rating)
        .bind(status)
        .execute(&mut *conn)
        .await
        .expect("Failed to insert book");
    }

    #[test]
    fn test_group_shelf_names_keeps_first_seen_order() {
        let grouped = group_shelf_names(vec![
            (10, "Favorites".to_string()),
            (-1, "Wishlist".to_string()),
            (10, "Sci-Fi".to_string()),
            (10, "Favorites".to_string()),
        ]);

        assert_eq!(
            grouped,
            vec![
                (10, "Favorites, Sci-Fi".to_string()),
                (-1, "Wishlist".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_histograms_are_complete() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        let mut conn = db.pool().acquire().await.expect("Failed to acquire connection");

        insert_book(&mut conn, 1, 10, Some(4.5), 3).await;
        insert_book(&mut conn, 2, 20, Some(0.0), 1).await;
        insert_book(&mut conn, 3, -1, None, 0).await;
        insert_book(&mut conn, 4, 40, Some(3.75), 3).await;

        recompute_rating_histogram(&mut conn).await.expect("Failed to compute ratings");
        recompute_status_histogram(&mut conn).await.expect("Failed to compute statuses");

        let ratings: Vec<(f64, i64)> =
            sqlx::query_as("SELECT rating, count FROM ratings ORDER BY rating")
                .fetch_all(&mut *conn)
                .await
                .expect("Failed to read ratings");
        assert_eq!(ratings.len(), RATING_BUCKETS);
        assert_eq!(ratings.iter().map(|(_, c)| c).sum::<i64>(), 4);
        assert_eq!(ratings[0], (0.0, 2));
        assert_eq!(ratings[8], (4.0, 1));
        assert_eq!(ratings[9], (4.5, 1));

        let statuses: Vec<(i64, i64)> =
            sqlx::query_as("SELECT status_id, count FROM status_counts ORDER BY status_id")
                .fetch_all(&mut *conn)
                .await
                .expect("Failed to read statuses");
        assert_eq!(statuses, vec![(0, 1), (1, 1), (2, 0), (3, 2), (4, 0)]);

        // Running twice must not duplicate buckets
        recompute_rating_histogram(&mut conn).await.expect("Failed to compute ratings");
        let buckets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings")
            .fetch_one(&mut *conn)
            .await
            .expect("Failed to count buckets");
        assert_eq!(buckets, RATING_BUCKETS as i64);
    }

    #[tokio::test]
    async fn test_shelf_strings_follow_memberships() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        let mut conn = db.pool().acquire().await.expect("Failed to acquire connection");

        insert_book(&mut conn, 1, 10, Some(0.0), 3).await;
        insert_book(&mut conn, 2, 20, Some(0.0), 1).await;
        for (shelf_id, list_book_id, name) in [(7, 100, "Favorites"), (8, 101, "Sci-Fi")] {
            sqlx::query("INSERT INTO shelf (shelf_id, user_book_id, list_book_id, name) VALUES (?, 10, ?, ?)")
                .bind(shelf_id)
                .bind(list_book_id)
                .bind(name)
                .execute(&mut *conn)
                .await
                .expect("Failed to insert membership");
        }

        let shelved = recompute_shelf_strings(&mut conn).await.expect("Failed to compute shelves");
        assert_eq!(shelved, 1);

        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT user_book_id, shelves FROM books ORDER BY user_book_id")
                .fetch_all(&mut *conn)
                .await
                .expect("Failed to read shelves");
        assert_eq!(
            rows,
            vec![(10, "Favorites, Sci-Fi".to_string()), (20, String::new())]
        );
    }
}
