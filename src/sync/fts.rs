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


//! Full-text index over titles and authors
//!
//! `books_authors_fts` holds one row per book: its id (not indexed), its
//! title, and the distinct contributor names joined with `", "`. The index
//! is never patched, only rebuilt from `books` and `author`.

use crate::error::Result;
use sqlx::{Executor, SqliteConnection};
use tracing::debug;

const CREATE_INDEX: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS books_authors_fts
USING fts5(book_id UNINDEXED, title, authors)
"#;

const DROP_INDEX: &str = "DROP TABLE IF EXISTS books_authors_fts";

const POPULATE_INDEX: &str = r#"
INSERT INTO books_authors_fts (book_id, title, authors)
SELECT
    b.book_id,
    b.title,
    COALESCE(
        (SELECT GROUP_CONCAT(name, ', ')
         FROM (SELECT a.name AS name
               FROM author a
               WHERE a.book_id = b.book_id
               GROUP BY a.name
               ORDER BY MIN(a.id))),
        ''
    )
FROM books b
"#;

/// Create the index table if it does not exist yet
pub async fn ensure_index(conn: &mut SqliteConnection) -> Result<()> {
    (&mut *conn).execute(CREATE_INDEX).await?;
    Ok(())
}

/// Drop the index and fill it again from the current tables
///
/// Returns the number of indexed books.
pub async fn rebuild_index(conn: &mut SqliteConnection) -> Result<u64> {
    (&mut *conn).execute(DROP_INDEX).await?;
    (&mut *conn).execute(CREATE_INDEX).await?;
    let indexed = (&mut *conn).execute(POPULATE_INDEX).await?.rows_affected();

    debug!("Indexed {} books for full-text search", indexed);
    Ok(indexed)
}

/// Quote one token as an FTS5 prefix term: `dune` becomes `"dune"*`
pub fn prefix_term(token: &str) -> String {
    format!("\"{}\"*", token.replace('"', "\"\""))
}

/// MATCH expression for whitespace-separated terms, implicitly ANDed
///
/// Punctuation-only tokens are dropped. Returns `None` when there is
/// nothing left to match.
pub fn match_expression<S: AsRef<str>>(terms: &[S]) -> Option<String> {
    let parts: Vec<String> = terms
        .iter()
        .flat_map(|term| term.as_ref().split_whitespace())
        // A token without word characters would become the empty phrase
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .map(prefix_term)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_terms_are_quoted_prefixes() {
        assert_eq!(prefix_term("dune"), "\"dune\"*");
        assert_eq!(prefix_term("say\"what"), "\"say\"\"what\"*");
        assert_eq!(
            match_expression(&["dune", "herbert"]).as_deref(),
            Some("\"dune\"* \"herbert\"*")
        );
        assert_eq!(match_expression::<&str>(&[]), None);
        assert_eq!(match_expression(&["  "]), None);
    }

    #[test]
    fn test_punctuation_tokens_are_dropped() {
        assert_eq!(match_expression(&["-"]), None);
        assert_eq!(match_expression(&["\"", "--", "…"]), None);
        assert_eq!(match_expression(&["dune -"]).as_deref(), Some("\"dune\"*"));
        assert_eq!(match_expression(&["o'brien"]).as_deref(), Some("\"o'brien\"*"));
    }

    #[tokio::test]
    async fn test_rebuild_joins_distinct_authors() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        let mut conn = db.pool().acquire().await.expect("Failed to acquire connection");

        sqlx::query("INSERT INTO books (book_id, user_book_id, title) VALUES (1, 10, 'Good Omens')")
            .execute(&mut *conn)
            .await
            .expect("Failed to insert book");
        for (name, role) in [
            ("Terry Pratchett", None),
            ("Neil Gaiman", None),
            ("Neil Gaiman", Some("Editor")),
        ] {
            sqlx::query("INSERT INTO author (book_id, name, contribution) VALUES (1, ?, ?)")
                .bind(name)
                .bind(role)
                .execute(&mut *conn)
                .await
                .expect("Failed to insert author");
        }

        let indexed = rebuild_index(&mut conn).await.expect("Failed to rebuild index");
        assert_eq!(indexed, 1);

        let authors: String = sqlx::query_scalar("SELECT authors FROM books_authors_fts")
            .fetch_one(&mut *conn)
            .await
            .expect("Failed to read index");
        assert_eq!(authors, "Terry Pratchett, Neil Gaiman");

        let hits: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books_authors_fts WHERE books_authors_fts MATCH ?",
        )
        .bind(match_expression(&["gaim", "omen"]).expect("expression"))
        .fetch_one(&mut *conn)
        .await
        .expect("Failed to query index");
        assert_eq!(hits, 1);
    }
}
