//! Integration tests for the full rebuild
//!
//! The remote library is served from `tests/fixtures`: four owned entries,
//! three shelves and two books that only exist on shelves.

mod common;

use common::{rebuilt_store, temp_config, FakeRemote, USER_ID};
use hardcover_core::api::payloads::CachedImage;
use hardcover_core::download::{CoverDownloader, CoverReport};
use hardcover_core::search::views;
use hardcover_core::storage::{state, Database};
use hardcover_core::sync;
use hardcover_core::sync::aggregates::{RATING_BUCKETS, STATUS_BUCKETS};
use sqlx::SqlitePool;

/// Every table flattened into comparable text, autoincrement ids left out
async fn snapshot(pool: &SqlitePool) -> Vec<String> {
    let statements = [
        "SELECT book_id || '|' || quote(user_book_id) || '|' || quote(user_rating) || '|' || status_id || '|' || title || '|' || quote(isbn_13) || '|' || shelves FROM books ORDER BY book_id",
        "SELECT journey_id || '|' || user_book_id || '|' || quote(started_at) || '|' || quote(finished_at) FROM journey ORDER BY journey_id",
        "SELECT book_id || '|' || name || '|' || quote(contribution) FROM author ORDER BY id",
        "SELECT shelf_id || '|' || user_book_id || '|' || list_book_id || '|' || name FROM shelf ORDER BY id",
        "SELECT shelf_id || '|' || name || '|' || books_count || '|' || public FROM bookshelves ORDER BY shelf_id",
        "SELECT rating || '|' || count FROM ratings ORDER BY rating",
        "SELECT status_id || '|' || count FROM status_counts ORDER BY status_id",
        "SELECT book_id || '|' || title || '|' || authors FROM books_authors_fts ORDER BY book_id",
    ];

    let mut rows = Vec::new();
    for statement in statements {
        let table: Vec<String> = sqlx::query_scalar(statement)
            .fetch_all(pool)
            .await
            .expect("Failed to snapshot table");
        rows.extend(table);
        rows.push("--".to_string());
    }
    rows
}

#[tokio::test]
async fn test_rebuild_mirrors_owned_and_shelf_only_books() {
    let (_dir, config) = temp_config();
    let (db, report) = rebuilt_store(&config).await;

    assert_eq!(report.user_id, USER_ID);
    assert_eq!(report.username, "reader");
    assert_eq!(report.books, 6);
    assert_eq!(report.indexed, 6);
    assert_eq!(report.reconcile.owned_entries, 4);
    assert_eq!(report.reconcile.shelf_only_books, 2);
    assert_eq!(report.reconcile.memberships, 6);
    assert_eq!(report.reconcile.journeys, 1);
    assert_eq!(report.reconcile.skipped_rows, 0);
    assert!(report.covers.is_none());

    let synced = state::read_last_synced(&config.last_synced_path())
        .await
        .expect("Failed to read stamp");
    assert!(synced.is_some());

    let identity = state::read_identity(&config.identity_path())
        .await
        .expect("Failed to read identity")
        .expect("identity written");
    assert_eq!(identity.id, USER_ID);

    db.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_synthetic_ids_are_negative_unique_and_reused() {
    let (_dir, config) = temp_config();
    let (db, _) = rebuilt_store(&config).await;

    let synthetic: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT book_id, user_book_id FROM books WHERE user_book_id < 0 ORDER BY user_book_id DESC",
    )
    .fetch_all(db.pool())
    .await
    .expect("Failed to query");
    assert_eq!(synthetic, vec![(50, -1), (51, -2)]);

    // Solaris sits on two shelves under the same synthetic entry
    let solaris_shelves: Vec<i64> =
        sqlx::query_scalar("SELECT shelf_id FROM shelf WHERE user_book_id = -1 ORDER BY id")
            .fetch_all(db.pool())
            .await
            .expect("Failed to query");
    assert_eq!(solaris_shelves, vec![8, 9]);

    let (rating, status, isbn): (Option<f64>, i64, Option<String>) = sqlx::query_as(
        "SELECT user_rating, status_id, isbn_13 FROM books WHERE book_id = 50",
    )
    .fetch_one(db.pool())
    .await
    .expect("Failed to query");
    assert_eq!(rating, None);
    assert_eq!(status, 0);
    assert_eq!(isbn, None);
}

#[tokio::test]
async fn test_owned_book_on_shelf_without_entry_reference_uses_owned_entry() {
    let (_dir, config) = temp_config();
    let (db, _) = rebuilt_store(&config).await;

    let entry: i64 = sqlx::query_scalar("SELECT user_book_id FROM shelf WHERE list_book_id = 602")
        .fetch_one(db.pool())
        .await
        .expect("Failed to query");
    assert_eq!(entry, 101);

    let dune_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE book_id = 1")
        .fetch_one(db.pool())
        .await
        .expect("Failed to query");
    assert_eq!(dune_rows, 1);
}

#[tokio::test]
async fn test_shelf_strings_follow_memberships() {
    let (_dir, config) = temp_config();
    let (db, report) = rebuilt_store(&config).await;

    let shelves: Vec<(i64, String)> =
        sqlx::query_as("SELECT book_id, shelves FROM books ORDER BY book_id")
            .fetch_all(db.pool())
            .await
            .expect("Failed to query");
    assert_eq!(
        shelves,
        vec![
            (1, "Favorites, Wishlist".to_string()),
            (2, String::new()),
            (3, "Favorites".to_string()),
            (4, String::new()),
            (50, "Wishlist, Classics".to_string()),
            (51, "Wishlist".to_string()),
        ]
    );
    assert_eq!(report.shelved_entries, 4);
}

#[tokio::test]
async fn test_histograms_are_complete_and_sum_to_book_count() {
    let (_dir, config) = temp_config();
    let (db, report) = rebuilt_store(&config).await;

    let ratings = views::rating_counts(db.pool()).await.expect("Failed to read ratings");
    assert_eq!(ratings.len(), RATING_BUCKETS);
    assert_eq!(ratings.iter().map(|r| r.count).sum::<i64>(), report.books);
    assert_eq!(ratings.first().map(|r| r.rating), Some(5.0));
    assert!(ratings.last().is_some_and(|r| r.is_unrated()));

    let count_at = |value: f64| {
        ratings
            .iter()
            .find(|r| r.rating == value)
            .map(|r| r.count)
            .expect("bucket present")
    };
    assert_eq!(count_at(0.0), 3);
    assert_eq!(count_at(3.0), 1);
    assert_eq!(count_at(4.0), 1);
    assert_eq!(count_at(4.5), 1);
    assert_eq!(count_at(5.0), 0);

    let statuses = views::status_counts(db.pool()).await.expect("Failed to read statuses");
    assert_eq!(statuses.len(), STATUS_BUCKETS);
    let counts: Vec<(i64, i64)> = statuses.iter().map(|s| (s.status_id, s.count)).collect();
    assert_eq!(counts, vec![(0, 2), (1, 1), (2, 1), (3, 2), (4, 0)]);
}

#[tokio::test]
async fn test_duplicate_contributions_kept_but_indexed_once() {
    let (_dir, config) = temp_config();
    let (db, _) = rebuilt_store(&config).await;

    let contributions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM author WHERE book_id = 4")
        .fetch_one(db.pool())
        .await
        .expect("Failed to query");
    assert_eq!(contributions, 2);

    let authors: Vec<(i64, String)> =
        sqlx::query_as("SELECT book_id, authors FROM books_authors_fts WHERE book_id IN (4, 51) ORDER BY book_id")
            .fetch_all(db.pool())
            .await
            .expect("Failed to query");
    assert_eq!(
        authors,
        vec![
            (4, "Frank Herbert".to_string()),
            (51, "Arkady Strugatsky, Boris Strugatsky".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let (_dir, config) = temp_config();
    let (db, first_report) = rebuilt_store(&config).await;
    let first = snapshot(db.pool()).await;

    let remote = FakeRemote::new();
    let second_report = sync::rebuild(&db, &remote, &config, None)
        .await
        .expect("Second rebuild failed");
    let second = snapshot(db.pool()).await;

    assert_eq!(first, second);
    assert_eq!(first_report.reconcile, second_report.reconcile);
}

#[tokio::test]
async fn test_fetch_failure_leaves_store_untouched() {
    let (_dir, config) = temp_config();
    let (db, _) = rebuilt_store(&config).await;
    let before = snapshot(db.pool()).await;
    let stamp_before = std::fs::read_to_string(config.last_synced_path()).expect("stamp exists");

    let remote = FakeRemote::new().failing_shelves();
    let result = sync::rebuild(&db, &remote, &config, None).await;
    assert!(result.is_err());
    assert_eq!(common::CallCounts::get(&remote.calls.shelf_metadata), 0);

    assert_eq!(snapshot(db.pool()).await, before);
    let stamp_after = std::fs::read_to_string(config.last_synced_path()).expect("stamp exists");
    assert_eq!(stamp_before, stamp_after);
}

#[tokio::test]
async fn test_rebuild_on_file_store() {
    let (_dir, config) = temp_config();
    let db = Database::new(&config.database_path()).await.expect("Failed to open store");

    let report = sync::rebuild(&db, &FakeRemote::new(), &config, None)
        .await
        .expect("Rebuild failed");
    assert_eq!(report.books, 6);
    db.close().await.expect("Failed to close");

    // A second process sees the committed data
    let reopened = Database::new(&config.database_path()).await.expect("Failed to reopen");
    let shelves = views::list_shelves(reopened.pool(), Some(1))
        .await
        .expect("Failed to list shelves");
    let names: Vec<(&str, bool)> = shelves
        .iter()
        .map(|s| (s.name.as_str(), s.contains_book))
        .collect();
    assert_eq!(
        names,
        vec![("Wishlist", true), ("Favorites", true), ("Classics", false)]
    );
}

#[tokio::test]
async fn test_failed_covers_do_not_fail_rebuild() {
    let (dir, config) = temp_config();
    let db = Database::new_in_memory().await.expect("Failed to create database");

    let mut remote = FakeRemote::new();
    remote.owned[0].book.cached_image = Some(CachedImage {
        url: Some("http://127.0.0.1:1/covers/dune.jpg".to_string()),
    });
    let covers = CoverDownloader::new(dir.path().join("covers")).expect("Failed to create downloader");

    let report = sync::rebuild(&db, &remote, &config, Some(&covers))
        .await
        .expect("Rebuild should succeed without covers");

    assert_eq!(report.books, 6);
    assert_eq!(
        report.covers,
        Some(CoverReport {
            requested: 1,
            downloaded: 0,
            skipped: 0,
            failed: 1,
        })
    );
    assert!(config.last_synced_path().exists());
    assert!(!dir.path().join("covers").join("dune.jpg").exists());
}
