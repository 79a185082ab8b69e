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


//! Remote catalog search
//!
//! Searches the whole Hardcover catalog, not just the user's library. The
//! last normalized query and its results are kept in a single-slot cache
//! file: typing a sort flag after a search re-sorts the cached results
//! without another request. Each result is annotated with the local status,
//! rating and shelves when the book is mirrored.

use crate::api::payloads::CatalogBook;
use crate::api::RemoteLibrary;
use crate::config::Config;
use crate::download::{cover_file_name, CoverDownloader};
use crate::error::Result;
use crate::search::grammar::{strip_sort_flag, SortOrder};
use crate::search::views;
use crate::storage::models::BookAnnotation;
use crate::storage::state::{self, SearchCache};
use serde::Serialize;
use sqlx::SqlitePool;
use std::cmp::Ordering;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One catalog result with its local state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogHit {
    #[serde(flatten)]
    pub book: CatalogBook,

    /// File name of the downloaded cover
    pub cover_file: Option<String>,

    /// Local state, `None` when the book is not mirrored
    pub local: Option<BookAnnotation>,
}

/// Results of a catalog search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogResults {
    /// Normalized query the results belong to
    pub query: String,
    pub from_cache: bool,
    pub sort: SortOrder,
    pub hits: Vec<CatalogHit>,
}

/// Normalize a raw search string for the remote catalog
///
/// The sort flag is split off, and `@` tokens and lone `-` / `--` are
/// dropped. What remains is joined with single spaces.
pub fn normalize_query(input: &str) -> (String, SortOrder) {
    let (stripped, sort) = strip_sort_flag(input);
    let query = stripped
        .split_whitespace()
        .filter(|token| !token.starts_with('@') && *token != "-" && *token != "--")
        .collect::<Vec<_>>()
        .join(" ");

    (query, sort)
}

/// Sort results client-side; the default order keeps the remote ranking
pub fn sort_books(books: &mut [CatalogBook], sort: SortOrder) {
    if sort == SortOrder::Default {
        return;
    }

    books.sort_by(|a, b| match sort {
        SortOrder::YearDesc => b.release_year.cmp(&a.release_year),
        SortOrder::RatingDesc => b.rating.total_cmp(&a.rating),
        SortOrder::TitleAsc => a.title.cmp(&b.title),
        SortOrder::Default => Ordering::Equal,
    });
}

async fn cached_results(config: &Config, query: &str) -> Option<Vec<CatalogBook>> {
    match state::read_search_cache(&config.search_cache_path()).await {
        Ok(Some(cache)) if cache.query == query => Some(cache.results),
        Ok(_) => None,
        Err(e) => {
            warn!("Search cache unreadable: {}", e);
            None
        }
    }
}

/// Search the catalog, reusing the cached results for an identical query
pub async fn search_catalog<R>(
    remote: &R,
    pool: &SqlitePool,
    config: &Config,
    input: &str,
    covers: Option<&CoverDownloader>,
) -> Result<CatalogResults>
where
    R: RemoteLibrary + ?Sized,
{
    let started = Instant::now();
    let (query, sort) = normalize_query(input);

    if query.is_empty() {
        return Ok(CatalogResults {
            query,
            from_cache: false,
            sort,
            hits: Vec::new(),
        });
    }

    let (mut books, from_cache) = match cached_results(config, &query).await {
        Some(books) => {
            debug!("Catalog search {:?} served from cache", query);
            (books, true)
        }
        None => {
            let books = remote.search_catalog(&query, config.result_length).await?;

            if let Some(downloader) = covers {
                let urls = books.iter().filter_map(|b| b.image_url.clone());
                downloader.download_all(urls).await;
            }

            let cache = SearchCache {
                query: query.clone(),
                results: books.clone(),
            };
            if let Err(e) = state::write_search_cache(&config.search_cache_path(), &cache).await {
                warn!("Failed to write search cache: {}", e);
            }
            (books, false)
        }
    };

    sort_books(&mut books, sort);

    let mut annotations = views::book_annotations(pool).await?;
    let hits = books
        .into_iter()
        .map(|book| CatalogHit {
            cover_file: book.image_url.as_deref().and_then(cover_file_name),
            local: annotations.remove(&book.id),
            book,
        })
        .collect();

    info!("Catalog search {:?} took {:?}", query, started.elapsed());
    Ok(CatalogResults {
        query,
        from_cache,
        sort,
        hits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, title: &str, rating: f64, year: Option<i64>) -> CatalogBook {
        CatalogBook {
            id,
            title: title.to_string(),
            authors: String::new(),
            description: None,
            image_url: None,
            rating,
            ratings_count: 0,
            release_year: year,
            slug: None,
            found: 3,
        }
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(
            normalize_query("dune @Read - herbert -- --y"),
            ("dune herbert".to_string(), SortOrder::YearDesc)
        );
        assert_eq!(normalize_query("  "), (String::new(), SortOrder::Default));
    }

    #[test]
    fn test_sort_books() {
        let mut books = vec![
            book(1, "Hyperion", 4.1, Some(1989)),
            book(2, "Dune", 4.3, None),
            book(3, "Solaris", 3.9, Some(1961)),
        ];

        sort_books(&mut books, SortOrder::RatingDesc);
        assert_eq!(books.iter().map(|b| b.id).collect::<Vec<_>>(), vec![2, 1, 3]);

        sort_books(&mut books, SortOrder::YearDesc);
        assert_eq!(books.iter().map(|b| b.id).collect::<Vec<_>>(), vec![1, 3, 2]);

        sort_books(&mut books, SortOrder::TitleAsc);
        assert_eq!(books.iter().map(|b| b.id).collect::<Vec<_>>(), vec![2, 1, 3]);
    }
}
