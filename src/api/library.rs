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


//! Library read queries
//!
//! GraphQL documents for the owned library, shelves, shelf metadata, identity
//! and catalog search, and the `RemoteLibrary` implementation over them.

use crate::api::client::{decode_response, HardcoverClient};
use crate::api::payloads::{
    CatalogBook, IdentityData, LibraryData, SearchData, ShelfList, ShelfMetadata,
    ShelfMetadataData, ShelvesData, UserBook,
};
use crate::api::{FetchedIdentity, RemoteLibrary};
use crate::error::{HardcoverError, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

// ============================================================================
// GRAPHQL DOCUMENTS
// ============================================================================

pub const IDENTITY_QUERY: &str = r#"
query Identity {
  me {
    id
    username
    updated_at
  }
}
"#;

pub const OWNED_LIBRARY_QUERY: &str = r#"
query OwnedLibrary($userId: Int!) {
  user_books(where: {user_id: {_eq: $userId}}) {
    id
    status_id
    rating
    book {
      id
      title
      rating
      cached_image
      cached_contributors
      release_year
      ratings_count
      slug
    }
    user_book_reads {
      id
      started_at
      finished_at
    }
    edition {
      isbn_10
      isbn_13
    }
  }
}
"#;

pub const SHELVES_QUERY: &str = r#"
query Shelves($userId: Int!) {
  lists(where: {user_id: {_eq: $userId}}) {
    id
    name
    books_count
    list_books {
      id
      book_id
      book {
        title
        rating
        cached_image
        cached_contributors
        release_year
        ratings_count
        slug
      }
      user_books(where: {user_id: {_eq: $userId}}) {
        id
      }
    }
  }
}
"#;

pub const SHELF_METADATA_QUERY: &str = r#"
query ShelfMetadata {
  me {
    lists {
      id
      name
      books_count
      public
      slug
    }
  }
}
"#;

pub const CATALOG_SEARCH_QUERY: &str = r#"
query CatalogSearch($query: String!, $perPage: Int!) {
  search(query: $query, query_type: "Book", per_page: $perPage, page: 1) {
    results
  }
}
"#;

// ============================================================================
// REMOTE LIBRARY IMPLEMENTATION
// ============================================================================

#[async_trait]
impl RemoteLibrary for HardcoverClient {
    async fn fetch_identity(&self) -> Result<FetchedIdentity> {
        let raw = self
            .execute_raw("identity", IDENTITY_QUERY, serde_json::Value::Null)
            .await?;
        let data: IdentityData = decode_response("identity", &raw)?;
        let identity = data
            .into_identity()
            .ok_or_else(|| HardcoverError::not_found("current user (me)"))?;

        Ok(FetchedIdentity { identity, raw })
    }

    async fn fetch_owned_library(&self, user_id: i64) -> Result<Vec<UserBook>> {
        let data: LibraryData = self
            .execute("owned_library", OWNED_LIBRARY_QUERY, json!({ "userId": user_id }))
            .await?;

        info!("Fetched {} owned library entries", data.user_books.len());
        Ok(data.user_books)
    }

    async fn fetch_shelves(&self, user_id: i64) -> Result<Vec<ShelfList>> {
        let data: ShelvesData = self
            .execute("shelves", SHELVES_QUERY, json!({ "userId": user_id }))
            .await?;

        info!("Fetched {} shelves", data.lists.len());
        Ok(data.lists)
    }

    async fn fetch_shelf_metadata(&self) -> Result<Vec<ShelfMetadata>> {
        let data: ShelfMetadataData = self
            .execute("shelf_metadata", SHELF_METADATA_QUERY, serde_json::Value::Null)
            .await?;

        Ok(data.into_shelves())
    }

    async fn search_catalog(&self, query: &str, per_page: u32) -> Result<Vec<CatalogBook>> {
        let data: SearchData = self
            .execute(
                "catalog_search",
                CATALOG_SEARCH_QUERY,
                json!({ "query": query, "perPage": per_page }),
            )
            .await?;

        let results = data.search.results.unwrap_or_default();
        let found = results.found;
        let books = results
            .hits
            .into_iter()
            .filter_map(|hit| {
                let id = hit.document.id.clone();
                let book = CatalogBook::from_document(hit.document, found);
                if book.is_none() {
                    warn!("Skipping catalog hit with non-numeric id {:?}", id);
                }
                book
            })
            .collect();

        Ok(books)
    }
}
