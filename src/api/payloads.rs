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


//! Wire types for the Hardcover GraphQL API
//!
//! Hardcover exposes several columns as free-form JSON (`cached_image`,
//! `cached_contributors`, the search `results`), so most fields here are
//! optional and lists tolerate an explicit `null`.

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// ENVELOPE
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlErrorEntry {
    pub message: String,
}

// ============================================================================
// SHARED BOOK SNAPSHOT
// ============================================================================

/// Book attributes as embedded in both the owned-library and shelf payloads
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BookSnapshot {
    /// Present in the owned-library payload only
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub release_year: Option<i64>,
    #[serde(default)]
    pub ratings_count: Option<i64>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub cached_image: Option<CachedImage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cached_contributors: Vec<ContributorEntry>,
}

impl BookSnapshot {
    /// Non-empty cover URL, if any
    pub fn image_url(&self) -> Option<&str> {
        self.cached_image
            .as_ref()
            .and_then(|image| image.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CachedImage {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContributorEntry {
    #[serde(default)]
    pub author: Option<AuthorRef>,
    #[serde(default)]
    pub contribution: Option<String>,
}

impl ContributorEntry {
    pub fn author_name(&self) -> Option<&str> {
        self.author
            .as_ref()
            .and_then(|author| author.name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthorRef {
    #[serde(default)]
    pub name: Option<String>,
}

// ============================================================================
// OWNED LIBRARY
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_books: Vec<UserBook>,
}

/// A library entry of the signed-in user
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserBook {
    pub id: i64,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_book_reads: Vec<UserBookRead>,
    pub book: BookSnapshot,
    #[serde(default)]
    pub edition: Option<Edition>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserBookRead {
    pub id: i64,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Edition {
    #[serde(default)]
    pub isbn_10: Option<String>,
    #[serde(default)]
    pub isbn_13: Option<String>,
}

// ============================================================================
// SHELVES (LISTS)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShelvesData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub lists: Vec<ShelfList>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShelfList {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub books_count: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub list_books: Vec<ListBook>,
}

/// A shelf member: the list_book row plus an embedded book snapshot
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListBook {
    /// Membership row id (list_book id)
    pub id: i64,
    pub book_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub book: BookSnapshot,
    /// The signed-in user's library entries for this book, if owned
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_books: Vec<UserBookRef>,
}

impl ListBook {
    pub fn owned_entry_id(&self) -> Option<i64> {
        self.user_books.first().map(|entry| entry.id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserBookRef {
    pub id: i64,
}

// ============================================================================
// SHELF METADATA
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShelfMetadataData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub me: Vec<ShelfOwner>,
}

impl ShelfMetadataData {
    pub fn into_shelves(self) -> Vec<ShelfMetadata> {
        self.me.into_iter().next().map(|owner| owner.lists).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShelfOwner {
    #[serde(default, deserialize_with = "null_as_default")]
    pub lists: Vec<ShelfMetadata>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShelfMetadata {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub books_count: i64,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub slug: Option<String>,
}

// ============================================================================
// IDENTITY
// ============================================================================

/// Full `me` response, as stored in the identity file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityResponse {
    #[serde(default)]
    pub data: Option<IdentityData>,
}

impl IdentityResponse {
    pub fn into_identity(self) -> Option<Identity> {
        self.data.and_then(|data| data.into_identity())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub me: Vec<Identity>,
}

impl IdentityData {
    pub fn into_identity(self) -> Option<Identity> {
        self.me.into_iter().next()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    /// Last time anything changed on the remote profile
    #[serde(default)]
    pub updated_at: Option<String>,
}

// ============================================================================
// CATALOG SEARCH
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SearchData {
    pub search: SearchEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub results: Option<SearchResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub found: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hits: Vec<SearchHitEnvelope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHitEnvelope {
    pub document: CatalogDocument,
}

/// Search index document; the index stores ids as strings
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDocument {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image: Option<CachedImage>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub ratings_count: Option<i64>,
    #[serde(default)]
    pub release_year: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contributions: Vec<ContributorEntry>,
}

/// Flattened catalog search result, also the search cache record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogBook {
    pub id: i64,
    pub title: String,
    pub authors: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub rating: f64,
    pub ratings_count: i64,
    pub release_year: Option<i64>,
    pub slug: Option<String>,
    /// Total hits reported by the search index
    pub found: i64,
}

impl CatalogBook {
    /// Flatten a search document; `None` if its id is not numeric
    pub fn from_document(document: CatalogDocument, found: i64) -> Option<Self> {
        let id = document.id.trim().parse::<i64>().ok()?;
        let authors = document
            .contributions
            .iter()
            .filter_map(ContributorEntry::author_name)
            .collect::<Vec<_>>()
            .join(", ");

        Some(Self {
            id,
            title: document.title.unwrap_or_default(),
            authors,
            description: document.description,
            image_url: document.image.and_then(|image| image.url).filter(|url| !url.is_empty()),
            rating: document.rating.unwrap_or(0.0),
            ratings_count: document.ratings_count.unwrap_or(0),
            release_year: document.release_year,
            slug: document.slug,
            found,
        })
    }
}

// ============================================================================
// MUTATIONS
// ============================================================================

/// Common shape of the `*_user_book` / `*_list_book` mutation payloads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MutationPayload {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_book_tolerates_nulls() {
        let json = r#"{
            "id": 7,
            "status_id": 3,
            "rating": null,
            "user_book_reads": null,
            "book": {
                "id": 100,
                "title": "Dune",
                "rating": 4.256,
                "cached_image": {},
                "cached_contributors": [
                    {"author": {"name": "Frank Herbert", "slug": "frank-herbert"}, "contribution": null}
                ],
                "release_year": null,
                "ratings_count": 10,
                "slug": "dune"
            },
            "edition": null
        }"#;

        let entry: UserBook = serde_json::from_str(json).expect("Failed to decode user book");
        assert_eq!(entry.id, 7);
        assert!(entry.user_book_reads.is_empty());
        assert!(entry.book.image_url().is_none());
        assert_eq!(entry.book.cached_contributors[0].author_name(), Some("Frank Herbert"));
    }

    #[test]
    fn test_catalog_document_flattening() {
        let json = r#"{
            "id": "312",
            "title": "Hyperion",
            "image": {"url": "https://assets.hardcover.app/books/312/cover.jpg"},
            "rating": 4.2,
            "ratings_count": 88,
            "release_year": 1989,
            "contributions": [{"author": {"name": "Dan Simmons"}}, {"author": {"name": ""}}]
        }"#;

        let doc: CatalogDocument = serde_json::from_str(json).expect("Failed to decode document");
        let book = CatalogBook::from_document(doc, 5).expect("numeric id");
        assert_eq!(book.id, 312);
        assert_eq!(book.authors, "Dan Simmons");
        assert_eq!(book.found, 5);

        let bad: CatalogDocument = serde_json::from_str(r#"{"id": "abc"}"#).expect("decode");
        assert!(CatalogBook::from_document(bad, 1).is_none());
    }

    #[test]
    fn test_shelf_metadata_takes_first_owner() {
        let json = r#"{"me": [{"lists": [{"id": 1, "name": "Favorites", "books_count": 3, "public": true, "slug": "favorites"}]}]}"#;
        let data: ShelfMetadataData = serde_json::from_str(json).expect("decode");
        let shelves = data.into_shelves();
        assert_eq!(shelves.len(), 1);
        assert!(shelves[0].public);
    }
}
