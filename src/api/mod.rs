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


//! Hardcover API
//!
//! `RemoteLibrary` is the read side the rebuild and catalog search depend on.
//! `HardcoverClient` implements it over GraphQL; tests substitute fakes.
//! Writes (rating, status, shelves) live on the client in [`mutations`].

pub mod client;
pub mod library;
pub mod mutations;
pub mod payloads;

pub use client::{ClientConfig, HardcoverClient};
pub use mutations::MutationOutcome;
pub use payloads::{CatalogBook, Identity, ShelfList, ShelfMetadata, UserBook};

use crate::error::Result;
use async_trait::async_trait;

/// Identity together with the response body it was decoded from
#[derive(Debug, Clone)]
pub struct FetchedIdentity {
    pub identity: Identity,
    pub raw: String,
}

/// Read access to a user's remote library
#[async_trait]
pub trait RemoteLibrary: Send + Sync {
    /// The signed-in user (`me`)
    async fn fetch_identity(&self) -> Result<FetchedIdentity>;

    /// Every library entry of `user_id`, with journeys, edition and book snapshot
    async fn fetch_owned_library(&self, user_id: i64) -> Result<Vec<UserBook>>;

    /// Every shelf of `user_id` with its members and their book snapshots
    async fn fetch_shelves(&self, user_id: i64) -> Result<Vec<ShelfList>>;

    /// Shelf names, counts and visibility of the signed-in user
    async fn fetch_shelf_metadata(&self) -> Result<Vec<ShelfMetadata>>;

    /// Full-text search over the whole remote catalog
    async fn search_catalog(&self, query: &str, per_page: u32) -> Result<Vec<CatalogBook>>;
}
