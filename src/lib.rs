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


//! Local mirror of a Hardcover library
//!
//! The owned library and the shelves are fetched from the Hardcover GraphQL
//! API, reconciled into one SQLite store with a full-text index, and searched
//! with a small token grammar (`dune @Read --r`). Every invocation is
//! single-shot: open the store, answer, exit.
//!
//! - [`api`]: GraphQL client, read queries and mutations
//! - [`sync`]: full rebuild, reconciliation, derived tables, staleness
//! - [`search`]: library search planner, browse views, catalog search
//! - [`storage`]: schema, row queries and sidecar files
//! - [`download`]: cover images

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod logging;
pub mod search;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use error::{HardcoverError, Result};
