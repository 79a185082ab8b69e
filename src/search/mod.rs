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


//! Searching the mirror and the remote catalog
//!
//! - [`grammar`] splits a search string into terms, status tags and a sort flag
//! - [`breadcrumb`] validates the drill-down context
//! - [`planner`] builds and runs the library search
//! - [`views`] serves the shelves, status and rating browse views
//! - [`catalog`] searches the remote catalog through a single-slot cache

pub mod breadcrumb;
pub mod catalog;
pub mod grammar;
pub mod planner;
pub mod views;

pub use breadcrumb::{Breadcrumb, BreadcrumbContext};
pub use catalog::{search_catalog, CatalogHit, CatalogResults};
pub use grammar::{parse, ParsedSearch, SortOrder};
pub use planner::{search_library, SearchOutcome, SearchPlan};
