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


//! Search-string grammar
//!
//! ```text
//! dune herbert @Read --r
//! ^^^^^^^^^^^^ ^^^^^ ^^^
//! terms        status sort flag
//! ```
//!
//! - `--y`, `--r`, `--t` anywhere in the string pick the order (release year
//!   descending, community rating descending, title ascending). The first
//!   flag in the string wins; every flag is removed before tokenizing.
//! - `@Name` with an exact status name (`toRead`, `Reading`, `Read`, `DNF`)
//!   filters on that status. Any other `@` token is a fragment the user is
//!   still typing; only the last `@` token of the string can leave one.
//! - Everything else is a full-text term.

use crate::storage::models::ReadingStatus;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static::lazy_static! {
    static ref SORT_FLAG: Regex = Regex::new(r"--[yrt]").expect("sort flag pattern is valid");
}

/// Row order requested by a sort flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Index order
    #[default]
    Default,
    YearDesc,
    RatingDesc,
    TitleAsc,
}

impl SortOrder {
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "--y" => Some(SortOrder::YearDesc),
            "--r" => Some(SortOrder::RatingDesc),
            "--t" => Some(SortOrder::TitleAsc),
            _ => None,
        }
    }

    pub fn flag(self) -> Option<&'static str> {
        match self {
            SortOrder::Default => None,
            SortOrder::YearDesc => Some("--y"),
            SortOrder::RatingDesc => Some("--r"),
            SortOrder::TitleAsc => Some("--t"),
        }
    }
}

/// Remove every sort flag; the first one found picks the order
pub fn strip_sort_flag(input: &str) -> (String, SortOrder) {
    let sort = SORT_FLAG
        .find(input)
        .and_then(|m| SortOrder::from_flag(m.as_str()))
        .unwrap_or_default();

    (SORT_FLAG.replace_all(input, " ").into_owned(), sort)
}

/// A search string broken into its parts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedSearch {
    /// Full-text terms, in input order
    pub terms: Vec<String>,

    /// Resolved `@status` filters, all of which must hold
    pub statuses: Vec<ReadingStatus>,

    /// Unresolved `@` fragment, without the `@`
    pub tag_fragment: Option<String>,

    pub sort: SortOrder,
}

impl ParsedSearch {
    /// The terms as typed, joined by single spaces
    pub fn terms_text(&self) -> String {
        self.terms.join(" ")
    }

    /// Search string that selects `status` on top of the current terms
    pub fn with_status(&self, status: ReadingStatus) -> String {
        let terms = self.terms_text();
        if terms.is_empty() {
            format!("@{}", status.label())
        } else {
            format!("{} @{}", terms, status.label())
        }
    }
}

/// Parse a raw search string
pub fn parse(input: &str) -> ParsedSearch {
    let (stripped, sort) = strip_sort_flag(input);
    let mut parsed = ParsedSearch {
        sort,
        ..ParsedSearch::default()
    };

    for token in stripped.split_whitespace() {
        let Some(tag) = token.strip_prefix('@') else {
            parsed.terms.push(token.to_string());
            continue;
        };

        match ReadingStatus::from_label(tag) {
            Some(status) => {
                if !parsed.statuses.contains(&status) {
                    parsed.statuses.push(status);
                }
                parsed.tag_fragment = None;
            }
            None => parsed.tag_fragment = Some(tag.to_string()),
        }
    }

    parsed
}
