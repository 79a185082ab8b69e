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


//! Library search planner
//!
//! Turns a [`ParsedSearch`] and a [`Breadcrumb`] into one parameterized
//! statement over the full-text index and `books`. Every predicate is ANDed.
//! Each returned row carries window counts over the whole filtered set: the
//! total and one count per assignable status.
//!
//! An unresolved `@` fragment never lists books. The planner runs the
//! filtered statement for a single row and answers with the statuses whose
//! name contains the fragment, counted over the filtered set.

use crate::error::Result;
use crate::search::breadcrumb::Breadcrumb;
use crate::search::grammar::{self, ParsedSearch, SortOrder};
use crate::storage::models::{ReadingStatus, SearchHit, StatusTag};
use crate::sync::fts;
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Instant;
use tracing::{debug, info};

const SELECT_HITS: &str = r#"
SELECT
    b.book_id,
    b.title,
    books_authors_fts.authors AS authors,
    b.release_year,
    b.user_rating,
    b.rating,
    b.ratings_count,
    b.shelves,
    b.cover_file,
    b.status_id,
    b.user_book_id,
    b.slug,
    COUNT(*) OVER () AS total_count,
    SUM(CASE WHEN b.status_id = 1 THEN 1 ELSE 0 END) OVER () AS count_status_1,
    SUM(CASE WHEN b.status_id = 2 THEN 1 ELSE 0 END) OVER () AS count_status_2,
    SUM(CASE WHEN b.status_id = 3 THEN 1 ELSE 0 END) OVER () AS count_status_3,
    SUM(CASE WHEN b.status_id = 4 THEN 1 ELSE 0 END) OVER () AS count_status_4
FROM books_authors_fts
JOIN books b ON books_authors_fts.book_id = b.book_id"#;

const JOIN_SHELF: &str = "\nLEFT JOIN shelf s ON s.user_book_id = b.user_book_id";

/// A bound statement parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
    Real(f64),
}

/// One ANDed condition of a library search
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// FTS5 MATCH expression
    Match(String),
    Status(ReadingStatus),
    Shelf(i64),
    /// Personal rating, NULL counting as 0.0
    Rating(f64),
}

impl Predicate {
    fn sql(&self) -> &'static str {
        match self {
            Predicate::Match(_) => "books_authors_fts MATCH ?",
            Predicate::Status(_) => "b.status_id = ?",
            Predicate::Shelf(_) => "s.shelf_id = ?",
            Predicate::Rating(_) => "COALESCE(b.user_rating, 0.0) = ?",
        }
    }

    fn param(&self) -> SqlParam {
        match self {
            Predicate::Match(expression) => SqlParam::Text(expression.clone()),
            Predicate::Status(status) => SqlParam::Integer(status.id()),
            Predicate::Shelf(id) => SqlParam::Integer(*id),
            Predicate::Rating(rating) => SqlParam::Real(*rating),
        }
    }
}

fn order_clause(sort: SortOrder) -> Option<&'static str> {
    match sort {
        SortOrder::Default => None,
        SortOrder::YearDesc => Some("ORDER BY b.release_year DESC, b.book_id"),
        SortOrder::RatingDesc => Some("ORDER BY b.rating DESC, b.book_id"),
        SortOrder::TitleAsc => Some("ORDER BY b.title ASC, b.book_id"),
    }
}

/// Request-scoped filter accumulator for one search
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPlan {
    pub predicates: Vec<Predicate>,
    pub sort: SortOrder,
    pub limit: Option<u32>,
}

impl SearchPlan {
    /// Collect the predicates of a parsed search and its breadcrumb
    pub fn new(parsed: &ParsedSearch, breadcrumb: Breadcrumb) -> Self {
        let mut predicates = Vec::new();

        if let Some(expression) = fts::match_expression(&parsed.terms) {
            predicates.push(Predicate::Match(expression));
        }
        predicates.extend(parsed.statuses.iter().copied().map(Predicate::Status));

        match breadcrumb {
            Breadcrumb::None => {}
            Breadcrumb::Shelf(id) => predicates.push(Predicate::Shelf(id)),
            Breadcrumb::Status(status) => predicates.push(Predicate::Status(status)),
            Breadcrumb::Rating(rating) => predicates.push(Predicate::Rating(rating)),
        }

        Self {
            predicates,
            sort: parsed.sort,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    fn needs_shelf_join(&self) -> bool {
        self.predicates
            .iter()
            .any(|p| matches!(p, Predicate::Shelf(_)))
    }

    /// Render the statement and its parameters, in bind order
    pub fn to_sql(&self) -> (String, Vec<SqlParam>) {
        let mut sql = String::from(SELECT_HITS);
        let mut params = Vec::with_capacity(self.predicates.len() + 1);

        if self.needs_shelf_join() {
            sql.push_str(JOIN_SHELF);
        }

        if !self.predicates.is_empty() {
            let conditions: Vec<&str> = self.predicates.iter().map(Predicate::sql).collect();
            sql.push_str("\nWHERE ");
            sql.push_str(&conditions.join(" AND "));
            params.extend(self.predicates.iter().map(Predicate::param));
        }

        // A book on several matching shelves is listed once
        sql.push_str("\nGROUP BY b.book_id");

        if let Some(order) = order_clause(self.sort) {
            sql.push('\n');
            sql.push_str(order);
        }

        if let Some(limit) = self.limit {
            sql.push_str("\nLIMIT ?");
            params.push(SqlParam::Integer(i64::from(limit)));
        }

        (sql, params)
    }

    /// Run the statement
    pub async fn fetch(&self, pool: &SqlitePool) -> Result<Vec<SearchHit>> {
        let (sql, params) = self.to_sql();
        debug!("Library search SQL: {} with {:?}", sql, params);

        let mut query = sqlx::query_as::<_, SearchHit>(&sql);
        for param in params {
            query = match param {
                SqlParam::Text(value) => query.bind(value),
                SqlParam::Integer(value) => query.bind(value),
                SqlParam::Real(value) => query.bind(value),
            };
        }

        Ok(query.fetch_all(pool).await?)
    }
}

/// What a library search produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum SearchOutcome {
    Rows(Vec<SearchHit>),
    /// Statuses offered for an unfinished `@` fragment
    TagCompletion(Vec<StatusTag>),
    /// Nothing matched
    NoResults,
}

impl SearchOutcome {
    pub fn rows(&self) -> &[SearchHit] {
        match self {
            SearchOutcome::Rows(rows) => rows,
            _ => &[],
        }
    }
}

/// Statuses whose name contains `fragment`, ignoring case
fn complete_tag(parsed: &ParsedSearch, fragment: &str, counts: &SearchHit) -> Vec<StatusTag> {
    let needle = fragment.to_lowercase();

    ReadingStatus::ASSIGNABLE
        .into_iter()
        .filter(|status| status.label().to_lowercase().contains(&needle))
        .map(|status| StatusTag {
            status,
            label: status.label().to_string(),
            count: counts.count_for(status),
            search_string: parsed.with_status(status),
        })
        .collect()
}

/// Search the local library
pub async fn search_library(
    pool: &SqlitePool,
    input: &str,
    breadcrumb: Breadcrumb,
    limit: Option<u32>,
) -> Result<SearchOutcome> {
    let started = Instant::now();
    let parsed = grammar::parse(input);
    let plan = SearchPlan::new(&parsed, breadcrumb);

    let outcome = if let Some(fragment) = parsed.tag_fragment.as_deref() {
        // Window counts on any single row describe the whole set
        let first = plan.with_limit(Some(1)).fetch(pool).await?;
        match first.first() {
            Some(row) => SearchOutcome::TagCompletion(complete_tag(&parsed, fragment, row)),
            None => SearchOutcome::NoResults,
        }
    } else {
        let rows = plan.with_limit(limit).fetch(pool).await?;
        if rows.is_empty() {
            SearchOutcome::NoResults
        } else {
            SearchOutcome::Rows(rows)
        }
    };

    info!("Library search {:?} took {:?}", input, started.elapsed());
    Ok(outcome)
}
