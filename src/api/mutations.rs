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


//! Library mutations
//!
//! Each mutation returns the id of the row it touched. The local mirror is
//! not patched; the next rebuild picks the change up.

use crate::api::client::HardcoverClient;
use crate::api::payloads::MutationPayload;
use crate::error::{HardcoverError, Result};
use crate::storage::models::ReadingStatus;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

const INSERT_USER_BOOK: &str = r#"
mutation InsertUserBook($object: UserBookCreateInput!) {
  insert_user_book(object: $object) {
    id
    error
  }
}
"#;

const UPDATE_USER_BOOK: &str = r#"
mutation UpdateUserBook($id: Int!, $object: UserBookUpdateInput!) {
  update_user_book(id: $id, object: $object) {
    id
    error
  }
}
"#;

const DELETE_USER_BOOK: &str = r#"
mutation DeleteUserBook($id: Int!) {
  delete_user_book(id: $id) {
    id
  }
}
"#;

const INSERT_LIST_BOOK: &str = r#"
mutation InsertListBook($bookId: Int!, $listId: Int!) {
  insert_list_book(object: {book_id: $bookId, list_id: $listId}) {
    id
  }
}
"#;

const DELETE_LIST_BOOK: &str = r#"
mutation DeleteListBook($id: Int!) {
  delete_list_book(id: $id) {
    id
  }
}
"#;

/// Result of a successful mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub operation: String,
    /// Id of the affected row, when the API reports one
    pub affected_id: Option<i64>,
}

/// Which mutation a status change needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The book already has a library entry
    Update { user_book_id: i64 },
    /// The book is shelf-only or unknown; create the entry
    Insert { book_id: i64 },
}

impl StatusChange {
    /// Synthetic (negative) entry ids never exist remotely, so they insert
    pub fn for_book(book_id: i64, user_book_id: Option<i64>) -> Self {
        match user_book_id {
            Some(id) if id > 0 => StatusChange::Update { user_book_id: id },
            _ => StatusChange::Insert { book_id },
        }
    }
}

/// Rating sent to the API; `None` clears it
fn rating_value(rating: Option<f64>) -> Value {
    match rating {
        Some(r) if r > 0.0 => json!(r),
        _ => Value::Null,
    }
}

impl HardcoverClient {
    async fn mutate(&self, operation: &str, field: &str, query: &str, variables: Value) -> Result<MutationOutcome> {
        let mut data: HashMap<String, Option<MutationPayload>> =
            self.execute(operation, query, variables).await?;

        let payload = data.remove(field).flatten().unwrap_or_default();
        if let Some(message) = payload.error.filter(|m| !m.is_empty()) {
            return Err(HardcoverError::MutationRejected {
                operation: operation.to_string(),
                message,
            });
        }

        info!(operation, affected_id = ?payload.id, "Mutation applied");
        Ok(MutationOutcome {
            operation: operation.to_string(),
            affected_id: payload.id,
        })
    }

    /// Set (or with `None` / `0.0`, clear) the personal rating of a book
    pub async fn set_rating(&self, book_id: i64, rating: Option<f64>) -> Result<MutationOutcome> {
        let variables = json!({
            "object": { "book_id": book_id, "rating": rating_value(rating) }
        });
        self.mutate("set_rating", "insert_user_book", INSERT_USER_BOOK, variables)
            .await
    }

    /// Change the reading status, creating the library entry when needed
    pub async fn set_status(&self, change: StatusChange, status: ReadingStatus) -> Result<MutationOutcome> {
        if status == ReadingStatus::Unset {
            return Err(HardcoverError::invalid_input("Cannot assign an empty reading status"));
        }

        match change {
            StatusChange::Update { user_book_id } => {
                let variables = json!({
                    "id": user_book_id,
                    "object": { "status_id": status.id() }
                });
                self.mutate("set_status", "update_user_book", UPDATE_USER_BOOK, variables)
                    .await
            }
            StatusChange::Insert { book_id } => {
                let variables = json!({
                    "object": { "book_id": book_id, "status_id": status.id() }
                });
                self.mutate("set_status", "insert_user_book", INSERT_USER_BOOK, variables)
                    .await
            }
        }
    }

    pub async fn add_to_shelf(&self, book_id: i64, shelf_id: i64) -> Result<MutationOutcome> {
        let variables = json!({ "bookId": book_id, "listId": shelf_id });
        self.mutate("add_to_shelf", "insert_list_book", INSERT_LIST_BOOK, variables)
            .await
    }

    /// Remove a membership by its list_book id (see `views::find_membership`)
    pub async fn remove_from_shelf(&self, list_book_id: i64) -> Result<MutationOutcome> {
        let variables = json!({ "id": list_book_id });
        self.mutate("remove_from_shelf", "delete_list_book", DELETE_LIST_BOOK, variables)
            .await
    }

    /// Delete a library entry altogether
    pub async fn delete_user_book(&self, user_book_id: i64) -> Result<MutationOutcome> {
        if user_book_id <= 0 {
            return Err(HardcoverError::invalid_input(format!(
                "Book is not in the library (entry id {})",
                user_book_id
            )));
        }

        let variables = json!({ "id": user_book_id });
        self.mutate("delete_user_book", "delete_user_book", DELETE_USER_BOOK, variables)
            .await
    }
}
