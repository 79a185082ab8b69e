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


//! Error types for the Hardcover mirror
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are categorized by domain (API, download, storage, etc.) so callers can
//! decide what is fatal for a rebuild and what is only worth a log line.
//!
//! ## Failure classes
//!
//! - Transport or decode failure of a top-level payload → `ApiRequestFailed`,
//!   `NetworkError`, `InvalidApiResponse`, `GraphQlError`. Aborts a rebuild.
//! - Single-row insert failure → `SqlxError`. Logged and skipped by the reconciler.
//! - Unparseable breadcrumb context → `InvalidContext`. The predicate is dropped.
//! - Cover download failure → `DownloadFailed`. Logged, never propagated.
//! - Store open failure → `SqlxError` / `FileIoError`. Fatal.

use thiserror::Error;

/// Result type alias using our HardcoverError type
pub type Result<T> = std::result::Result<T, HardcoverError>;

/// Main error type for the Hardcover mirror
#[derive(Error, Debug)]
pub enum HardcoverError {
    // ===== API Errors =====

    /// No API token was configured
    #[error("Authorization token is empty. Set HARDCOVER_API_TOKEN.")]
    MissingApiToken,

    /// The API rejected the token
    #[error("API authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Generic API request failure
    #[error("API request failed: {message}")]
    ApiRequestFailed {
        message: String,
        /// HTTP status code if available
        status_code: Option<u16>,
        /// Operation name of the GraphQL document
        operation: Option<String>,
    },

    /// API returned invalid or unexpected response format
    #[error("Invalid API response: {message}")]
    InvalidApiResponse {
        message: String,
        /// Response body snippet for debugging
        response_body: Option<String>,
    },

    /// The GraphQL endpoint answered 200 but reported errors
    #[error("GraphQL error in {operation}: {message}")]
    GraphQlError { operation: String, message: String },

    /// API rate limiting (HTTP 429)
    #[error("API rate limit exceeded. Retry after {retry_after_seconds} seconds")]
    RateLimitExceeded {
        retry_after_seconds: u64,
        operation: String,
    },

    /// A mutation came back with an `error` field set
    #[error("Mutation {operation} rejected: {message}")]
    MutationRejected { operation: String, message: String },

    /// Network connectivity error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        /// Whether this error might be transient
        is_transient: bool,
    },

    // ===== Download Errors =====

    /// Cover download failure
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// Cover URL could not be turned into a file name
    #[error("Invalid download URL: {0}")]
    InvalidDownloadUrl(String),

    // ===== File/Storage Errors =====

    /// File or directory not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Generic file I/O error
    #[error("File I/O error: {0}")]
    FileIoError(String),

    // ===== Database Errors =====

    /// Generic database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Schema creation failed
    #[error("Schema creation failed: {0}")]
    SchemaFailed(String),

    /// Database record not found
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    // ===== Input/Configuration Errors =====

    /// Generic input validation error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A breadcrumb context variable could not be parsed
    #[error("Invalid context variable {name}: {value:?}")]
    InvalidContext { name: String, value: String },

    /// Configuration is invalid or incomplete
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Application state is invalid for the requested operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // ===== General Errors =====

    /// Internal error that should not normally occur
    #[error("Internal error: {0}")]
    InternalError(String),

    // ===== External Library Errors =====

    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Database driver error from sqlx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Timestamp parse error
    #[error("Timestamp parse error: {0}")]
    TimestampError(#[from] chrono::ParseError),
}

impl From<std::num::ParseIntError> for HardcoverError {
    fn from(err: std::num::ParseIntError) -> Self {
        HardcoverError::InvalidInput(format!("Failed to parse integer: {}", err))
    }
}

impl From<std::num::ParseFloatError> for HardcoverError {
    fn from(err: std::num::ParseFloatError) -> Self {
        HardcoverError::InvalidInput(format!("Failed to parse float: {}", err))
    }
}

impl From<tokio::task::JoinError> for HardcoverError {
    fn from(err: tokio::task::JoinError) -> Self {
        HardcoverError::InternalError(format!("Task join failed: {}", err))
    }
}

// Helper methods for creating common errors
impl HardcoverError {
    /// Create a RecordNotFound error with a resource name
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        HardcoverError::RecordNotFound(resource.into())
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        HardcoverError::InvalidInput(message.into())
    }

    /// Create an InternalError with a message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        HardcoverError::InternalError(message.into())
    }

    /// Create an InvalidContext error for a breadcrumb variable
    pub fn invalid_context<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        HardcoverError::InvalidContext {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create an ApiRequestFailed error
    pub fn api_failed<S: Into<String>>(
        message: S,
        status_code: Option<u16>,
        operation: Option<String>,
    ) -> Self {
        HardcoverError::ApiRequestFailed {
            message: message.into(),
            status_code,
            operation,
        }
    }

    /// Create a NetworkError
    pub fn network_error<S: Into<String>>(message: S, is_transient: bool) -> Self {
        HardcoverError::NetworkError {
            message: message.into(),
            is_transient,
        }
    }

    /// Check if error is retryable (network errors, 5xx, rate limits)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HardcoverError::NetworkError { is_transient: true, .. }
                | HardcoverError::ApiRequestFailed { status_code: Some(500..=599), .. }
                | HardcoverError::RateLimitExceeded { .. }
        )
    }

    /// Check if error is due to authentication/authorization
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            HardcoverError::MissingApiToken
                | HardcoverError::AuthenticationFailed { .. }
                | HardcoverError::ApiRequestFailed { status_code: Some(401 | 403), .. }
        )
    }

    /// Check if this error must abort a rebuild before the store is touched
    ///
    /// Only transport and decode failures of the top-level payloads qualify.
    /// Row-level database errors are handled by the reconciler itself.
    pub fn aborts_rebuild(&self) -> bool {
        matches!(
            self,
            HardcoverError::MissingApiToken
                | HardcoverError::AuthenticationFailed { .. }
                | HardcoverError::ApiRequestFailed { .. }
                | HardcoverError::InvalidApiResponse { .. }
                | HardcoverError::GraphQlError { .. }
                | HardcoverError::RateLimitExceeded { .. }
                | HardcoverError::NetworkError { .. }
                | HardcoverError::ReqwestError(_)
                | HardcoverError::SerdeJsonError(_)
        )
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            HardcoverError::MissingApiToken => {
                "No Hardcover API token configured. Copy it from hardcover.app/account/api and set HARDCOVER_API_TOKEN.".to_string()
            }
            HardcoverError::AuthenticationFailed { message } => {
                format!("Hardcover rejected the API token: {}. Please check it and try again.", message)
            }
            HardcoverError::RateLimitExceeded { retry_after_seconds, .. } => {
                format!(
                    "Hardcover rate limit exceeded. Please wait {} seconds before trying again.",
                    retry_after_seconds
                )
            }
            HardcoverError::NetworkError { .. } | HardcoverError::ReqwestError(_) => {
                "Could not reach Hardcover. The local library is unchanged.".to_string()
            }
            HardcoverError::InvalidApiResponse { .. } | HardcoverError::SerdeJsonError(_) => {
                "Hardcover sent a response that could not be read. The local library is unchanged.".to_string()
            }
            HardcoverError::SqlxError(e) => {
                format!("Local library database error: {}", e)
            }
            _ => self.to_string(),
        }
    }
}
