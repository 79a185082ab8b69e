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


//! HTTP client for the Hardcover GraphQL API
//!
//! Every call is a POST of `{query, variables}` to a single endpoint with the
//! user's API token in the `Authorization` header.
//!
//! # Retry Strategy
//! - Maximum 3 attempts (1 initial + 2 retries)
//! - Exponential backoff: 1s, 2s between retries
//! - Retry on: network errors, 5xx errors
//! - No retry on: 4xx client errors, rate limiting (429), GraphQL errors

use crate::api::payloads::{GraphQlRequest, GraphQlResponse};
use crate::error::{HardcoverError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Hardcover GraphQL endpoint
pub const DEFAULT_API_URL: &str = "https://api.hardcover.app/v1/graphql";

/// Maximum retry attempts (1 initial + 2 retries = 3 total)
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Initial retry delay in seconds (exponential backoff: 1s, 2s, 4s)
const INITIAL_RETRY_DELAY_SECS: u64 = 1;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for HardcoverClient
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRY_ATTEMPTS,
            user_agent: concat!("hardcover-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for ClientConfig
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn api_url<S: Into<String>>(mut self, api_url: S) -> Self {
        self.config.api_url = api_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries.max(1);
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// GraphQL client bound to one user's API token
#[derive(Debug, Clone)]
pub struct HardcoverClient {
    client: Client,
    auth_header: HeaderValue,
    config: ClientConfig,
}

impl HardcoverClient {
    /// Create a client with default configuration
    ///
    /// # Errors
    /// Returns `MissingApiToken` for an empty token, or an error if the HTTP
    /// client cannot be built.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_config(token, ClientConfig::default())
    }

    pub fn with_config(token: &str, config: ClientConfig) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(HardcoverError::MissingApiToken);
        }

        // Tokens are shown on the account page with their "Bearer " prefix
        let auth_value = if token.starts_with("Bearer ") {
            token.to_string()
        } else {
            format!("Bearer {}", token)
        };
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| HardcoverError::InvalidInput(format!("Invalid auth token: {}", e)))?;
        auth_header.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| HardcoverError::InvalidInput(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            auth_header,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run a GraphQL document and decode its `data` member
    ///
    /// GraphQL-level errors are reported as `GraphQlError` even when the HTTP
    /// status was 200.
    pub async fn execute<T>(&self, operation: &str, query: &str, variables: Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = self.execute_raw(operation, query, variables).await?;
        decode_response(operation, &body)
    }

    /// Run a GraphQL document and return the undecoded response body
    pub async fn execute_raw(&self, operation: &str, query: &str, variables: Value) -> Result<String> {
        let started = Instant::now();
        let payload = GraphQlRequest { query, variables };
        let body = self.request_with_retry(operation, &payload).await?;

        debug!(
            operation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            "GraphQL request finished"
        );
        Ok(body)
    }

    /// Execute request with retry logic and exponential backoff
    async fn request_with_retry(&self, operation: &str, payload: &GraphQlRequest<'_>) -> Result<String> {
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.config.max_retries {
            attempts += 1;

            let request = self
                .client
                .post(&self.config.api_url)
                .header(AUTHORIZATION, self.auth_header.clone())
                .json(payload);

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    match status {
                        s if s.is_success() => {
                            return read_body(operation, response).await;
                        }

                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            let body = response.text().await.unwrap_or_default();
                            return Err(HardcoverError::AuthenticationFailed {
                                message: format!("{} ({})", body.trim(), status.as_u16()),
                            });
                        }

                        StatusCode::TOO_MANY_REQUESTS => {
                            return Err(HardcoverError::RateLimitExceeded {
                                retry_after_seconds: extract_retry_after(&response),
                                operation: operation.to_string(),
                            });
                        }

                        // 5xx Server Error - retry with backoff
                        s if s.is_server_error() && attempts < self.config.max_retries => {
                            let error_body = response.text().await.unwrap_or_default();
                            warn!(operation, status = s.as_u16(), attempt = attempts, "Server error, retrying");
                            last_error = Some(HardcoverError::api_failed(
                                format!("Server error: {}", error_body),
                                Some(s.as_u16()),
                                Some(operation.to_string()),
                            ));

                            sleep(backoff(attempts)).await;
                            continue;
                        }

                        _ => {
                            let error_body = response.text().await.unwrap_or_default();
                            return Err(HardcoverError::api_failed(
                                format!("API request failed: {}", error_body),
                                Some(status.as_u16()),
                                Some(operation.to_string()),
                            ));
                        }
                    }
                }

                // Network error - retry with backoff
                Err(e) if attempts < self.config.max_retries && is_retryable_network_error(&e) => {
                    warn!(operation, attempt = attempts, "Network error, retrying: {}", e);
                    last_error = Some(HardcoverError::network_error(
                        format!("Network request failed: {}", e),
                        true,
                    ));

                    sleep(backoff(attempts)).await;
                    continue;
                }

                Err(e) => {
                    return Err(HardcoverError::network_error(
                        format!("Network request failed: {}", e),
                        is_retryable_network_error(&e),
                    ));
                }
            }
        }

        // All retries exhausted
        Err(last_error.unwrap_or_else(|| {
            HardcoverError::api_failed(
                format!("Request failed after {} attempts", attempts),
                None,
                Some(operation.to_string()),
            )
        }))
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(INITIAL_RETRY_DELAY_SECS * 2_u64.pow(attempt.saturating_sub(1)))
}

fn is_retryable_network_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Extract retry-after delay from response headers (in seconds)
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(60)
}

async fn read_body(operation: &str, response: Response) -> Result<String> {
    let status = response.status();
    response.text().await.map_err(|e| HardcoverError::ApiRequestFailed {
        message: format!("Failed to read response body: {}", e),
        status_code: Some(status.as_u16()),
        operation: Some(operation.to_string()),
    })
}

/// Decode a GraphQL response body into its `data` member
pub fn decode_response<T>(operation: &str, body: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let envelope: GraphQlResponse<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            // Keep 400 chars on each side of the failure for debugging
            let error_col = e.column();
            let mut start = error_col.saturating_sub(400).min(body.len());
            let mut end = (error_col + 400).min(body.len());
            while !body.is_char_boundary(start) {
                start -= 1;
            }
            while !body.is_char_boundary(end) {
                end += 1;
            }

            return Err(HardcoverError::InvalidApiResponse {
                message: format!(
                    "{}: parse error: {} at col {}. Context: ...{}...",
                    operation,
                    e,
                    error_col,
                    &body[start..end]
                ),
                response_body: Some(body.to_string()),
            });
        }
    };

    if !envelope.errors.is_empty() {
        let message = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(HardcoverError::GraphQlError {
            operation: operation.to_string(),
            message,
        });
    }

    envelope.data.ok_or_else(|| HardcoverError::InvalidApiResponse {
        message: format!("{}: response has no data", operation),
        response_body: Some(body.to_string()),
    })
}

// ===== TESTS =====

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::payloads::LibraryData;

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::builder()
            .api_url("http://localhost:8080/graphql")
            .timeout(Duration::from_secs(60))
            .max_retries(5)
            .user_agent("TestAgent/1.0")
            .build();

        assert_eq!(config.api_url, "http://localhost:8080/graphql");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.user_agent, "TestAgent/1.0");
    }

    #[test]
    fn test_client_creation_requires_token() {
        let result = HardcoverClient::new("   ");
        assert!(matches!(result, Err(HardcoverError::MissingApiToken)));
        assert!(HardcoverClient::new("Bearer abc.def").is_ok());
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_decode_response_reports_graphql_errors() {
        let body = r#"{"data": null, "errors": [{"message": "field 'lists' not found"}]}"#;
        let result: Result<LibraryData> = decode_response("library", body);

        match result {
            Err(HardcoverError::GraphQlError { operation, message }) => {
                assert_eq!(operation, "library");
                assert!(message.contains("lists"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_response_reports_malformed_json() {
        let result: Result<LibraryData> = decode_response("library", "{\"data\": {\"user_books\": [");
        assert!(matches!(result, Err(HardcoverError::InvalidApiResponse { .. })));
    }

    #[test]
    fn test_decode_response_returns_data() {
        let body = r#"{"data": {"user_books": []}}"#;
        let data: LibraryData = decode_response("library", body).expect("Failed to decode");
        assert!(data.user_books.is_empty());
    }
}
