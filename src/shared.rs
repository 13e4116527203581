use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::account::repository::UserRepository;
use crate::auth::TokenService;
use crate::rent::clock::Clock;
use crate::rent::repository::RentRepository;
use crate::transport::repository::TransportRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub transport_repository: Arc<dyn TransportRepository + Send + Sync>,
    pub rent_repository: Arc<dyn RentRepository + Send + Sync>,
    pub token_service: Arc<TokenService>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        transport_repository: Arc<dyn TransportRepository + Send + Sync>,
        rent_repository: Arc<dyn RentRepository + Send + Sync>,
        token_service: Arc<TokenService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repository,
            transport_repository,
            rent_repository,
            token_service,
            clock,
        }
    }

    /// Wires every repository to one backing store so cross-entity
    /// operations (ending a rent, deleting a user) stay consistent.
    pub fn from_store<S>(store: Arc<S>, token_service: Arc<TokenService>, clock: Arc<dyn Clock>) -> Self
    where
        S: UserRepository + TransportRepository + RentRepository + Send + Sync + 'static,
    {
        Self::new(
            store.clone(),
            store.clone(),
            store,
            token_service,
            clock,
        )
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// `?start=&count=` query parameters shared by every list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub start: u32,
    #[serde(default = "default_page_count")]
    pub count: u32,
}

fn default_page_count() -> u32 {
    10
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            start: 0,
            count: default_page_count(),
        }
    }
}

impl Pagination {
    pub fn new(start: u32, count: u32) -> Self {
        Self { start, count }
    }

    /// Rejects empty pages; `start` is unsigned so it can't go below zero.
    pub fn validated(self) -> Result<Self, AppError> {
        if self.count == 0 {
            return Err(AppError::BadRequest(
                "count must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.start)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.count)
    }

    /// Applies the page to an already ordered in-memory sequence
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.start as usize)
            .take(self.count as usize)
            .collect()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::account::models::UserModel;
    use crate::auth::{password, InMemoryTokenBlacklist, TokenConfig};
    use crate::rent::clock::{FixedClock, SystemClock};
    use crate::store::InMemoryStore;
    use chrono::{DateTime, Utc};

    /// Token config with fixed secrets so tests don't depend on the environment
    pub fn test_token_config() -> TokenConfig {
        TokenConfig::with_secrets("test-access-secret", "test-refresh-secret", 30, 7)
    }

    pub fn test_token_service() -> Arc<TokenService> {
        Arc::new(TokenService::new(
            test_token_config(),
            Arc::new(InMemoryTokenBlacklist::new()),
        ))
    }

    /// Creates a user directly in the store, bypassing the HTTP layer
    pub async fn seed_user(store: &InMemoryStore, username: &str, is_admin: bool) -> UserModel {
        let hash = password::hash_password("password").await.unwrap();
        let mut user = UserModel::new(username.to_string(), hash);
        user.is_admin = is_admin;
        UserRepository::create_user(store, &user).await.unwrap();
        user
    }

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        store: Option<Arc<InMemoryStore>>,
        clock: Option<Arc<dyn Clock>>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                store: None,
                clock: None,
            }
        }

        pub fn with_store(mut self, store: Arc<InMemoryStore>) -> Self {
            self.store = Some(store);
            self
        }

        pub fn with_fixed_time(mut self, now: DateTime<Utc>) -> Self {
            self.clock = Some(Arc::new(FixedClock::new(now)));
            self
        }

        pub fn build(self) -> AppState {
            AppState::from_store(
                self.store
                    .unwrap_or_else(|| Arc::new(InMemoryStore::new())),
                test_token_service(),
                self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            )
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
