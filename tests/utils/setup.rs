use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use simbirgo::{
    auth::{InMemoryTokenBlacklist, TokenConfig, TokenService},
    build_router, AppState, FixedClock, InMemoryStore,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<FixedClock>,
}

pub struct TestSetupBuilder {
    start_time: DateTime<Utc>,
    access_ttl_minutes: i64,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            start_time: Utc
                .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
                .single()
                .unwrap(),
            access_ttl_minutes: 30,
        }
    }

    /// A negative TTL issues access tokens that are already expired
    pub fn with_access_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_ttl_minutes = minutes;
        self
    }

    pub fn build(self) -> TestSetup {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::new(self.start_time));
        let token_service = Arc::new(TokenService::new(
            TokenConfig::with_secrets(
                "integration-access-secret",
                "integration-refresh-secret",
                self.access_ttl_minutes,
                7,
            ),
            Arc::new(InMemoryTokenBlacklist::new()),
        ));

        let state = AppState::from_store(store.clone(), token_service, clock.clone());
        let app = build_router(state.clone(), &[]);

        TestSetup {
            app,
            state,
            store,
            clock,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
