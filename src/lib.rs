// Library crate for the simbirgo rental server
// This file exposes the public API for the binary and integration tests

pub mod account;
pub mod auth;
pub mod config;
pub mod health;
pub mod payment;
pub mod rent;
pub mod routes;
pub mod shared;
pub mod store;
pub mod transport;

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use rent::clock::{Clock, FixedClock, SystemClock};
pub use routes::build_router;
pub use shared::{AppError, AppState};
pub use store::{InMemoryStore, PostgresStore};
