use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::account::models::UserModel;
use crate::rent::models::RentModel;
use crate::shared::AppError;
use crate::transport::models::TransportModel;

/// Rows held by the in-memory store
#[derive(Debug, Default)]
pub struct Tables {
    pub users: HashMap<Uuid, UserModel>,
    pub transports: HashMap<Uuid, TransportModel>,
    pub rents: HashMap<Uuid, RentModel>,
}

impl Tables {
    /// Whether the transport is out on a rent that hasn't ended
    pub fn has_open_rent(&self, transport_id: Uuid) -> bool {
        self.rents
            .values()
            .any(|r| r.transport_id == transport_id && r.is_open())
    }
}

/// In-memory backing store for development and testing
///
/// All three tables sit behind one lock, which gives the multi-row
/// operations (opening and closing rents, cascading deletes) the same
/// all-or-nothing behaviour a database transaction gives the Postgres store.
/// Data is lost when the application restarts.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables.lock().map_err(|_| {
            error!("In-memory store lock poisoned");
            AppError::Internal
        })
    }

    /// Number of users currently stored (useful for debugging)
    pub fn user_count(&self) -> usize {
        self.lock().map(|t| t.users.len()).unwrap_or_default()
    }
}

/// PostgreSQL backing store
pub struct PostgresStore {
    pub(crate) pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and applies the embedded schema migrations
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPool::connect(database_url).await.map_err(|e| {
            error!(error = %e, "Failed to connect to database");
            AppError::DatabaseError(e.to_string())
        })?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to run database migrations");
                AppError::DatabaseError(e.to_string())
            })?;

        info!("Database connected and migrations applied");
        Ok(Self::new(pool))
    }
}

/// Maps a sqlx error, turning unique-constraint hits into a conflict
pub(crate) fn db_error(context: &str, e: sqlx::Error) -> AppError {
    let unique_violation = e
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);

    if unique_violation {
        warn!(error = %e, "{}: unique constraint violated", context);
        return AppError::Conflict("Username already exists".to_string());
    }

    warn!(error = %e, "{}", context);
    AppError::DatabaseError(e.to_string())
}
