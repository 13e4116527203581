use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for users table
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct UserModel {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String, // argon2 PHC string
    pub is_admin: bool,
    pub balance: f64, // May go negative after a long rent
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserModel {
    /// Creates a regular (non-admin) user with zero balance
    pub fn new(username: String, password_hash: String) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            is_admin: false,
            balance: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Updates the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
