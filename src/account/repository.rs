use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::UserModel;
use crate::shared::{AppError, Pagination};
use crate::store::{db_error, InMemoryStore, PostgresStore};

const USER_COLUMNS: &str =
    "id, username, password_hash, is_admin, balance, created_at, updated_at";

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository {
    /// Fails with `Conflict` when the username is taken
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError>;
    async fn list_users(&self, page: Pagination) -> Result<Vec<UserModel>, AppError>;

    /// Writes username, password hash and admin flag, returning the stored row.
    /// The balance is left alone; it only moves through the balance methods.
    async fn update_user(&self, user: &UserModel) -> Result<UserModel, AppError>;

    /// Overwrites the balance and returns the updated user
    async fn set_balance(&self, user_id: Uuid, balance: f64)
        -> Result<Option<UserModel>, AppError>;

    /// Atomically adds `delta` to the balance and returns the updated user
    async fn adjust_balance(&self, user_id: Uuid, delta: f64)
        -> Result<Option<UserModel>, AppError>;

    /// Removes the user with their transports and rents.
    /// Transports they were renting become available again.
    async fn delete_user(&self, user_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
impl UserRepository for InMemoryStore {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, username = %user.username, "Creating user in memory");

        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.username == user.username) {
            warn!(username = %user.username, "Username already taken");
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        tables.users.insert(user.id, user.clone());

        debug!(user_id = %user.id, "User created successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError> {
        let tables = self.lock()?;
        let user = tables.users.get(&user_id).cloned();

        if user.is_none() {
            debug!(user_id = %user_id, "User not found in memory");
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    #[instrument(skip(self))]
    async fn list_users(&self, page: Pagination) -> Result<Vec<UserModel>, AppError> {
        let tables = self.lock()?;
        let mut users: Vec<UserModel> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(page.apply(users))
    }

    #[instrument(skip(self, user))]
    async fn update_user(&self, user: &UserModel) -> Result<UserModel, AppError> {
        debug!(user_id = %user.id, "Updating user in memory");

        let mut tables = self.lock()?;
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            warn!(username = %user.username, "Username already taken");
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        let Some(stored) = tables.users.get_mut(&user.id) else {
            warn!(user_id = %user.id, "User not found for update in memory");
            return Err(AppError::NotFound("User not found".to_string()));
        };

        stored.username = user.username.clone();
        stored.password_hash = user.password_hash.clone();
        stored.is_admin = user.is_admin;
        stored.updated_at = user.updated_at;

        Ok(stored.clone())
    }

    #[instrument(skip(self))]
    async fn set_balance(
        &self,
        user_id: Uuid,
        balance: f64,
    ) -> Result<Option<UserModel>, AppError> {
        let mut tables = self.lock()?;
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(None);
        };

        user.balance = balance;
        user.updated_at = Utc::now();

        info!(user_id = %user_id, balance, "Balance set");
        Ok(Some(user.clone()))
    }

    #[instrument(skip(self))]
    async fn adjust_balance(
        &self,
        user_id: Uuid,
        delta: f64,
    ) -> Result<Option<UserModel>, AppError> {
        let mut tables = self.lock()?;
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(None);
        };

        user.balance += delta;
        user.updated_at = Utc::now();

        info!(user_id = %user_id, delta, balance = user.balance, "Balance adjusted");
        Ok(Some(user.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        if tables.users.remove(&user_id).is_none() {
            debug!(user_id = %user_id, "User not found for deletion in memory");
            return Ok(false);
        }

        // Release whatever the user was still riding
        let held: Vec<Uuid> = tables
            .rents
            .values()
            .filter(|r| r.user_id == user_id && r.is_open())
            .map(|r| r.transport_id)
            .collect();
        for transport_id in held {
            if let Some(transport) = tables.transports.get_mut(&transport_id) {
                transport.can_be_rented = true;
            }
        }

        tables.transports.retain(|_, t| t.owner_id != user_id);
        let surviving: HashSet<Uuid> = tables.transports.keys().copied().collect();
        let rents_before = tables.rents.len();
        tables
            .rents
            .retain(|_, r| r.user_id != user_id && surviving.contains(&r.transport_id));

        info!(
            user_id = %user_id,
            rents_removed = rents_before - tables.rents.len(),
            "User deleted from memory"
        );
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, username = %user.username, "Creating user in database");

        sqlx::query(
            "INSERT INTO users (id, username, password_hash, is_admin, balance, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.balance)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create user in database", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError> {
        sqlx::query_as::<_, UserModel>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch user from database", e))
    }

    #[instrument(skip(self))]
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch user by username", e))
    }

    #[instrument(skip(self))]
    async fn list_users(&self, page: Pagination) -> Result<Vec<UserModel>, AppError> {
        sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id OFFSET $1 LIMIT $2"
        ))
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list users", e))
    }

    #[instrument(skip(self, user))]
    async fn update_user(&self, user: &UserModel) -> Result<UserModel, AppError> {
        let updated = sqlx::query_as::<_, UserModel>(&format!(
            "UPDATE users SET username = $2, password_hash = $3, is_admin = $4, updated_at = $5 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update user in database", e))?;

        updated.ok_or_else(|| {
            warn!(user_id = %user.id, "User not found for update");
            AppError::NotFound("User not found".to_string())
        })
    }

    #[instrument(skip(self))]
    async fn set_balance(
        &self,
        user_id: Uuid,
        balance: f64,
    ) -> Result<Option<UserModel>, AppError> {
        sqlx::query_as::<_, UserModel>(&format!(
            "UPDATE users SET balance = $2, updated_at = now() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(balance)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to set balance", e))
    }

    #[instrument(skip(self))]
    async fn adjust_balance(
        &self,
        user_id: Uuid,
        delta: f64,
    ) -> Result<Option<UserModel>, AppError> {
        let user = sqlx::query_as::<_, UserModel>(&format!(
            "UPDATE users SET balance = balance + $2, updated_at = now() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to adjust balance", e))?;

        if let Some(user) = &user {
            info!(user_id = %user_id, delta, balance = user.balance, "Balance adjusted");
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: Uuid) -> Result<bool, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        sqlx::query(
            "UPDATE transports SET can_be_rented = TRUE, updated_at = now() WHERE id IN \
             (SELECT transport_id FROM rents WHERE user_id = $1 AND time_end IS NULL)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to release held transports", e))?;

        // Transports and rents go with the row via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to delete user", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit user deletion", e))?;

        Ok(result.rows_affected() > 0)
    }
}
