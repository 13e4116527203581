use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::account::{models::UserModel, repository::UserRepository, UserResponse};
use crate::shared::AppError;

/// Amount credited by a single top-up
pub const TOP_UP_AMOUNT: f64 = 250_000.0;

pub struct PaymentService {
    user_repository: Arc<dyn UserRepository + Send + Sync>,
}

impl PaymentService {
    pub fn new(user_repository: Arc<dyn UserRepository + Send + Sync>) -> Self {
        Self { user_repository }
    }

    /// Credits the target's balance. Admins may top up anyone, users only themselves.
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn top_up(&self, caller: &UserModel, user_id: Uuid) -> Result<UserResponse, AppError> {
        if !caller.is_admin && caller.id != user_id {
            warn!(target_id = %user_id, "Top-up for another user refused");
            return Err(AppError::Forbidden(
                "You can only top up your own balance".to_string(),
            ));
        }

        let user = self
            .user_repository
            .adjust_balance(user_id, TOP_UP_AMOUNT)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        info!(target_id = %user_id, balance = user.balance, "Balance topped up");
        Ok(user.into())
    }
}
