use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    models::UserModel,
    repository::UserRepository,
    types::{
        AdminCreateUserRequest, AdminUpdateUserRequest, CredentialsRequest, UpdateAccountRequest,
        UserResponse,
    },
};
use crate::auth::{password, TokenClaims, TokenPair, TokenService};
use crate::config::AdminCredentials;
use crate::shared::{AppError, Pagination};

/// Service for account registration, sign-in and user management
pub struct AccountService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    token_service: Arc<TokenService>,
}

impl AccountService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        token_service: Arc<TokenService>,
    ) -> Self {
        Self {
            repository,
            token_service,
        }
    }

    /// Registers a regular user and signs them in
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn sign_up(&self, request: CredentialsRequest) -> Result<TokenPair, AppError> {
        let username = validate_username(&request.username)?;
        validate_password(&request.password)?;

        let user = UserModel::new(username, password::hash_password(&request.password).await?);
        self.repository.create_user(&user).await?;

        info!(user_id = %user.id, "User signed up");
        self.token_service.issue_pair(user.id)
    }

    /// Unknown user and wrong password are reported identically
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn sign_in(&self, request: CredentialsRequest) -> Result<TokenPair, AppError> {
        let user = self
            .repository
            .get_user_by_username(request.username.trim())
            .await?;

        let verified = match &user {
            Some(user) => password::verify_password(&request.password, &user.password_hash).await?,
            None => false,
        };

        let user = match user {
            Some(user) if verified => user,
            _ => {
                warn!("Sign-in rejected");
                return Err(AppError::Forbidden(
                    "Invalid username or password".to_string(),
                ));
            }
        };

        info!(user_id = %user.id, "User signed in");
        self.token_service.issue_pair(user.id)
    }

    /// Exchanges a refresh token for a new pair, revoking the old one
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.token_service.validate_refresh(refresh_token).await?;

        if self.repository.get_user(claims.user_id()).await?.is_none() {
            warn!(user_id = %claims.sub, "Refresh token refers to a deleted user");
            return Err(AppError::Unauthorized("Not authenticated".to_string()));
        }

        // Only the caller that revokes the token gets a new pair
        if !self.token_service.revoke(&claims).await {
            warn!(user_id = %claims.sub, "Refresh token already used");
            return Err(AppError::Unauthorized("Token has been revoked".to_string()));
        }
        debug!(user_id = %claims.sub, "Refresh token rotated");

        self.token_service.issue_pair(claims.user_id())
    }

    #[instrument(skip(self, claims), fields(user_id = %claims.sub))]
    pub async fn sign_out(&self, claims: &TokenClaims) {
        self.token_service.revoke(claims).await;
        info!("User signed out");
    }

    /// Applies a self-service update; only username and password may change
    #[instrument(skip(self, user, request), fields(user_id = %user.id))]
    pub async fn update_account(
        &self,
        mut user: UserModel,
        request: UpdateAccountRequest,
    ) -> Result<UserResponse, AppError> {
        if let Some(username) = request.username {
            user.username = validate_username(&username)?;
        }
        if let Some(new_password) = request.password {
            validate_password(&new_password)?;
            user.password_hash = password::hash_password(&new_password).await?;
        }

        user.touch();
        let stored = self.repository.update_user(&user).await?;

        info!("Account updated");
        Ok(stored.into())
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, page: Pagination) -> Result<Vec<UserResponse>, AppError> {
        let users = self.repository.list_users(page.validated()?).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, AppError> {
        Ok(self.find_user(user_id).await?.into())
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(
        &self,
        request: AdminCreateUserRequest,
    ) -> Result<UserResponse, AppError> {
        let username = validate_username(&request.username)?;
        validate_password(&request.password)?;
        validate_balance(request.balance)?;

        let mut user = UserModel::new(username, password::hash_password(&request.password).await?);
        user.is_admin = request.is_admin;
        user.balance = request.balance;
        self.repository.create_user(&user).await?;

        info!(user_id = %user.id, is_admin = user.is_admin, "User created by admin");
        Ok(user.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: AdminUpdateUserRequest,
    ) -> Result<UserResponse, AppError> {
        let mut user = self.find_user(user_id).await?;

        if let Some(username) = request.username {
            user.username = validate_username(&username)?;
        }
        if let Some(new_password) = request.password {
            validate_password(&new_password)?;
            user.password_hash = password::hash_password(&new_password).await?;
        }
        if let Some(is_admin) = request.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(balance) = request.balance {
            validate_balance(balance)?;
        }

        user.touch();
        let mut stored = self.repository.update_user(&user).await?;
        if let Some(balance) = request.balance {
            stored = self
                .repository
                .set_balance(user_id, balance)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        }

        info!(user_id = %user_id, "User updated by admin");
        Ok(stored.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AppError> {
        if !self.repository.delete_user(user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        info!(user_id = %user_id, "User deleted by admin");
        Ok(())
    }

    /// Creates the configured admin account on startup, or promotes an existing
    /// user of that name
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn ensure_admin(&self, credentials: &AdminCredentials) -> Result<(), AppError> {
        match self
            .repository
            .get_user_by_username(&credentials.username)
            .await?
        {
            Some(user) if user.is_admin => {
                debug!(user_id = %user.id, "Bootstrap admin already present");
            }
            Some(mut user) => {
                user.is_admin = true;
                user.touch();
                self.repository.update_user(&user).await?;
                info!(user_id = %user.id, "Existing user promoted to admin");
            }
            None => {
                let mut user = UserModel::new(
                    validate_username(&credentials.username)?,
                    password::hash_password(&credentials.password).await?,
                );
                user.is_admin = true;
                self.repository.create_user(&user).await?;
                info!(user_id = %user.id, "Bootstrap admin created");
            }
        }
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<UserModel, AppError> {
        self.repository
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

fn validate_username(username: &str) -> Result<String, AppError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("Username must not be empty".to_string()));
    }
    Ok(username.to_string())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::BadRequest("Password must not be empty".to_string()));
    }
    Ok(())
}

fn validate_balance(balance: f64) -> Result<(), AppError> {
    if !balance.is_finite() {
        return Err(AppError::BadRequest("Balance must be a number".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{seed_user, test_token_service};
    use crate::store::InMemoryStore;

    fn credentials(username: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn create_service() -> (AccountService, Arc<InMemoryStore>, Arc<TokenService>) {
        let store = Arc::new(InMemoryStore::new());
        let tokens = test_token_service();
        (AccountService::new(store.clone(), tokens.clone()), store, tokens)
    }

    #[tokio::test]
    async fn test_sign_up_creates_regular_user() {
        let (service, store, tokens) = create_service();

        let pair = service.sign_up(credentials("  alice ", "secret")).await.unwrap();
        let claims = tokens.validate_access(&pair.access_token).await.unwrap();

        let user = store.get_user(claims.user_id()).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "secret");
    }

    #[tokio::test]
    async fn test_sign_up_rejects_blank_username() {
        let (service, _, _) = create_service();

        let result = service.sign_up(credentials("   ", "secret")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_conflicts() {
        let (service, _, _) = create_service();
        service.sign_up(credentials("alice", "secret")).await.unwrap();

        let result = service.sign_up(credentials("alice", "other")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password_forbidden() {
        let (service, _, _) = create_service();
        service.sign_up(credentials("alice", "secret")).await.unwrap();

        let wrong = service.sign_in(credentials("alice", "nope")).await;
        assert!(matches!(wrong, Err(AppError::Forbidden(_))));

        let unknown = service.sign_in(credentials("bob", "secret")).await;
        assert!(matches!(unknown, Err(AppError::Forbidden(_))));

        assert!(service.sign_in(credentials("alice", "secret")).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let (service, _, _) = create_service();
        let pair = service.sign_up(credentials("alice", "secret")).await.unwrap();

        let rotated = service.refresh(&pair.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);

        let reused = service.refresh(&pair.refresh_token).await;
        assert!(matches!(reused, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_rotate_once() {
        let (service, _, _) = create_service();
        let pair = service.sign_up(credentials("alice", "secret")).await.unwrap();

        let (first, second) = tokio::join!(
            service.refresh(&pair.refresh_token),
            service.refresh(&pair.refresh_token)
        );

        let succeeded = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!([first, second]
            .into_iter()
            .any(|r| matches!(r, Err(AppError::Unauthorized(_)))));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let (service, _, _) = create_service();
        let pair = service.sign_up(credentials("alice", "secret")).await.unwrap();

        let result = service.refresh(&pair.access_token).await;
        assert!(matches!(result, Err(AppError::JwtError(_))));
    }

    #[tokio::test]
    async fn test_update_account_changes_password() {
        let (service, store, _) = create_service();
        let user = seed_user(&store, "alice", false).await;

        let request = UpdateAccountRequest {
            username: Some("alice2".to_string()),
            password: Some("new-password".to_string()),
        };
        let response = service.update_account(user, request).await.unwrap();
        assert_eq!(response.username, "alice2");

        assert!(service
            .sign_in(credentials("alice2", "new-password"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_update_account_keeps_charge_made_after_load() {
        let (service, store, _) = create_service();
        // Loaded at the start of the request, before the charge lands
        let snapshot = seed_user(&store, "alice", false).await;
        store.adjust_balance(snapshot.id, -0.25).await.unwrap();

        let request = UpdateAccountRequest {
            username: Some("alice2".to_string()),
            password: None,
        };
        let response = service.update_account(snapshot.clone(), request).await.unwrap();
        assert_eq!(response.balance, -0.25);

        let stored = store.get_user(snapshot.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "alice2");
        assert_eq!(stored.balance, -0.25);
    }

    #[tokio::test]
    async fn test_admin_update_without_balance_keeps_top_up() {
        let (service, store, _) = create_service();
        let user = seed_user(&store, "alice", false).await;
        store.adjust_balance(user.id, 250_000.0).await.unwrap();

        let request = AdminUpdateUserRequest {
            username: Some("renamed".to_string()),
            ..Default::default()
        };
        let updated = service.update_user(user.id, request).await.unwrap();
        assert_eq!(updated.balance, 250_000.0);
    }

    #[tokio::test]
    async fn test_admin_update_and_delete() {
        let (service, store, _) = create_service();
        let user = seed_user(&store, "alice", false).await;

        let request = AdminUpdateUserRequest {
            is_admin: Some(true),
            balance: Some(99.5),
            ..Default::default()
        };
        let updated = service.update_user(user.id, request).await.unwrap();
        assert!(updated.is_admin);
        assert_eq!(updated.balance, 99.5);
        assert_eq!(updated.username, "alice");

        service.delete_user(user.id).await.unwrap();
        let again = service.delete_user(user.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_users_rejects_zero_count() {
        let (service, _, _) = create_service();

        let result = service.list_users(Pagination::new(0, 0)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_creates_then_promotes() {
        let (service, store, _) = create_service();
        let credentials = AdminCredentials {
            username: "root".to_string(),
            password: "toor".to_string(),
        };

        service.ensure_admin(&credentials).await.unwrap();
        service.ensure_admin(&credentials).await.unwrap();
        let admin = store.get_user_by_username("root").await.unwrap().unwrap();
        assert!(admin.is_admin);
        assert_eq!(store.user_count(), 1);

        let plain = seed_user(&store, "plain", false).await;
        let promote = AdminCredentials {
            username: plain.username.clone(),
            password: "ignored".to_string(),
        };
        service.ensure_admin(&promote).await.unwrap();
        assert!(store.get_user(plain.id).await.unwrap().unwrap().is_admin);
    }
}
