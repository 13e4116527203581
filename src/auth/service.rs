use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    blacklist::TokenBlacklist,
    token::TokenConfig,
    types::{TokenClaims, TokenKind, TokenPair},
};
use crate::shared::AppError;

/// Issues, validates and revokes access/refresh tokens
pub struct TokenService {
    config: TokenConfig,
    blacklist: Arc<dyn TokenBlacklist>,
}

impl TokenService {
    pub fn new(config: TokenConfig, blacklist: Arc<dyn TokenBlacklist>) -> Self {
        Self { config, blacklist }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Issues a new access/refresh pair for a user
    #[instrument(skip(self))]
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        let (access_token, _) = self.config.create_token(TokenKind::Access, user_id)?;
        let (refresh_token, _) = self.config.create_token(TokenKind::Refresh, user_id)?;

        info!(user_id = %user_id, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Validates an access token, rejecting revoked ones
    #[instrument(skip(self, token))]
    pub async fn validate_access(&self, token: &str) -> Result<TokenClaims, AppError> {
        self.validate(TokenKind::Access, token).await
    }

    /// Validates a refresh token, rejecting revoked ones
    #[instrument(skip(self, token))]
    pub async fn validate_refresh(&self, token: &str) -> Result<TokenClaims, AppError> {
        self.validate(TokenKind::Refresh, token).await
    }

    async fn validate(&self, kind: TokenKind, token: &str) -> Result<TokenClaims, AppError> {
        let claims = self.config.validate_token(kind, token)?;

        if self.blacklist.is_revoked(&claims.jti).await {
            warn!(
                user_id = %claims.sub,
                jti = %claims.jti,
                "Rejected revoked token"
            );
            return Err(AppError::Unauthorized("Token has been revoked".to_string()));
        }

        Ok(claims)
    }

    /// Blacklists a token until it expires; `false` if it was already revoked
    #[instrument(skip(self, claims), fields(user_id = %claims.sub, jti = %claims.jti))]
    pub async fn revoke(&self, claims: &TokenClaims) -> bool {
        let fresh = self.blacklist.revoke(claims.jti, claims.expires_at()).await;
        if fresh {
            info!("Token revoked");
        } else {
            warn!("Token was already revoked");
        }
        fresh
    }

    /// Drops blacklist entries for tokens that have expired
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> usize {
        let removed = self.blacklist.purge_expired(Utc::now()).await;
        let remaining = self.blacklist.len().await;
        info!(
            removed_entries = removed,
            remaining_entries = remaining,
            "Purged expired blacklist entries"
        );
        removed
    }
}
