use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::types::{TokenClaims, TokenKind};
use crate::config::{env_i64, env_string};
use crate::shared::AppError;

/// Signing secrets and lifetimes for both token kinds
#[derive(Clone)]
pub struct TokenConfig {
    access_secret: String,
    refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Reads secrets and lifetimes from the environment
    pub fn from_env() -> Self {
        let access_secret = env_string("JWT_ACCESS_SECRET")
            .unwrap_or_else(|| "access-secret-change-in-production".to_string());
        let refresh_secret = env_string("JWT_REFRESH_SECRET")
            .unwrap_or_else(|| "refresh-secret-change-in-production".to_string());

        Self::with_secrets(
            &access_secret,
            &refresh_secret,
            env_i64("ACCESS_TOKEN_TTL_MINUTES", 30),
            env_i64("REFRESH_TOKEN_TTL_DAYS", 7),
        )
    }

    pub fn with_secrets(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl_minutes: i64,
        refresh_ttl_days: i64,
    ) -> Self {
        Self {
            access_secret: access_secret.to_string(),
            refresh_secret: refresh_secret.to_string(),
            access_ttl: Duration::minutes(access_ttl_minutes),
            refresh_ttl: Duration::days(refresh_ttl_days),
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.access_secret.as_bytes(),
            TokenKind::Refresh => self.refresh_secret.as_bytes(),
        }
    }

    /// Signs a fresh token of the given kind for a user
    #[instrument(skip(self))]
    pub fn create_token(&self, kind: TokenKind, user_id: Uuid) -> Result<(String, TokenClaims), AppError> {
        let now = Utc::now();
        let exp = (now + self.ttl(kind)).timestamp().max(0) as usize;

        let claims = TokenClaims {
            sub: user_id,
            kind,
            jti: Uuid::new_v4(),
            exp,
            iat: now.timestamp() as usize,
        };

        debug!(?kind, exp_timestamp = exp, "Creating JWT token");

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret(kind)),
        )
        .map_err(|e| {
            warn!(error = %e, "Failed to encode JWT token");
            AppError::Internal
        })?;

        Ok((token, claims))
    }

    /// Checks signature, expiry and kind; says nothing about revocation
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, kind: TokenKind, token: &str) -> Result<TokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret(kind)),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            AppError::JwtError(e.to_string())
        })?;

        if claims.kind != kind {
            debug!(expected = ?kind, actual = ?claims.kind, "JWT token kind mismatch");
            return Err(AppError::JwtError("Wrong token kind".to_string()));
        }

        debug!(user_id = %claims.sub, jti = %claims.jti, "JWT token decoded successfully");
        Ok(claims)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
