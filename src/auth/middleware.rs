use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use crate::account::models::UserModel;
use crate::shared::{AppError, AppState};

/// Authenticated user, inserted into request extensions by [`require_user`]
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserModel);

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Pulls the access token from the Authorization header, falling back to the cookie
pub fn extract_access_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| cookie_value(headers, ACCESS_TOKEN_COOKIE))
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// JWT authentication middleware - validates the access token, loads the user and
/// adds both `TokenClaims` and `CurrentUser` to the request.
/// Usage: .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_user))
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_access_token(req.headers()).ok_or_else(|| {
        debug!("Request carries no access token");
        AppError::Unauthorized("Not authenticated".to_string())
    })?;

    let claims = match state.token_service.validate_access(token).await {
        Ok(claims) => claims,
        Err(e) => {
            warn!("JWT authentication failed: {}", e);
            return Err(e);
        }
    };

    // Token may outlive its user
    let user = state
        .user_repository
        .get_user(claims.user_id())
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "Token refers to a deleted user");
            AppError::Unauthorized("Not authenticated".to_string())
        })?;

    debug!(user_id = %user.id, username = %user.username, "Authentication successful");

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Admin gate; must run after [`require_user`]
#[instrument(skip(req, next), fields(uri = %req.uri()))]
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let caller = req
        .extensions()
        .get::<CurrentUser>()
        .map(|CurrentUser(user)| (user.id, user.is_admin));

    match caller {
        None => Err(AppError::Unauthorized("Not authenticated".to_string())),
        Some((user_id, false)) => {
            warn!(user_id = %user_id, "Non-admin user attempted admin route");
            Err(AppError::Forbidden("Admin rights required".to_string()))
        }
        Some((_, true)) => Ok(next.run(req).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));

        assert_eq!(extract_access_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_non_bearer_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));

        assert_eq!(extract_access_token(&headers), None);
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=from.cookie.jwt; other=1"),
        );

        assert_eq!(extract_access_token(&headers), Some("from.cookie.jwt"));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from.header.jwt"));
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token=from.cookie.jwt"));

        assert_eq!(extract_access_token(&headers), Some("from.header.jwt"));
    }

    #[test]
    fn test_cleared_cookie_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token="));

        assert_eq!(extract_access_token(&headers), None);
    }
}
