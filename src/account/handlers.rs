use axum::{
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    service::AccountService,
    types::{CredentialsRequest, RefreshRequest, UpdateAccountRequest, UserResponse},
};
use crate::auth::{
    CurrentUser, TokenClaims, TokenKind, TokenPair, TokenService, ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
};
use crate::shared::{AppError, AppState};

fn account_service(state: &AppState) -> AccountService {
    AccountService::new(
        Arc::clone(&state.user_repository),
        Arc::clone(&state.token_service),
    )
}

/// Token pair in the body, mirrored into HttpOnly cookies for browser clients
fn with_token_cookies(token_service: &TokenService, pair: TokenPair) -> Response {
    let config = token_service.config();
    let access = session_cookie(
        ACCESS_TOKEN_COOKIE,
        &pair.access_token,
        config.ttl(TokenKind::Access).num_seconds(),
    );
    let refresh = session_cookie(
        REFRESH_TOKEN_COOKIE,
        &pair.refresh_token,
        config.ttl(TokenKind::Refresh).num_seconds(),
    );

    (
        AppendHeaders([(header::SET_COOKIE, access), (header::SET_COOKIE, refresh)]),
        Json(pair),
    )
        .into_response()
}

fn session_cookie(name: &str, value: &str, max_age: i64) -> String {
    format!("{name}={value}; Path=/; Max-Age={max_age}; HttpOnly; Secure; SameSite=None")
}

/// HTTP handler for registering a new account
///
/// POST /api/Account/SignUp
#[instrument(name = "sign_up", skip(state, request))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Response, AppError> {
    let pair = account_service(&state).sign_up(request).await?;
    Ok(with_token_cookies(&state.token_service, pair))
}

/// POST /api/Account/SignIn
#[instrument(name = "sign_in", skip(state, request))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Response, AppError> {
    let pair = account_service(&state).sign_in(request).await?;
    Ok(with_token_cookies(&state.token_service, pair))
}

/// POST /api/Account/Refresh
#[instrument(name = "refresh", skip(state, request))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Response, AppError> {
    let pair = account_service(&state)
        .refresh(&request.refresh_token)
        .await?;
    Ok(with_token_cookies(&state.token_service, pair))
}

/// Revokes the presented access token and clears the session cookies
///
/// POST /api/Account/SignOut
#[instrument(name = "sign_out", skip(state, claims))]
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> Response {
    account_service(&state).sign_out(&claims).await;

    (
        AppendHeaders([
            (header::SET_COOKIE, session_cookie(ACCESS_TOKEN_COOKIE, "", 0)),
            (header::SET_COOKIE, session_cookie(REFRESH_TOKEN_COOKIE, "", 0)),
        ]),
        Json(serde_json::json!({ "message": "Signed out" })),
    )
        .into_response()
}

/// GET /api/Account/Me
#[instrument(name = "me", skip(user))]
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(user.into())
}

/// PUT /api/Account/Update
#[instrument(name = "update_account", skip(state, user, request))]
pub async fn update_account(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = user.id;
    let updated = account_service(&state)
        .update_account(user, request)
        .await?;

    info!(user_id = %user_id, "Account update handled");
    Ok(Json(updated))
}

pub(super) mod admin {
    use axum::extract::{Path, Query};
    use uuid::Uuid;

    use super::*;
    use crate::account::types::{AdminCreateUserRequest, AdminUpdateUserRequest};
    use crate::shared::Pagination;

    /// GET /api/Account/Admin?start=&count=
    #[instrument(name = "admin_list_users", skip(state))]
    pub async fn list_users(
        State(state): State<AppState>,
        Query(page): Query<Pagination>,
    ) -> Result<Json<Vec<UserResponse>>, AppError> {
        let users = account_service(&state).list_users(page).await?;
        info!(user_count = users.len(), "Users listed");
        Ok(Json(users))
    }

    #[instrument(name = "admin_get_user", skip(state))]
    pub async fn get_user(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
    ) -> Result<Json<UserResponse>, AppError> {
        Ok(Json(account_service(&state).get_user(id).await?))
    }

    #[instrument(name = "admin_create_user", skip(state, request))]
    pub async fn create_user(
        State(state): State<AppState>,
        Json(request): Json<AdminCreateUserRequest>,
    ) -> Result<Json<UserResponse>, AppError> {
        Ok(Json(account_service(&state).create_user(request).await?))
    }

    #[instrument(name = "admin_update_user", skip(state, request))]
    pub async fn update_user(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
        Json(request): Json<AdminUpdateUserRequest>,
    ) -> Result<Json<UserResponse>, AppError> {
        Ok(Json(account_service(&state).update_user(id, request).await?))
    }

    #[instrument(name = "admin_delete_user", skip(state))]
    pub async fn delete_user(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        account_service(&state).delete_user(id).await?;
        Ok(Json(serde_json::json!({ "message": "User deleted" })))
    }
}
