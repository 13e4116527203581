use axum::{
    extract::{Path, State},
    middleware,
    routing::post,
    Extension, Json, Router,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::account::UserResponse;
use crate::auth::{require_user, CurrentUser};
use crate::shared::{AppError, AppState};

pub use service::{PaymentService, TOP_UP_AMOUNT};

mod service;

/// POST /api/Payment/Hesoyam/{userId}
#[instrument(name = "hesoyam", skip(state, caller))]
async fn hesoyam(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let service = PaymentService::new(Arc::clone(&state.user_repository));
    Ok(Json(service.top_up(&caller, user_id).await?))
}

/// Routes mounted under `/api/Payment`
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/Hesoyam/:id", post(hesoyam))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user))
}
