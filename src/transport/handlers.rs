use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    service::TransportService,
    types::{AdminTransportRequest, TransportListQuery, TransportRequest, TransportResponse},
};
use crate::auth::CurrentUser;
use crate::shared::{AppError, AppState, Pagination};

fn transport_service(state: &AppState) -> TransportService {
    TransportService::new(
        Arc::clone(&state.transport_repository),
        Arc::clone(&state.user_repository),
    )
}

/// HTTP handler for fetching a single transport
///
/// GET /api/Transport/{id}
/// Public, no authentication required
#[instrument(name = "get_transport", skip(state))]
pub async fn get_transport(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransportResponse>, AppError> {
    Ok(Json(transport_service(&state).get_transport(id).await?))
}

/// GET /api/Transport/My?transportType=&start=&count=
#[instrument(name = "list_my_transports", skip(state, user))]
pub async fn list_my_transports(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<TransportListQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<TransportResponse>>, AppError> {
    let transports = transport_service(&state)
        .list_owned(&user, query.transport_type, page)
        .await?;
    Ok(Json(transports))
}

/// POST /api/Transport
#[instrument(name = "create_transport", skip(state, user, request))]
pub async fn create_transport(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<TransportRequest>,
) -> Result<Json<TransportResponse>, AppError> {
    let transport = transport_service(&state)
        .create_transport(&user, request)
        .await?;

    info!(transport_id = %transport.id, "Transport registered");
    Ok(Json(transport))
}

/// PUT /api/Transport/{id}
#[instrument(name = "update_transport", skip(state, user, request))]
pub async fn update_transport(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransportRequest>,
) -> Result<Json<TransportResponse>, AppError> {
    let transport = transport_service(&state)
        .update_transport(&user, id, request)
        .await?;
    Ok(Json(transport))
}

/// DELETE /api/Transport/{id}
#[instrument(name = "delete_transport", skip(state, user))]
pub async fn delete_transport(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transport_service(&state)
        .delete_transport(&user, id)
        .await?;
    Ok(Json(json!({ "message": "Transport deleted" })))
}

pub(super) mod admin {
    use super::*;

    /// GET /api/Transport/Admin?transportType=&start=&count=
    #[instrument(name = "admin_list_transports", skip(state))]
    pub async fn list_transports(
        State(state): State<AppState>,
        Query(query): Query<TransportListQuery>,
        Query(page): Query<Pagination>,
    ) -> Result<Json<Vec<TransportResponse>>, AppError> {
        let transports = transport_service(&state)
            .list_all(query.transport_type, page)
            .await?;
        Ok(Json(transports))
    }

    #[instrument(name = "admin_get_transport", skip(state))]
    pub async fn get_transport(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
    ) -> Result<Json<TransportResponse>, AppError> {
        Ok(Json(transport_service(&state).get_transport(id).await?))
    }

    #[instrument(name = "admin_create_transport", skip(state, request))]
    pub async fn create_transport(
        State(state): State<AppState>,
        Json(request): Json<AdminTransportRequest>,
    ) -> Result<Json<TransportResponse>, AppError> {
        let transport = transport_service(&state)
            .admin_create_transport(request)
            .await?;
        Ok(Json(transport))
    }

    #[instrument(name = "admin_update_transport", skip(state, request))]
    pub async fn update_transport(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
        Json(request): Json<AdminTransportRequest>,
    ) -> Result<Json<TransportResponse>, AppError> {
        let transport = transport_service(&state)
            .admin_update_transport(id, request)
            .await?;
        Ok(Json(transport))
    }

    #[instrument(name = "admin_delete_transport", skip(state))]
    pub async fn delete_transport(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
    ) -> Result<Json<Value>, AppError> {
        transport_service(&state).admin_delete_transport(id).await?;
        Ok(Json(json!({ "message": "Transport deleted" })))
    }
}
