use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    service::RentService,
    types::{
        AdminRentRequest, AdminRentUpdateRequest, EndRentQuery, NewRentQuery, RentResponse,
        SearchQuery,
    },
};
use crate::auth::CurrentUser;
use crate::shared::{AppError, AppState, Pagination};
use crate::transport::TransportResponse;

fn rent_service(state: &AppState) -> RentService {
    RentService::new(
        Arc::clone(&state.rent_repository),
        Arc::clone(&state.transport_repository),
        Arc::clone(&state.user_repository),
        Arc::clone(&state.clock),
    )
}

/// HTTP handler for finding rentable transports nearby
///
/// GET /api/Rent/Transport?lat=&long=&radius=&transportType=
/// Public, no authentication required
#[instrument(name = "search_transports", skip(state))]
pub async fn search_transports(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<TransportResponse>>, AppError> {
    let transports = rent_service(&state).search(query, page).await?;
    Ok(Json(transports))
}

/// GET /api/Rent/{id}
#[instrument(name = "get_rent", skip(state, user))]
pub async fn get_rent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<RentResponse>, AppError> {
    Ok(Json(rent_service(&state).get_rent(&user, id).await?))
}

/// GET /api/Rent/MyHistory?start=&count=
#[instrument(name = "my_history", skip(state, user))]
pub async fn my_history(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<RentResponse>>, AppError> {
    Ok(Json(rent_service(&state).my_history(&user, page).await?))
}

/// GET /api/Rent/TransportHistory/{id}?start=&count=
#[instrument(name = "transport_history", skip(state, user))]
pub async fn transport_history(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<RentResponse>>, AppError> {
    let history = rent_service(&state)
        .transport_history(&user, id, page)
        .await?;
    Ok(Json(history))
}

/// POST /api/Rent/New/{transportId}?priceType=Minutes|Days
#[instrument(name = "new_rent", skip(state, user))]
pub async fn new_rent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(transport_id): Path<Uuid>,
    Query(query): Query<NewRentQuery>,
) -> Result<Json<RentResponse>, AppError> {
    let rent = rent_service(&state)
        .open_rent(&user, transport_id, query.price_type)
        .await?;

    info!(rent_id = %rent.id, user_id = %user.id, "Rent started");
    Ok(Json(rent))
}

/// POST /api/Rent/End/{rentId}?lat=&long=
#[instrument(name = "end_rent", skip(state, user))]
pub async fn end_rent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<EndRentQuery>,
) -> Result<Json<RentResponse>, AppError> {
    let rent = rent_service(&state)
        .end_rent(&user, id, query.lat, query.long)
        .await?;

    info!(rent_id = %rent.id, final_price = ?rent.final_price, "Rent finished");
    Ok(Json(rent))
}

pub(super) mod admin {
    use super::*;

    #[instrument(name = "admin_get_rent", skip(state))]
    pub async fn get_rent(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
    ) -> Result<Json<RentResponse>, AppError> {
        Ok(Json(rent_service(&state).admin_get_rent(id).await?))
    }

    /// GET /api/Rent/Admin/UserHistory/{userId}
    #[instrument(name = "admin_user_history", skip(state))]
    pub async fn user_history(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
        Query(page): Query<Pagination>,
    ) -> Result<Json<Vec<RentResponse>>, AppError> {
        Ok(Json(rent_service(&state).admin_user_history(id, page).await?))
    }

    /// GET /api/Rent/Admin/TransportHistory/{transportId}
    #[instrument(name = "admin_transport_history", skip(state))]
    pub async fn transport_history(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
        Query(page): Query<Pagination>,
    ) -> Result<Json<Vec<RentResponse>>, AppError> {
        let history = rent_service(&state)
            .admin_transport_history(id, page)
            .await?;
        Ok(Json(history))
    }

    /// POST /api/Rent/Admin/New
    #[instrument(name = "admin_new_rent", skip(state, request))]
    pub async fn new_rent(
        State(state): State<AppState>,
        Json(request): Json<AdminRentRequest>,
    ) -> Result<Json<RentResponse>, AppError> {
        Ok(Json(rent_service(&state).admin_create_rent(request).await?))
    }

    /// POST /api/Rent/Admin/End/{rentId}?lat=&long=
    #[instrument(name = "admin_end_rent", skip(state))]
    pub async fn end_rent(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
        Query(query): Query<EndRentQuery>,
    ) -> Result<Json<RentResponse>, AppError> {
        let rent = rent_service(&state)
            .admin_end_rent(id, query.lat, query.long)
            .await?;
        Ok(Json(rent))
    }

    #[instrument(name = "admin_update_rent", skip(state, request))]
    pub async fn update_rent(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
        Json(request): Json<AdminRentUpdateRequest>,
    ) -> Result<Json<RentResponse>, AppError> {
        Ok(Json(rent_service(&state).admin_update_rent(id, request).await?))
    }

    #[instrument(name = "admin_delete_rent", skip(state))]
    pub async fn delete_rent(
        State(state): State<AppState>,
        Path(id): Path<Uuid>,
    ) -> Result<Json<Value>, AppError> {
        rent_service(&state).admin_delete_rent(id).await?;
        Ok(Json(json!({ "message": "Rent deleted" })))
    }
}
