use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::{require_admin, require_user};
use crate::shared::AppState;

// Public API - what other modules can use
pub use service::RentService;
pub use types::RentResponse;

// Internal modules
pub mod clock;
mod handlers;
pub mod models;
pub mod pricing;
pub mod repository;
mod service;
pub mod types;

/// Routes mounted under `/api/Rent`
pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new().route("/Transport", get(handlers::search_transports));

    let user = Router::new()
        .route("/MyHistory", get(handlers::my_history))
        .route("/TransportHistory/:id", get(handlers::transport_history))
        .route("/New/:id", post(handlers::new_rent))
        .route("/End/:id", post(handlers::end_rent))
        .route("/:id", get(handlers::get_rent))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let admin = Router::new()
        .route("/Admin/UserHistory/:id", get(handlers::admin::user_history))
        .route(
            "/Admin/TransportHistory/:id",
            get(handlers::admin::transport_history),
        )
        .route("/Admin/New", post(handlers::admin::new_rent))
        .route("/Admin/End/:id", post(handlers::admin::end_rent))
        .route(
            "/Admin/:id",
            get(handlers::admin::get_rent)
                .put(handlers::admin::update_rent)
                .delete(handlers::admin::delete_rent),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    public.merge(user).merge(admin)
}
