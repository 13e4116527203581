use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::{require_admin, require_user};
use crate::shared::AppState;

// Public API - what other modules can use
pub use service::TransportService;
pub use types::TransportResponse;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;

/// Routes mounted under `/api/Transport`
///
/// Static segments (`My`, `Admin`) win over `/:id`.
pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new().route("/:id", get(handlers::get_transport));

    let user = Router::new()
        .route("/", post(handlers::create_transport))
        .route("/My", get(handlers::list_my_transports))
        .route(
            "/:id",
            axum::routing::put(handlers::update_transport).delete(handlers::delete_transport),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let admin = Router::new()
        .route(
            "/Admin",
            get(handlers::admin::list_transports).post(handlers::admin::create_transport),
        )
        .route(
            "/Admin/:id",
            get(handlers::admin::get_transport)
                .put(handlers::admin::update_transport)
                .delete(handlers::admin::delete_transport),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    public.merge(user).merge(admin)
}
