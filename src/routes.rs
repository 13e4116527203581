use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{account, health, payment, rent, shared::AppState, transport};

/// Assembles the full HTTP surface
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .nest("/Account", account::routes(&state))
        .nest("/Transport", transport::routes(&state))
        .nest("/Rent", rent::routes(&state))
        .nest("/Payment", payment::routes(&state));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the configured origins, permissive when none are set
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
