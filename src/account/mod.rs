use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::auth::{require_admin, require_user};
use crate::shared::AppState;

// Public API - what other modules can use
pub use service::AccountService;
pub use types::UserResponse;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;

/// Routes mounted under `/api/Account`
pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/SignUp", post(handlers::sign_up))
        .route("/SignIn", post(handlers::sign_in))
        .route("/Refresh", post(handlers::refresh));

    let user = Router::new()
        .route("/Me", get(handlers::me))
        .route("/Update", put(handlers::update_account))
        .route("/SignOut", post(handlers::sign_out))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let admin = Router::new()
        .route(
            "/Admin",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route(
            "/Admin/:id",
            get(handlers::admin::get_user)
                .put(handlers::admin::update_user)
                .delete(handlers::admin::delete_user),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    public.merge(user).merge(admin)
}
