use std::sync::Arc;

use simbirgo::{
    account::AccountService,
    auth::{start_blacklist_cleanup_task, InMemoryTokenBlacklist, TokenService},
    build_router, AppConfig, AppState, InMemoryStore, PostgresStore, SystemClock,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simbirgo=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting simbirgo rental server");

    let config = AppConfig::from_env();

    let token_service = Arc::new(TokenService::new(
        config.token.clone(),
        Arc::new(InMemoryTokenBlacklist::new()),
    ));
    let clock = Arc::new(SystemClock);

    // Same store behind every repository
    let app_state = match &config.database_url {
        Some(url) => {
            let store = Arc::new(PostgresStore::connect(url).await?);
            AppState::from_store(store, token_service.clone(), clock)
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            AppState::from_store(Arc::new(InMemoryStore::new()), token_service.clone(), clock)
        }
    };

    if let Some(credentials) = &config.bootstrap_admin {
        AccountService::new(app_state.user_repository.clone(), token_service.clone())
            .ensure_admin(credentials)
            .await?;
    }

    tokio::spawn(start_blacklist_cleanup_task(
        token_service,
        config.blacklist_cleanup.clone(),
    ));

    let app = build_router(app_state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
