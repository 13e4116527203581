// Public API - what other modules can use
pub use blacklist::{InMemoryTokenBlacklist, TokenBlacklist};
pub use cleanup_task::{start_blacklist_cleanup_task, BlacklistCleanupConfig};
pub use middleware::{
    extract_access_token, require_admin, require_user, CurrentUser, ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
};
pub use service::TokenService;
pub use token::TokenConfig;
pub use types::{TokenClaims, TokenKind, TokenPair};

// Internal modules
mod blacklist;
mod cleanup_task;
mod middleware;
pub mod password;
mod service;
mod token;
mod types;
