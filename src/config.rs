use std::env;
use std::time::Duration;

use crate::auth::{BlacklistCleanupConfig, TokenConfig};

/// Process configuration, read once at startup
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// No URL means the in-memory store
    pub database_url: Option<String>,
    pub token: TokenConfig,
    pub blacklist_cleanup: BlacklistCleanupConfig,
    pub bootstrap_admin: Option<AdminCredentials>,
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bootstrap_admin = match (env_string("ADMIN_USERNAME"), env_string("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminCredentials { username, password }),
            _ => None,
        };

        Self {
            bind_addr: env_string("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_owned()),
            database_url: env_string("DATABASE_URL"),
            token: TokenConfig::from_env(),
            blacklist_cleanup: BlacklistCleanupConfig {
                cleanup_interval: Duration::from_secs(env_u64(
                    "BLACKLIST_CLEANUP_INTERVAL_SECS",
                    300,
                )),
            },
            bootstrap_admin,
            allowed_origins: env_list("ALLOWED_ORIGINS"),
        }
    }
}

/// Trimmed, non-empty variable
pub(crate) fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_owned())
        .filter(|raw| !raw.is_empty())
}

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

pub(crate) fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    env_string(key)
        .map(|raw| {
            raw.split(',')
                .map(|item| item.trim().to_owned())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
