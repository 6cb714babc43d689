use std::env;

use jsonwebtoken::Algorithm;

/// Environment-sourced settings, read once at startup and carried in the
/// application state.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub token_ttl_minutes: i64,
    pub upload_dir: String,
}

impl Config {
    /// Reads configuration from the environment. Exits the process when
    /// JWT_SECRET is missing, matching the fatal-on-missing-key behavior
    /// of the session setup this replaced.
    pub fn from_env() -> Config {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::error!("FATAL: JWT_SECRET environment variable not set");
            std::process::exit(1);
        });

        let jwt_algorithm = match env::var("JWT_ALGORITHM") {
            Ok(name) => name.parse::<Algorithm>().unwrap_or_else(|_| {
                log::error!("FATAL: unsupported JWT_ALGORITHM: {}", name);
                std::process::exit(1);
            }),
            Err(_) => Algorithm::HS256,
        };

        let token_ttl_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://expense_backend.db".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            jwt_secret,
            jwt_algorithm,
            token_ttl_minutes,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
        }
    }
}
