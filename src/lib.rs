use sqlx::SqlitePool;

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod routes;
pub mod structs;
pub mod uploads;
pub mod utils;

use config::Config;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Config,
}
