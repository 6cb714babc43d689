use std::str::FromStr;

use actix_files::Files;
use actix_web::{middleware, web::Data, App, HttpServer};
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};

use expense_backend::{config::Config, db, routes, uploads, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();

    let opts = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .read_only(false)
        .busy_timeout(std::time::Duration::from_secs(5));

    let db_pool = SqlitePool::connect_with(opts)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    db::init_schema(&db_pool)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    info!("Database schema ready");

    uploads::ensure_upload_dirs(&config.upload_dir)?;

    let bind_addr = config.bind_addr.clone();
    let upload_dir = config.upload_dir.clone();
    info!("Starting HTTP server on http://{}/", bind_addr);

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .service(Files::new("/uploads", upload_dir.clone()))
            .configure(routes::configure)
            .app_data(Data::new(AppState {
                db_pool: db_pool.clone(),
                config: config.clone(),
            }))
    })
    .bind(bind_addr)?
    .run()
    .await
}
