//! Out-of-band admin provisioning. Admins are never created through the
//! HTTP surface; run this against the same database instead:
//!
//!     create_admin <username> <email> <password>

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};

use expense_backend::{auth, config::Config, db, errors::AppError, AppState};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let mut args = std::env::args().skip(1);
    let (Some(username), Some(email), Some(password)) = (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: create_admin <username> <email> <password>");
        std::process::exit(2);
    };

    let config = Config::from_env();

    let opts = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5));

    let db_pool = SqlitePool::connect_with(opts)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    db::init_schema(&db_pool)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let state = AppState {
        db_pool,
        config,
    };

    if db::get_admin_by_email(&state, &email)
        .await
        .map_err(AppError::from)?
        .is_some()
    {
        eprintln!("Admin with email {} already exists", email);
        std::process::exit(1);
    }

    let hashed = auth::hash_password(&password)?;
    let admin = db::create_admin(&state, &username, &email, &hashed).await?;
    println!("Created admin {} ({})", admin.username, admin.email);
    Ok(())
}
