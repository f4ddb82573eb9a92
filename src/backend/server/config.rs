/**
 * Database Setup
 *
 * Opens the SQLite pool named by `DATABASE_URL` and brings the schema up to
 * date. Unlike push providers the database is not optional: a connection or
 * migration failure stops startup.
 */

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub const MAX_CONNECTIONS: u32 = 5;

/// Connect to `database_url` and run migrations
///
/// # Example
///
/// ```rust,no_run
/// use sentinel_chat::backend::server::config::load_database;
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let pool = load_database("sqlite://sentinel.db?mode=rwc").await?;
/// # Ok(())
/// # }
/// ```
pub async fn load_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    tracing::info!("[Server] Connecting to database...");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    tracing::info!("[Server] Running database migrations...");
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("[Server] Database ready");

    Ok(pool)
}
