//! SQLite-backed persistence.

pub mod players;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

// Uniqueness of the display name, the federation id, and each platform
// username is enforced here so every code path gets it for free.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    fide_id INTEGER UNIQUE,
    chesscom_username TEXT UNIQUE,
    lichess_username TEXT UNIQUE,
    fide_rating REAL,
    chesscom_rating REAL,
    lichess_rating REAL,
    highest_rating REAL,
    created_at TEXT NOT NULL,
    updated_at TEXT
);
";

#[derive(Clone)]
pub struct Db {
    pub pool: SqlitePool,
}

impl Db {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url {database_url}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("connecting to sqlite")?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("creating schema")?;
        info!("connected to db");
        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection, because each sqlite
    /// `:memory:` connection is its own database.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("connecting to in-memory sqlite")?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}
