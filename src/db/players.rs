//! Player rows and the CRUD surface over them.

use super::Db;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub fide_id: Option<i64>,
    pub chesscom_username: Option<String>,
    pub lichess_username: Option<String>,
    pub fide_rating: Option<f64>,
    pub chesscom_rating: Option<f64>,
    pub lichess_rating: Option<f64>,
    pub highest_rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPlayer {
    pub name: String,
    pub fide_id: Option<i64>,
    pub chesscom_username: Option<String>,
    pub lichess_username: Option<String>,
}

impl NewPlayer {
    /// A player is only admissible with something to look ratings up by.
    pub fn has_identifier(&self) -> bool {
        self.fide_id.is_some()
            || self.chesscom_username.is_some()
            || self.lichess_username.is_some()
    }
}

/// True when the error chain bottoms out in a UNIQUE constraint failure.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<sqlx::Error>())
        .any(|e| matches!(e, sqlx::Error::Database(d) if d.is_unique_violation()))
}

pub async fn insert(db: &Db, new: &NewPlayer) -> Result<Player> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO players (name, fide_id, chesscom_username, lichess_username, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&new.name)
    .bind(new.fide_id)
    .bind(new.chesscom_username.as_deref())
    .bind(new.lichess_username.as_deref())
    .bind(now)
    .execute(&db.pool)
    .await
    .with_context(|| format!("inserting player {}", new.name))?;

    let id = result.last_insert_rowid();
    get(db, id)
        .await?
        .context("player row vanished after insert")
}

pub async fn list(db: &Db) -> Result<Vec<Player>> {
    sqlx::query_as::<_, Player>("SELECT * FROM players ORDER BY id")
        .fetch_all(&db.pool)
        .await
        .context("listing players")
}

pub async fn get(db: &Db, id: i64) -> Result<Option<Player>> {
    sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id = ?1")
        .bind(id)
        .fetch_optional(&db.pool)
        .await
        .with_context(|| format!("loading player {id}"))
}

pub async fn find_by_name(db: &Db, name: &str) -> Result<Option<Player>> {
    sqlx::query_as::<_, Player>("SELECT * FROM players WHERE name = ?1")
        .bind(name)
        .fetch_optional(&db.pool)
        .await
        .with_context(|| format!("looking up player {name}"))
}

/// Store freshly aggregated ratings. `highest` must be the max of the three
/// per-platform values being written.
pub async fn update_ratings(
    db: &Db,
    id: i64,
    fide: Option<f64>,
    chesscom: Option<f64>,
    lichess: Option<f64>,
    highest: Option<f64>,
) -> Result<()> {
    sqlx::query(
        "UPDATE players
         SET fide_rating = ?2, chesscom_rating = ?3, lichess_rating = ?4,
             highest_rating = ?5, updated_at = ?6
         WHERE id = ?1",
    )
    .bind(id)
    .bind(fide)
    .bind(chesscom)
    .bind(lichess)
    .bind(highest)
    .bind(Utc::now())
    .execute(&db.pool)
    .await
    .with_context(|| format!("updating ratings for player {id}"))?;
    Ok(())
}

pub async fn delete(db: &Db, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM players WHERE id = ?1")
        .bind(id)
        .execute(&db.pool)
        .await
        .with_context(|| format!("deleting player {id}"))?;
    Ok(())
}

/// Delete by display name; the service's public delete surface is name-based.
pub async fn delete_by_name(db: &Db, name: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM players WHERE name = ?1")
        .bind(name)
        .execute(&db.pool)
        .await
        .with_context(|| format!("deleting player {name}"))?;
    Ok(result.rows_affected() > 0)
}

/// Replace the whole roster in one transaction (sheet import). Rows that
/// violate uniqueness are skipped and logged; returns how many were kept.
pub async fn replace_all(db: &Db, rows: &[NewPlayer]) -> Result<usize> {
    let mut tx = db.pool.begin().await.context("opening import transaction")?;

    sqlx::query("DELETE FROM players")
        .execute(&mut *tx)
        .await
        .context("clearing players for import")?;

    let now = Utc::now();
    let mut inserted = 0usize;
    for row in rows {
        let outcome = sqlx::query(
            "INSERT INTO players (name, fide_id, chesscom_username, lichess_username, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&row.name)
        .bind(row.fide_id)
        .bind(row.chesscom_username.as_deref())
        .bind(row.lichess_username.as_deref())
        .bind(now)
        .execute(&mut *tx)
        .await;
        match outcome {
            Ok(_) => inserted += 1,
            Err(e) => warn!(name = %row.name, error = %e, "skipping sheet row"),
        }
    }

    tx.commit().await.context("committing import")?;
    Ok(inserted)
}

/// Renumber primary keys so position in `ordered_ids` becomes the id.
/// Two-phase: all ids are first flipped negative so the fresh 1..=n ids never
/// collide with a not-yet-renumbered row.
pub async fn renumber(db: &Db, ordered_ids: &[i64]) -> Result<()> {
    let mut tx = db
        .pool
        .begin()
        .await
        .context("opening renumber transaction")?;

    sqlx::query("UPDATE players SET id = -id")
        .execute(&mut *tx)
        .await
        .context("staging renumber")?;

    for (position, old_id) in ordered_ids.iter().enumerate() {
        sqlx::query("UPDATE players SET id = ?1 WHERE id = ?2")
            .bind((position + 1) as i64)
            .bind(-old_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("renumbering player {old_id}"))?;
    }

    tx.commit().await.context("committing renumber")?;
    Ok(())
}
