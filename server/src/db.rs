//! Scoreboard persistence in PostgreSQL.
//!
//! Retired players land in the `retired_players` table. The sqlx pool is
//! bounded at the worker-thread count, so at most that many queries hold a
//! connection at once; acquiring blocks (asynchronously) until one frees
//! up. Nothing here touches game state, so queries run off the game lock.

use log::info;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// One row of the public scoreboard; `play_time` is in seconds.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRecord {
    pub name: String,
    pub score: i32,
    #[serde(rename = "playTime")]
    pub play_time: f64,
}

/// Bounded-pool handle to the scoreboard database.
pub struct Scoreboard {
    pool: PgPool,
}

impl Scoreboard {
    /// Connects and ensures the schema exists. Schema failures here are
    /// fatal for the caller: a server without a scoreboard cannot retire
    /// players.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS retired_players (\
                 id UUID CONSTRAINT player_id PRIMARY KEY, \
                 name varchar(100) NOT NULL, \
                 score integer, \
                 play_time_ms integer)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS record_players \
                 ON retired_players (score DESC, play_time_ms, name)",
        )
        .execute(&pool)
        .await?;

        info!("scoreboard database ready ({} connections)", max_connections.max(1));
        Ok(Self { pool })
    }

    /// Inserts one retired-player row under a fresh UUID.
    pub async fn save_record(&self, name: &str, score: i64, play_ms: u64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO retired_players (id, name, score, play_time_ms) \
                 VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(score as i32)
        .bind(play_ms as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Scoreboard page ordered by score, then play time, then name. The
    /// dispatcher enforces `limit <= 100` before calling.
    pub async fn records(&self, limit: i64, offset: i64) -> Result<Vec<PlayerRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT name, score, play_time_ms FROM retired_players \
                 ORDER BY score DESC, play_time_ms, name LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PlayerRecord {
                name: row.get("name"),
                score: row.get("score"),
                play_time: f64::from(row.get::<i32, _>("play_time_ms")) / 1000.0,
            })
            .collect())
    }
}
