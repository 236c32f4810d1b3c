// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::{StoreError, MAX_TEXT_LEN};
use crate::model::RecommendationRow;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    name TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS recommendations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recommender_id INTEGER,
    recommended_username TEXT NOT NULL,
    recommendation_text TEXT,
    visible INTEGER NOT NULL DEFAULT 1,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (recommender_id) REFERENCES users(id) ON UPDATE CASCADE ON DELETE CASCADE
);
";

/// Storage collaborator for recommendation rows.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|err| StoreError::Open(err.to_string()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|err| StoreError::Open(err.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Currently visible recommendations for `username` (case-insensitive), newest
    /// first.
    pub async fn visible_recommendations_for(
        &self,
        username: &str,
    ) -> Result<Vec<RecommendationRow>, StoreError> {
        let conn = Arc::clone(&self.conn);
        let username = username.to_owned();

        run_blocking(move || {
            let conn = lock(&conn);
            let mut statement = conn.prepare(
                "SELECT u.username, u.name, r.created_at, r.recommendation_text
                 FROM recommendations r
                 LEFT JOIN users u ON r.recommender_id = u.id
                 WHERE LOWER(r.recommended_username) = LOWER(?1) AND r.visible = 1
                 ORDER BY r.created_at DESC, r.id DESC",
            )?;

            let rows = statement
                .query_map(params![username], |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(recommender_username, recommender_name, created_at, text)| {
                    Ok(RecommendationRow {
                        recommender_username,
                        recommender_name,
                        created_at: parse_timestamp(&created_at)?,
                        recommendation_text: text,
                    })
                })
                .collect()
        })
        .await
    }

    /// Records a recommendation. The recommender's user row is upserted by username so
    /// repeat recommenders keep one stable identity row.
    pub async fn add_recommendation(
        &self,
        recommender_username: &str,
        recommender_name: Option<&str>,
        recommended_username: &str,
        text: Option<&str>,
    ) -> Result<(), StoreError> {
        if recommender_username.trim().is_empty() {
            return Err(StoreError::Validation("recommender username is required".to_owned()));
        }
        if recommended_username.trim().is_empty() {
            return Err(StoreError::Validation("recommended username is required".to_owned()));
        }
        if let Some(text) = text {
            if text.chars().count() > MAX_TEXT_LEN {
                return Err(StoreError::Validation(format!(
                    "recommendation text must be {MAX_TEXT_LEN} characters or less"
                )));
            }
        }

        let conn = Arc::clone(&self.conn);
        let recommender_username = recommender_username.to_owned();
        let recommender_name = recommender_name.map(str::to_owned);
        let recommended_username = recommended_username.to_owned();
        let text = text.map(str::to_owned);

        run_blocking(move || {
            let conn = lock(&conn);
            conn.execute(
                "INSERT INTO users (username, name) VALUES (?1, ?2)
                 ON CONFLICT(username) DO UPDATE SET
                   name = COALESCE(excluded.name, users.name)",
                params![recommender_username, recommender_name],
            )?;
            conn.execute(
                "INSERT INTO recommendations (recommender_id, recommended_username, recommendation_text)
                 VALUES ((SELECT id FROM users WHERE username = ?1), ?2, ?3)",
                params![recommender_username, recommended_username, text],
            )?;
            Ok(())
        })
        .await
    }

    /// Sets a recommendation's visibility flag and returns the recommended username it
    /// affects, so the caller can invalidate that badge.
    pub async fn set_visibility(&self, id: i64, visible: bool) -> Result<String, StoreError> {
        let conn = Arc::clone(&self.conn);

        run_blocking(move || {
            let conn = lock(&conn);
            let username = conn
                .query_row(
                    "SELECT recommended_username FROM recommendations WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
                .ok_or(StoreError::NotFound)?;

            conn.execute(
                "UPDATE recommendations SET visible = ?1 WHERE id = ?2",
                params![visible as i64, id],
            )?;
            Ok(username)
        })
        .await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| StoreError::Query(format!("blocking task failed: {err}")))?
}

fn lock(conn: &Mutex<Connection>) -> std::sync::MutexGuard<'_, Connection> {
    match conn.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// SQLite's CURRENT_TIMESTAMP writes `YYYY-MM-DD HH:MM:SS` in UTC.
fn parse_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, StoreError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|err| StoreError::Query(format!("bad created_at {raw:?}: {err}")))
}
