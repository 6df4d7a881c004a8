//! `SQLite` message archive reader.
//!
//! Reads channel history from a local archive with a `messages` table and an
//! optional `users` table. Structured columns (entities, media, keyboard,
//! reactions) are stored as JSON text.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use crate::domain::{AppError, RawMessage, Result};

use super::source::MessageSource;

/// Archive layout understood by [`SqliteArchiveSource`].
pub const ARCHIVE_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    text TEXT NOT NULL DEFAULT '',
    entities TEXT,
    media TEXT,
    reply_markup TEXT,
    views INTEGER,
    forwards INTEGER,
    reactions TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT
);
";

const PAGE_QUERY: &str = "SELECT id, date, text, entities, media, reply_markup, views, forwards, reactions
     FROM messages
     WHERE (?1 = 0 OR id < ?1)
     ORDER BY id DESC
     LIMIT ?2";

/// Message source backed by a local `SQLite` archive.
pub struct SqliteArchiveSource {
    conn: Option<Connection>,
    has_users: bool,
}

impl SqliteArchiveSource {
    /// Opens an archive in read-only mode.
    ///
    /// # Errors
    /// Returns error if the file is missing or cannot be opened as an archive.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::Config {
                message: format!("Message archive not found at: {}", path.display()),
            });
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA query_only = ON;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(AppError::database)?;

        Self::from_connection(conn)
    }

    /// Wraps an already open connection.
    ///
    /// # Errors
    /// Returns error if the `messages` table is missing.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        if !table_exists(&conn, "messages")? {
            return Err(AppError::Source {
                message: "Archive has no messages table".into(),
            });
        }
        let has_users = table_exists(&conn, "users")?;

        tracing::debug!(has_users, "Opened message archive");

        Ok(Self {
            conn: Some(conn),
            has_users,
        })
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(|| AppError::Source {
            message: "Message archive is closed".into(),
        })
    }

    fn query_page(&self, before_id: i64, limit: usize) -> Result<Vec<RawMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(PAGE_QUERY).map_err(AppError::database)?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![before_id, limit], read_message)
            .map_err(AppError::database)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row.map_err(AppError::database)?);
        }

        tracing::debug!(before_id, count = messages.len(), "Fetched page from archive");

        Ok(messages)
    }

    fn lookup_username(&self, user_id: i64) -> Result<Option<String>> {
        if !self.has_users {
            return Ok(None);
        }

        self.conn()?
            .query_row(
                "SELECT username FROM users WHERE id = ?1",
                [user_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map(Option::flatten)
            .map_err(AppError::database)
    }
}

#[async_trait]
impl MessageSource for SqliteArchiveSource {
    async fn fetch_page(&mut self, before_id: i64, limit: usize) -> Result<Vec<RawMessage>> {
        self.query_page(before_id, limit)
    }

    async fn resolve_entity_user(&mut self, user_id: i64) -> Result<Option<String>> {
        Ok(self
            .lookup_username(user_id)?
            .map(|username| username.trim_start_matches('@').to_string())
            .filter(|username| !username.is_empty())
            .map(|username| format!("https://t.me/{username}")))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| AppError::database(e))?;
            tracing::debug!("Closed message archive");
        }
        Ok(())
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .map_err(AppError::database)
}

/// Builds a message from one archive row.
///
/// Broken JSON in an optional column is logged and treated as absent so a
/// single bad cell does not hide the message text.
fn read_message(row: &Row<'_>) -> rusqlite::Result<RawMessage> {
    let id: i64 = row.get(0)?;

    let date = match row.get_ref(1)? {
        ValueRef::Integer(secs) => DateTime::from_timestamp(secs, 0),
        ValueRef::Text(t) => std::str::from_utf8(t)
            .ok()
            .and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        _ => None,
    }
    .unwrap_or_else(|| {
        tracing::warn!(message_id = id, "Unreadable message date, using epoch");
        DateTime::<Utc>::UNIX_EPOCH
    });

    let text: Option<String> = row.get(2)?;
    let views: Option<i64> = row.get(6)?;
    let forwards: Option<i64> = row.get(7)?;

    Ok(RawMessage {
        id,
        text: text.unwrap_or_default(),
        entities: json_column(row, 3, id, "entities")?.unwrap_or_default(),
        media: json_column(row, 4, id, "media")?,
        reply_markup: json_column(row, 5, id, "reply_markup")?,
        date,
        views: views.and_then(|v| u64::try_from(v).ok()),
        forwards: forwards.and_then(|v| u64::try_from(v).ok()),
        reactions: json_column(row, 8, id, "reactions")?.unwrap_or_default(),
    })
}

fn json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
    message_id: i64,
    column: &str,
) -> rusqlite::Result<Option<T>> {
    let raw = match row.get_ref(idx)? {
        ValueRef::Text(t) | ValueRef::Blob(t) => t,
        _ => return Ok(None),
    };

    if raw.is_empty() {
        return Ok(None);
    }

    match serde_json::from_slice(raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(message_id, column, error = %e, "Ignoring malformed JSON column");
            Ok(None)
        }
    }
}
