//! `SQLite` database reader for Messenger `threads_db2` exports.
//!
//! Exposes the `thread_users` and `messages` tables as read-only row
//! sets, read in full with no filtering or pagination.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::domain::{AppError, Result};

/// One row of the `thread_users` contacts table.
#[derive(Debug)]
pub struct ContactRow {
    pub user_key: String,
    pub name: String,
}

/// One row of the `messages` table, fields still in their raw stored
/// shape (JSON blobs undecoded, timestamps in epoch milliseconds).
#[derive(Debug, Default)]
pub struct MessageRow {
    pub thread_key: String,
    pub sender: Option<String>,
    pub text: Option<String>,
    pub timestamp_ms: Option<i64>,
    pub timestamp_sent_ms: Option<i64>,
    pub attachments: Option<String>,
    pub rtc_event: Option<String>,
    pub rtc_is_video_call: Option<i64>,
    pub admin_extensible_data: Option<String>,
}

/// `SQLite` reader for a threads database.
pub struct ThreadsDbReader {
    conn: Connection,
}

impl ThreadsDbReader {
    /// Opens a threads database in read-only mode.
    ///
    /// # Errors
    /// Returns error if the file is missing or cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::DatabaseNotFound {
                path: path.to_path_buf(),
            });
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(path, flags).map_err(AppError::database)?;

        // Optimize for read-only access
        conn.execute_batch(
            "PRAGMA query_only = ON;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(AppError::database)?;

        Ok(Self { conn })
    }

    /// Fetches the full contacts table.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn fetch_contacts(&self) -> Result<Vec<ContactRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_key, name FROM thread_users")
            .map_err(AppError::database)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ContactRow {
                    user_key: row.get(0)?,
                    name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            })
            .map_err(AppError::database)?;

        let mut contacts = Vec::new();
        for row in rows {
            match row {
                Ok(contact) => contacts.push(contact),
                Err(e) => {
                    tracing::warn!("Failed to read contact row: {}", e);
                }
            }
        }

        tracing::debug!("Fetched {} contact rows", contacts.len());

        Ok(contacts)
    }

    /// Fetches the full messages table.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn fetch_messages(&self) -> Result<Vec<MessageRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT thread_key, sender, text, timestamp_ms, timestamp_sent_ms,
                        attachments, admin_text_thread_rtc_event,
                        admin_text_thread_rtc_is_video_call,
                        generic_admin_message_extensible_data
                 FROM messages",
            )
            .map_err(AppError::database)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(MessageRow {
                    thread_key: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    sender: row.get(1)?,
                    text: row.get(2)?,
                    timestamp_ms: row.get(3)?,
                    timestamp_sent_ms: row.get(4)?,
                    attachments: row.get(5)?,
                    rtc_event: row.get(6)?,
                    rtc_is_video_call: row.get(7)?,
                    admin_extensible_data: row.get(8)?,
                })
            })
            .map_err(AppError::database)?;

        let mut messages = Vec::new();
        for row in rows {
            match row {
                Ok(message) => messages.push(message),
                Err(e) => {
                    tracing::warn!("Failed to read message row: {}", e);
                }
            }
        }

        tracing::debug!("Fetched {} message rows", messages.len());

        Ok(messages)
    }
}
