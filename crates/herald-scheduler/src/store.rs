use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::init_db,
    error::{Result, SchedulerError},
    types::{EntryPatch, NewEntry, Recurrence, ScheduledEntry},
};

const COLUMNS: &str = "id, due_at, content, channel_id, recurrence, custom_minutes, \
                       created_by, created_at, updated_at";

/// Raw row as read from SQLite, before timestamp/recurrence decoding.
type RawEntry = (
    String,         // id
    String,         // due_at
    String,         // content
    String,         // channel_id
    String,         // recurrence kind
    u32,            // custom_minutes
    String,         // created_by
    String,         // created_at
    String,         // updated_at
);

/// Durable collection of scheduled entries.
///
/// Cloneable handle over a single SQLite connection; front ends and the
/// sweep engine each hold a clone, so there are no module-level singletons.
/// Every operation takes the lock for the duration of one statement (or one
/// read-modify-write pair), which is what makes `find_due` atomic relative
/// to concurrent writers.
#[derive(Clone)]
pub struct EntryStore {
    conn: Arc<Mutex<Connection>>,
}

impl EntryStore {
    /// Wrap `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Persist a new entry. Assigns and returns a fresh UUID v4 id.
    pub fn insert(&self, new: NewEntry) -> Result<ScheduledEntry> {
        validate_new(&new)?;

        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let id = Uuid::new_v4().to_string();

        conn.execute(
            &format!("INSERT INTO entries ({COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?8)"),
            rusqlite::params![
                id,
                new.due_at.to_rfc3339(),
                new.content,
                new.channel_id,
                new.recurrence.kind(),
                new.recurrence.custom_minutes(),
                new.created_by,
                now_str,
            ],
        )?;
        info!(entry_id = %id, channel_id = %new.channel_id, recurrence = %new.recurrence, "entry scheduled");

        Ok(ScheduledEntry {
            id,
            due_at: new.due_at,
            content: new.content,
            channel_id: new.channel_id,
            recurrence: new.recurrence,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Point lookup by id.
    pub fn get(&self, id: &str) -> Result<ScheduledEntry> {
        let conn = self.conn.lock().unwrap();
        get_locked(&conn, id)
    }

    /// Delete by id, returning the deleted entry. An unknown id leaves the
    /// store untouched and returns `NotFound`.
    pub fn delete(&self, id: &str) -> Result<ScheduledEntry> {
        let conn = self.conn.lock().unwrap();
        let entry = get_locked(&conn, id)?;
        conn.execute("DELETE FROM entries WHERE id = ?1", [id])?;
        info!(entry_id = %id, "entry deleted");
        Ok(entry)
    }

    /// Apply a partial patch, re-validating the result. `NotFound` for an
    /// unknown id, `Validation` if the patch would break an invariant.
    pub fn update(&self, id: &str, patch: EntryPatch) -> Result<ScheduledEntry> {
        let conn = self.conn.lock().unwrap();
        let mut entry = get_locked(&conn, id)?;

        if let Some(due_at) = patch.due_at {
            entry.due_at = due_at;
        }
        if let Some(content) = patch.content {
            entry.content = content;
        }
        if let Some(channel_id) = patch.channel_id {
            entry.channel_id = channel_id;
        }
        if let Some(recurrence) = patch.recurrence {
            entry.recurrence = recurrence;
        }
        validate_fields(&entry.content, &entry.channel_id, &entry.recurrence)?;

        entry.updated_at = Utc::now();
        conn.execute(
            "UPDATE entries SET due_at=?1, content=?2, channel_id=?3, recurrence=?4,
                    custom_minutes=?5, updated_at=?6
             WHERE id=?7",
            rusqlite::params![
                entry.due_at.to_rfc3339(),
                entry.content,
                entry.channel_id,
                entry.recurrence.kind(),
                entry.recurrence.custom_minutes(),
                entry.updated_at.to_rfc3339(),
                id,
            ],
        )?;
        Ok(entry)
    }

    /// All entries in insertion order.
    pub fn list_all(&self) -> Result<Vec<ScheduledEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM entries ORDER BY created_at, id"
        ))?;
        let entries = stmt
            .query_map([], read_raw)?
            .filter_map(|r| r.ok())
            .filter_map(decode_raw)
            .collect();
        Ok(entries)
    }

    /// Every entry with `due_at <= as_of`, in due order.
    ///
    /// A single SELECT, so a concurrent insert or reschedule is either fully
    /// visible to this sweep or not at all — never half-applied.
    pub fn find_due(&self, as_of: DateTime<Utc>) -> Result<Vec<ScheduledEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {COLUMNS} FROM entries WHERE due_at <= ?1 ORDER BY due_at"
        ))?;
        let entries = stmt
            .query_map([as_of.to_rfc3339()], read_raw)?
            .filter_map(|r| r.ok())
            .filter_map(decode_raw)
            .collect();
        Ok(entries)
    }
}

fn get_locked(conn: &Connection, id: &str) -> Result<ScheduledEntry> {
    let raw = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM entries WHERE id = ?1"),
            [id],
            read_raw,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => SchedulerError::NotFound { id: id.to_string() },
            other => SchedulerError::Database(other),
        })?;
    decode_raw(raw).ok_or_else(|| {
        SchedulerError::Validation(format!("stored entry {id} is corrupt and cannot be decoded"))
    })
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn decode_raw(raw: RawEntry) -> Option<ScheduledEntry> {
    let (id, due_at, content, channel_id, kind, minutes, created_by, created_at, updated_at) = raw;
    Some(ScheduledEntry {
        id,
        due_at: parse_utc(&due_at)?,
        content,
        channel_id,
        recurrence: Recurrence::from_parts(&kind, minutes).ok()?,
        created_by,
        created_at: parse_utc(&created_at)?,
        updated_at: parse_utc(&updated_at)?,
    })
}

fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn validate_new(new: &NewEntry) -> Result<()> {
    validate_fields(&new.content, &new.channel_id, &new.recurrence)
}

fn validate_fields(content: &str, channel_id: &str, recurrence: &Recurrence) -> Result<()> {
    if content.trim().is_empty() {
        return Err(SchedulerError::Validation(
            "message content must not be empty".to_string(),
        ));
    }
    if channel_id.trim().is_empty() {
        return Err(SchedulerError::Validation(
            "channel id must not be empty".to_string(),
        ));
    }
    if let Recurrence::Custom { minutes: 0 } = recurrence {
        return Err(SchedulerError::Validation(
            "custom interval requires a positive number of minutes".to_string(),
        ));
    }
    Ok(())
}
