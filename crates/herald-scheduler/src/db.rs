use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `entries` table (idempotent) and an index on `due_at` so the
/// due-sweep query stays efficient with many scheduled entries. Timestamps
/// are RFC 3339 UTC TEXT, so SQL `<=` on them matches chronological order.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS entries (
            id             TEXT    NOT NULL PRIMARY KEY,
            due_at         TEXT    NOT NULL,   -- RFC 3339 UTC
            content        TEXT    NOT NULL,
            channel_id     TEXT    NOT NULL,
            recurrence     TEXT    NOT NULL,   -- oneshot|daily|monthly|yearly|custom
            custom_minutes INTEGER NOT NULL DEFAULT 0,
            created_by     TEXT    NOT NULL,
            created_at     TEXT    NOT NULL,
            updated_at     TEXT    NOT NULL
        ) STRICT;

        -- Efficient due-sweep: SELECT … WHERE due_at <= ?  ORDER BY due_at
        CREATE INDEX IF NOT EXISTS idx_entries_due_at ON entries (due_at);
        ",
    )?;
    Ok(())
}
