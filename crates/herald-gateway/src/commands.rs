//! Chat command front end.
//!
//! Grammar (slash-separated, mirroring the bot command it replaces):
//!
//! ```text
//! !schedule <message> / <YYYY-MM-DD HH:MM> / <#channel> / <interval> [/ <minutes>]
//! !list
//! !delete <id>
//! ```
//!
//! `handle` turns one line of chat input into a reply string; anything that
//! is not a recognized command yields `None` so the transport can ignore it.
//! All validation failures produce a specific corrective reply — they are
//! user mistakes, never system faults.

use chrono_tz::Tz;
use tracing::error;

use herald_core::time;
use herald_scheduler::{EntryStore, NewEntry, Recurrence, SchedulerError};

/// Process one line of chat input from `author`.
pub fn handle(store: &EntryStore, tz: Tz, author: &str, text: &str) -> Option<String> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("!schedule") {
        Some(schedule(store, tz, author, rest))
    } else if let Some(rest) = text.strip_prefix("!delete") {
        Some(delete(store, rest))
    } else if text == "!list" {
        Some(list(store, tz))
    } else {
        None
    }
}

fn schedule(store: &EntryStore, tz: Tz, author: &str, rest: &str) -> String {
    let args: Vec<&str> = rest.split('/').map(str::trim).collect();
    let content = match args.first().filter(|s| !s.is_empty()) {
        Some(s) => *s,
        None => return "Please provide the message for the scheduled task.".to_string(),
    };
    let datetime = match args.get(1).filter(|s| !s.is_empty()) {
        Some(s) => *s,
        None => {
            return "Please provide the date and time for the scheduled task in the format: YYYY-MM-DD HH:MM.".to_string()
        }
    };
    let channel = match args.get(2).filter(|s| !s.is_empty()) {
        Some(s) => s.trim_start_matches('#'),
        None => return "Please mention the channel for the scheduled task.".to_string(),
    };
    let interval = match args.get(3).filter(|s| !s.is_empty()) {
        Some(s) => *s,
        None => {
            return "Please provide the interval for the scheduled task (once, daily, monthly, yearly, custom)."
                .to_string()
        }
    };

    let minutes = if interval == "custom" {
        match args.get(4).and_then(|s| s.parse::<u32>().ok()) {
            Some(m) if m > 0 => m,
            _ => {
                return "Invalid custom interval minutes. Please provide a valid number of minutes."
                    .to_string()
            }
        }
    } else {
        0
    };

    let recurrence = match Recurrence::from_parts(interval, minutes) {
        Ok(r) => r,
        Err(e) => return e.to_string(),
    };

    let due_at = match time::parse_local(datetime, tz) {
        Some(dt) => dt,
        None => {
            return "Invalid date or time format. Please use the format: YYYY-MM-DD HH:MM"
                .to_string()
        }
    };

    match store.insert(NewEntry {
        due_at,
        content: content.to_string(),
        channel_id: channel.to_string(),
        recurrence,
        created_by: author.to_string(),
    }) {
        Ok(_) => format!("Scheduled message \"{content}\" saved for {datetime}"),
        Err(SchedulerError::Validation(msg)) => msg,
        Err(e) => {
            error!("failed to save scheduled message: {e}");
            "An error occurred while saving the scheduled message.".to_string()
        }
    }
}

fn delete(store: &EntryStore, rest: &str) -> String {
    let id = rest.trim();
    if id.is_empty() {
        return "Please provide the ID of the scheduled message to delete.".to_string();
    }
    match store.delete(id) {
        Ok(entry) => format!(
            "Scheduled message \"{}\" with ID \"{id}\" deleted.",
            entry.content
        ),
        Err(SchedulerError::NotFound { .. }) => {
            format!("Scheduled message with ID \"{id}\" not found.")
        }
        Err(e) => {
            error!("failed to delete scheduled message: {e}");
            "An error occurred while deleting the scheduled message.".to_string()
        }
    }
}

fn list(store: &EntryStore, tz: Tz) -> String {
    let entries = match store.list_all() {
        Ok(entries) => entries,
        Err(e) => {
            error!("failed to list scheduled messages: {e}");
            return "An error occurred while listing the scheduled messages.".to_string();
        }
    };
    if entries.is_empty() {
        return "No scheduled messages found.".to_string();
    }
    let lines: Vec<String> = entries
        .iter()
        .map(|e| {
            format!(
                "{}: {} ({}) - {}",
                e.id,
                e.content,
                time::render_local(e.due_at, tz),
                e.created_by
            )
        })
        .collect();
    format!("Scheduled messages:\n{}", lines.join("\n"))
}
