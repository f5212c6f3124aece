use chrono::{DateTime, Utc};

use crate::error::{Result, SchedulerError};

/// How (and whether) an entry repeats after delivery.
///
/// One-shot is an explicit variant so dispatch logic is a total match —
/// there is no "empty string means no recurrence" sentinel anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    /// Deliver once, then delete the entry.
    Oneshot,
    /// Every 24 hours.
    Daily,
    /// Every calendar month; day-of-month clamped to the last valid day.
    Monthly,
    /// Every calendar year.
    Yearly,
    /// Every `minutes` minutes. Must be positive.
    Custom { minutes: u32 },
}

impl Recurrence {
    /// Persisted kind string for the `recurrence` column.
    pub fn kind(&self) -> &'static str {
        match self {
            Recurrence::Oneshot => "oneshot",
            Recurrence::Daily => "daily",
            Recurrence::Monthly => "monthly",
            Recurrence::Yearly => "yearly",
            Recurrence::Custom { .. } => "custom",
        }
    }

    /// Minutes value for the `custom_minutes` column (0 for named kinds).
    pub fn custom_minutes(&self) -> u32 {
        match self {
            Recurrence::Custom { minutes } => *minutes,
            _ => 0,
        }
    }

    /// Rebuild from the persisted pair, or from front-end input.
    ///
    /// `once` is accepted as an alias for `oneshot`. `custom` requires a
    /// positive minutes value.
    pub fn from_parts(kind: &str, minutes: u32) -> Result<Self> {
        match kind {
            "oneshot" | "once" => Ok(Recurrence::Oneshot),
            "daily" => Ok(Recurrence::Daily),
            "monthly" => Ok(Recurrence::Monthly),
            "yearly" => Ok(Recurrence::Yearly),
            "custom" => {
                if minutes == 0 {
                    Err(SchedulerError::Validation(
                        "custom interval requires a positive number of minutes".to_string(),
                    ))
                } else {
                    Ok(Recurrence::Custom { minutes })
                }
            }
            other => Err(SchedulerError::Validation(format!(
                "unknown recurrence '{other}' (expected once, daily, monthly, yearly or custom)"
            ))),
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recurrence::Custom { minutes } => write!(f, "custom ({minutes}m)"),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// A persisted schedule entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEntry {
    /// UUID v4 string — primary key, assigned by the store.
    pub id: String,
    /// Instant at which delivery should occur. Stored and compared in UTC;
    /// only ever moves forward.
    pub due_at: DateTime<Utc>,
    /// Non-empty text payload, delivered verbatim.
    pub content: String,
    /// Opaque delivery target; validated only by the gateway.
    pub channel_id: String,
    pub recurrence: Recurrence,
    /// Requester label (chat username or "API").
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`EntryStore::insert`](crate::store::EntryStore::insert).
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub due_at: DateTime<Utc>,
    pub content: String,
    pub channel_id: String,
    pub recurrence: Recurrence,
    pub created_by: String,
}

/// Partial patch for [`EntryStore::update`](crate::store::EntryStore::update).
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub due_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
    pub channel_id: Option<String>,
    pub recurrence: Option<Recurrence>,
}
