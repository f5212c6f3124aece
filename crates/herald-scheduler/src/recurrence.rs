use chrono::{DateTime, Duration, Months, Utc};

use crate::{
    error::{Result, SchedulerError},
    types::Recurrence,
};

/// Compute the instant of the next occurrence strictly after `current`.
///
/// Pure function, no I/O. Month and year steps are calendar-aware: the
/// day-of-month is clamped to the last valid day of the target month
/// (2024-01-31 + 1 month = 2024-02-29; 2024-02-29 + 1 year = 2025-02-28).
/// The daily step is a flat 24 hours in UTC.
///
/// `Oneshot` has no next occurrence; callers delete such entries after
/// delivery instead of asking for one.
pub fn next_occurrence(current: DateTime<Utc>, recurrence: &Recurrence) -> Result<DateTime<Utc>> {
    let next = match recurrence {
        Recurrence::Oneshot => {
            return Err(SchedulerError::InvalidRecurrence(
                "one-shot entries have no next occurrence".to_string(),
            ))
        }
        Recurrence::Yearly => current.checked_add_months(Months::new(12)),
        Recurrence::Monthly => current.checked_add_months(Months::new(1)),
        Recurrence::Daily => current.checked_add_signed(Duration::hours(24)),
        Recurrence::Custom { minutes } => {
            if *minutes == 0 {
                return Err(SchedulerError::InvalidRecurrence(
                    "custom interval must be a positive number of minutes".to_string(),
                ));
            }
            current.checked_add_signed(Duration::minutes(i64::from(*minutes)))
        }
    };

    next.ok_or_else(|| {
        SchedulerError::InvalidRecurrence("next occurrence is out of range".to_string())
    })
}
