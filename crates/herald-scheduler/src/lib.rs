//! `herald-scheduler` — the recurrence-scheduling core.
//!
//! # Overview
//!
//! Entries are persisted to a SQLite `entries` table. The [`sweep::SweepEngine`]
//! polls the store on a fixed tick, delivers every due entry through the
//! injected [`herald_channels::Gateway`], then deletes one-shots and advances
//! recurring entries via [`recurrence::next_occurrence`].
//!
//! # Recurrence variants
//!
//! | Variant   | Behaviour                                            |
//! |-----------|------------------------------------------------------|
//! | `Oneshot` | Delivered once, then deleted                         |
//! | `Daily`   | Advances 24 hours                                    |
//! | `Monthly` | Advances one calendar month, day clamped             |
//! | `Yearly`  | Advances one calendar year, Feb 29 clamped           |
//! | `Custom`  | Advances a fixed positive number of minutes          |
//!
//! Delivery is at-least-once: a successful send followed by a failed store
//! mutation re-delivers on the next sweep. This window is accepted by design.

pub mod db;
pub mod error;
pub mod recurrence;
pub mod store;
pub mod sweep;
pub mod types;

pub use error::{Result, SchedulerError};
pub use recurrence::next_occurrence;
pub use store::EntryStore;
pub use sweep::SweepEngine;
pub use types::{EntryPatch, NewEntry, Recurrence, ScheduledEntry};
