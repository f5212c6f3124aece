//! `herald-core` — shared configuration, canonical-timezone handling and
//! top-level error type for the herald workspace.

pub mod config;
pub mod error;
pub mod time;

pub use config::HeraldConfig;
pub use error::{HeraldError, Result};
