//! `herald-channels` — delivery gateway abstraction.
//!
//! The scheduler core talks to a [`Gateway`]: "send this text to this named
//! channel". [`HttpGateway`] is the production implementation, posting to a
//! channel service over HTTP. Tests inject their own mock.

pub mod error;
pub mod gateway;

pub use error::DeliveryError;
pub use gateway::{Gateway, HttpGateway};
