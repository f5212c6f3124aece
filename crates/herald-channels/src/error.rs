use thiserror::Error;

/// Errors that can occur while delivering a message to a channel.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The target channel does not exist on the remote service.
    #[error("Channel not found: {channel_id}")]
    ChannelNotFound { channel_id: String },

    /// The message could not be delivered to the remote endpoint.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The send exceeded its allowed time budget.
    #[error("Send timed out after {ms}ms")]
    Timeout { ms: u64 },
}
