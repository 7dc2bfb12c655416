//! Relay and client error types.
//!
//! [`RelayError`] is the server-side error type. Each variant maps to a
//! numeric code carried in the `ERROR` frames sent back to the offending
//! tab. [`ClientError`] covers the tab side.

/// Server-side error enum.
///
/// # Error Codes
///
/// | Code | Variant            |
/// |------|--------------------|
/// | 1001 | `MalformedMessage` |
/// | 1002 | `ReservedType`     |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Inbound frame is not a valid envelope.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A tab tried to publish a tag reserved for the relay.
    #[error("reserved message type: {0}")]
    ReservedType(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u16 {
        match self {
            Self::MalformedMessage(_) => 1001,
            Self::ReservedType(_) => 1002,
        }
    }
}

/// Tab-side error enum.
///
/// Sending while unconnected and receiving an unregistered type are not
/// errors; they are silent no-ops.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The runtime cannot provide the shared relay channel.
    #[error("shared relay channel unsupported: {0}")]
    UnsupportedCapability(String),

    /// The underlying transport failed to open or broke.
    #[error("transport error: {0}")]
    Transport(String),

    /// The channel closed before the relay assigned an identifier.
    #[error("relay channel closed before connection was assigned")]
    ChannelClosed,

    /// Payload could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_per_variant() {
        assert_eq!(RelayError::MalformedMessage("x".to_string()).error_code(), 1001);
        assert_eq!(RelayError::ReservedType("CONNECTION".to_string()).error_code(), 1002);
    }

    #[test]
    fn messages_name_the_cause() {
        let err = RelayError::ReservedType("ERROR".to_string());
        assert_eq!(err.to_string(), "reserved message type: ERROR");
    }
}
