//! Link error types.
//!
//! [`LinkError`] is the central error type for the crate. Encode-side
//! variants surface from the framing functions; decode-side variants are
//! consumed at the dispatch boundary, where a bad inbound frame is logged
//! and dropped without touching the connection.

/// Faults raised by the wire layer and the link channels.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Payload byte length does not fit in the 8-digit decimal header.
    #[error("payload of {len} bytes exceeds the 8-digit frame header")]
    FrameOverflow {
        /// Actual payload byte length.
        len: usize,
    },

    /// Inbound frame is shorter than the 8-character header.
    #[error("frame of {len} chars is shorter than the 8-char header")]
    FrameTruncated {
        /// Actual frame character length.
        len: usize,
    },

    /// Frame header is not an 8-digit decimal number.
    #[error("invalid frame header: {0:?}")]
    FrameHeader(String),

    /// Declared payload length disagrees with the actual payload bytes.
    #[error("frame declares {declared} payload bytes but carries {actual}")]
    FrameLengthMismatch {
        /// Byte length declared by the header.
        declared: usize,
        /// Byte length of the payload actually carried.
        actual: usize,
    },

    /// Payload is not valid JSON, or serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Inbound message is valid JSON but not an object with a `type` field.
    #[error("message has no usable `type` discriminator")]
    MissingType,

    /// The transport task is gone; the link is no longer usable.
    #[error("transport channel closed")]
    ChannelClosed,
}
