use crate::error_code::ErrorCode;

/// Errors that can occur while encoding, decoding, or framing REPE messages.
#[derive(Debug, thiserror::Error)]
pub enum RepeError {
    /// Fewer than 48 bytes were supplied to the header decoder.
    #[error("malformed header ({len} bytes, need 48)")]
    MalformedHeader { len: usize },

    /// The header does not carry the REPE spec magic.
    #[error("invalid spec magic 0x{found:04x} (expected 0x1507)")]
    InvalidSpec { found: u16 },

    /// The header carries a protocol version this endpoint does not speak.
    #[error("unsupported REPE version {found} (supported {supported})")]
    VersionMismatch { found: u8, supported: u8 },

    /// The notify flag is neither 0 nor 1.
    #[error("invalid notify flag {found} (expected 0 or 1)")]
    InvalidNotify { found: u8 },

    /// A declared length disagrees with the bytes it describes.
    #[error("{field} mismatch (declared {declared}, actual {actual})")]
    LengthMismatch {
        field: &'static str,
        declared: u64,
        actual: u64,
    },

    /// A declared message length exceeds the configured ceiling.
    #[error("message too large ({length} bytes, max {max})")]
    ResourceLimitExceeded { length: u64, max: u64 },

    /// The stream ended before a complete message arrived.
    #[error("stream truncated ({buffered} bytes buffered, expected {expected})")]
    Truncated { buffered: usize, expected: u64 },

    /// The framer previously failed and has not been reset.
    #[error("stream desynchronized after a framing failure")]
    Desynchronized,

    /// The connection was closed between messages.
    #[error("connection closed")]
    ConnectionClosed,

    /// An I/O error occurred while reading or writing messages.
    #[error("REPE I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RepeError {
    /// The wire error code a peer should receive for this failure.
    ///
    /// Framing and I/O failures never reach the wire and return `None`.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            RepeError::VersionMismatch { .. } => Some(ErrorCode::VersionMismatch),
            RepeError::InvalidSpec { .. }
            | RepeError::InvalidNotify { .. }
            | RepeError::LengthMismatch { .. } => Some(ErrorCode::InvalidHeader),
            RepeError::MalformedHeader { .. } => Some(ErrorCode::ParseError),
            RepeError::ResourceLimitExceeded { .. }
            | RepeError::Truncated { .. }
            | RepeError::Desynchronized
            | RepeError::ConnectionClosed
            | RepeError::Io(_) => None,
        }
    }

    /// Whether the failure leaves a byte stream unusable.
    ///
    /// Fatal errors must be escalated to the transport so it can close the
    /// connection. Non-fatal errors affect a single, correctly delimited message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RepeError::MalformedHeader { .. }
                | RepeError::InvalidSpec { .. }
                | RepeError::LengthMismatch { .. }
                | RepeError::ResourceLimitExceeded { .. }
                | RepeError::Truncated { .. }
                | RepeError::Desynchronized
                | RepeError::ConnectionClosed
                | RepeError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RepeError>;
