//! Wire error codes carried in the `ec` header field.
//!
//! Codes 0-4095 are reserved by the protocol; 0-7 are currently assigned.
//! Codes 4096 and above belong to applications and are opaque to this crate.

use std::fmt;

/// First application-defined error code.
pub const APPLICATION_ERROR_START: u32 = 4096;

/// Assigned reserved codes, in wire order.
const RESERVED_ERROR_CODES: &[(u32, &str)] = &[
    (0, "OK"),
    (1, "VersionMismatch"),
    (2, "InvalidHeader"),
    (3, "InvalidQuery"),
    (4, "InvalidBody"),
    (5, "ParseError"),
    (6, "MethodNotFound"),
    (7, "Timeout"),
];

/// A REPE error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    /// No error.
    #[default]
    Ok,
    /// The request carried an unsupported protocol version.
    VersionMismatch,
    /// The header failed structural or semantic checks.
    InvalidHeader,
    /// The query layer rejected the query bytes.
    InvalidQuery,
    /// The body layer rejected the body bytes.
    InvalidBody,
    /// Bytes were malformed during decode.
    ParseError,
    /// The referenced operation does not exist.
    MethodNotFound,
    /// The operation exceeded its deadline.
    Timeout,
    /// A reserved code (8-4095) with no assigned meaning yet.
    Reserved(u32),
    /// An application-defined code (4096 and above).
    Application(u32),
}

impl ErrorCode {
    /// Numeric value written to the `ec` field.
    pub fn as_u32(self) -> u32 {
        match self {
            ErrorCode::Ok => 0,
            ErrorCode::VersionMismatch => 1,
            ErrorCode::InvalidHeader => 2,
            ErrorCode::InvalidQuery => 3,
            ErrorCode::InvalidBody => 4,
            ErrorCode::ParseError => 5,
            ErrorCode::MethodNotFound => 6,
            ErrorCode::Timeout => 7,
            ErrorCode::Reserved(code) | ErrorCode::Application(code) => code,
        }
    }

    /// Returns a human-readable name for the code.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Reserved(_) => "RESERVED",
            ErrorCode::Application(_) => "APPLICATION",
            assigned => RESERVED_ERROR_CODES
                .iter()
                .find(|(code, _)| *code == assigned.as_u32())
                .map(|(_, name)| *name)
                .unwrap_or("RESERVED"),
        }
    }

    /// Returns true for `Ok`.
    pub fn is_ok(self) -> bool {
        self == ErrorCode::Ok
    }

    /// Returns true if the code is in the protocol-reserved range.
    pub fn is_reserved(self) -> bool {
        self.as_u32() < APPLICATION_ERROR_START
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        match code {
            0 => ErrorCode::Ok,
            1 => ErrorCode::VersionMismatch,
            2 => ErrorCode::InvalidHeader,
            3 => ErrorCode::InvalidQuery,
            4 => ErrorCode::InvalidBody,
            5 => ErrorCode::ParseError,
            6 => ErrorCode::MethodNotFound,
            7 => ErrorCode::Timeout,
            8..APPLICATION_ERROR_START => ErrorCode::Reserved(code),
            _ => ErrorCode::Application(code),
        }
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.as_u32()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u32())
    }
}
