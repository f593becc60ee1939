//! REPE message codec and stream framing.
//!
//! Every REPE message is a fixed 48-byte little-endian header followed by
//! `query_length` bytes of query and `body_length` bytes of body:
//! - `length` (8B) covers header + query + body and comes first, so a
//!   stream can be framed from the first 8 bytes
//! - `spec` (2B) is the magic 0x1507, checked before anything else
//! - query and body are opaque, tagged only by their format ids
//!
//! Transports, payload formats, and method dispatch live outside this crate.

#[cfg(feature = "async")]
pub mod codec;
pub mod error;
pub mod error_code;
pub mod format;
pub mod framer;
pub mod header;
pub mod message;
pub mod reader;
pub mod response;
pub mod writer;

#[cfg(feature = "async")]
pub use codec::RepeCodec;
pub use error::{RepeError, Result};
pub use error_code::{ErrorCode, APPLICATION_ERROR_START};
pub use format::{body_format, query_format, FormatClass, APPLICATION_FORMAT_START};
pub use framer::{
    decode_frame, finish_frames, FramerConfig, FramerState, MessageFramer,
    DEFAULT_MAX_MESSAGE_LENGTH,
};
pub use header::{Header, Prefix, HEADER_SIZE, PREFIX_SIZE, REPE_VERSION, SPEC_MAGIC};
pub use message::Message;
pub use reader::MessageReader;
pub use response::{make_error_response, ErrorResponder};
pub use writer::MessageWriter;
