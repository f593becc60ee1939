use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::error::{RepeError, Result};
use crate::header::{peek_length, peek_prefix, Header, Prefix, HEADER_SIZE, REPE_VERSION};

/// Default maximum message length (header + query + body): 16 MiB.
pub const DEFAULT_MAX_MESSAGE_LENGTH: u64 = 16 * 1024 * 1024;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Configuration shared by the framer, reader, writer, and async codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerConfig {
    /// Largest declared `length` accepted. Default: 16 MiB.
    pub max_message_length: u64,
    /// Protocol version accepted by [`Message::decode_version`](crate::Message::decode_version).
    pub supported_version: u8,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            supported_version: REPE_VERSION,
        }
    }
}

/// Framing progress for the message at the front of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramerState {
    /// Fewer than [`PREFIX_SIZE`](crate::PREFIX_SIZE) bytes are known to be valid.
    #[default]
    AwaitingPrefix,
    /// Prefix accepted; waiting for the rest of the 48-byte header.
    AwaitingFullHeader { length: usize },
    /// Header accepted; waiting for `length` bytes in total.
    AwaitingQueryAndBody { length: usize },
    /// A message was just emitted. The next call starts a new message.
    Complete,
    /// A constraint was violated. Buffered bytes were discarded.
    Failed,
}

/// Advance framing over `src` by as much as the buffered bytes allow.
///
/// Returns `Ok(None)` when more bytes are needed and `Ok(Some(frame))` with
/// exactly one message (header + query + body) once it is complete. The
/// emitted bytes are consumed from `src`; anything after them stays buffered.
///
/// Any error moves `state` to [`FramerState::Failed`] and clears `src`.
pub fn decode_frame(
    src: &mut BytesMut,
    state: &mut FramerState,
    config: &FramerConfig,
) -> Result<Option<Bytes>> {
    loop {
        match *state {
            FramerState::Failed => {
                src.clear();
                return Err(RepeError::Desynchronized);
            }
            FramerState::Complete => *state = FramerState::AwaitingPrefix,
            FramerState::AwaitingPrefix => {
                let Some(declared) = peek_length(src) else {
                    return Ok(None);
                };
                if declared > config.max_message_length {
                    return fail(
                        src,
                        state,
                        RepeError::ResourceLimitExceeded {
                            length: declared,
                            max: config.max_message_length,
                        },
                    );
                }
                let length = match usize::try_from(declared) {
                    Ok(length) if length >= HEADER_SIZE => length,
                    Ok(length) => {
                        return fail(src, state, RepeError::MalformedHeader { len: length })
                    }
                    Err(_) => {
                        return fail(
                            src,
                            state,
                            RepeError::ResourceLimitExceeded {
                                length: declared,
                                max: config.max_message_length,
                            },
                        )
                    }
                };

                let Some(prefix) = peek_prefix(src) else {
                    return Ok(None);
                };
                if !prefix.is_repe() {
                    return fail(src, state, RepeError::InvalidSpec { found: prefix.spec });
                }
                trace!(length, "accepted message prefix");
                *state = FramerState::AwaitingFullHeader { length };
            }
            FramerState::AwaitingFullHeader { length } => {
                if src.len() < HEADER_SIZE {
                    return Ok(None);
                }
                let header = Header::decode(src)?;
                match header.expected_length() {
                    Some(expected) if expected == length as u64 => {}
                    other => {
                        return fail(
                            src,
                            state,
                            RepeError::LengthMismatch {
                                field: "length",
                                declared: length as u64,
                                actual: other.unwrap_or(u64::MAX),
                            },
                        )
                    }
                }
                if src.len() < length {
                    src.reserve(length - src.len());
                }
                *state = FramerState::AwaitingQueryAndBody { length };
            }
            FramerState::AwaitingQueryAndBody { length } => {
                if src.len() < length {
                    return Ok(None);
                }
                let frame = src.split_to(length).freeze();
                debug!(length, remaining = src.len(), "framed REPE message");
                *state = FramerState::Complete;
                return Ok(Some(frame));
            }
        }
    }
}

/// Report the end of the stream.
///
/// Returns [`RepeError::Truncated`] if a message was left half-delivered and
/// [`RepeError::Desynchronized`] if framing had already failed.
pub fn finish_frames(src: &mut BytesMut, state: &mut FramerState) -> Result<()> {
    if *state == FramerState::Failed {
        src.clear();
        return Err(RepeError::Desynchronized);
    }
    if src.is_empty() {
        return Ok(());
    }
    let expected = match *state {
        FramerState::AwaitingFullHeader { length }
        | FramerState::AwaitingQueryAndBody { length } => length as u64,
        _ => peek_length(src).unwrap_or(HEADER_SIZE as u64),
    };
    let buffered = src.len();
    fail(src, state, RepeError::Truncated { buffered, expected })
}

fn fail<T>(src: &mut BytesMut, state: &mut FramerState, err: RepeError) -> Result<T> {
    warn!(error = %err, discarded = src.len(), "REPE framing failed");
    src.clear();
    *state = FramerState::Failed;
    Err(err)
}

/// Assembles complete messages from an arbitrarily chunked byte stream.
///
/// One framer serves one stream. It never blocks: feed it whatever the
/// transport delivered and pull frames until it asks for more bytes.
#[derive(Debug)]
pub struct MessageFramer {
    buf: BytesMut,
    state: FramerState,
    config: FramerConfig,
}

impl MessageFramer {
    /// Create a framer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FramerConfig::default())
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(config: FramerConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            state: FramerState::AwaitingPrefix,
            config,
        }
    }

    /// Append bytes received from the transport.
    ///
    /// Bytes fed to a failed framer are dropped until [`reset`](Self::reset).
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.state == FramerState::Failed {
            trace!(dropped = bytes.len(), "dropping bytes fed to failed framer");
            return;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Pull the next complete message, or `Ok(None)` if more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        decode_frame(&mut self.buf, &mut self.state, &self.config)
    }

    /// Signal end of stream; fails if a partial message is buffered.
    pub fn finish(&mut self) -> Result<()> {
        finish_frames(&mut self.buf, &mut self.state)
    }

    /// Discard buffered bytes and start over at a message boundary.
    ///
    /// Only meaningful when the transport guarantees the next byte fed
    /// begins a new message (e.g. datagram transports).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = FramerState::AwaitingPrefix;
    }

    /// `length` and `spec` of the buffered message, once 10 bytes are present.
    pub fn peek_prefix(&self) -> Option<Prefix> {
        peek_prefix(&self.buf)
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    pub fn is_failed(&self) -> bool {
        self.state == FramerState::Failed
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Update the message length ceiling for subsequent framing.
    pub fn set_max_message_length(&mut self, max_message_length: u64) {
        self.config.max_message_length = max_message_length;
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new()
    }
}
