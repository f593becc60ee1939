use std::io::{ErrorKind, Read};

use bytes::Bytes;

use crate::error::{RepeError, Result};
use crate::framer::{FramerConfig, MessageFramer};
use crate::message::Message;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete REPE messages from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete messages.
pub struct MessageReader<T> {
    inner: T,
    framer: MessageFramer,
}

impl<T: Read> MessageReader<T> {
    /// Create a new message reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FramerConfig::default())
    }

    /// Create a new message reader with explicit configuration.
    pub fn with_config(inner: T, config: FramerConfig) -> Self {
        Self {
            inner,
            framer: MessageFramer::with_config(config),
        }
    }

    /// Read the next complete message as raw bytes (blocking).
    ///
    /// Returns `Err(RepeError::ConnectionClosed)` on EOF at a message
    /// boundary and `Err(RepeError::Truncated)` on EOF mid-message.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.framer.next_frame()? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(RepeError::Io(err)),
            };

            if read == 0 {
                self.framer.finish()?;
                return Err(RepeError::ConnectionClosed);
            }

            self.framer.feed(&chunk[..read]);
        }
    }

    /// Read and validate the next message (blocking).
    ///
    /// A validation failure consumes only the offending message; the
    /// stream stays usable. Use [`read_frame`](Self::read_frame) when the
    /// raw bytes are needed to answer the failure.
    pub fn read_message(&mut self) -> Result<Message> {
        let frame = self.read_frame()?;
        Message::decode_version(frame, self.framer.config().supported_version)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the message length ceiling for subsequent reads.
    pub fn set_max_message_length(&mut self, max_message_length: u64) {
        self.framer.set_max_message_length(max_message_length);
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FramerConfig {
        self.framer.config()
    }
}
