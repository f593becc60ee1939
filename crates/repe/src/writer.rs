use std::io::{ErrorKind, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{RepeError, Result};
use crate::framer::FramerConfig;
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes REPE messages to any `Write` stream.
///
/// Encoded messages are queued and drained in order. A `WouldBlock` from a
/// non-blocking stream surfaces as [`RepeError::Io`] with the unwritten tail
/// still queued; call [`flush`](Self::flush) once the stream is writable.
pub struct MessageWriter<T> {
    inner: T,
    pending: BytesMut,
    config: FramerConfig,
}

impl<T: Write> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FramerConfig::default())
    }

    pub fn with_config(inner: T, config: FramerConfig) -> Self {
        Self {
            inner,
            pending: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Queue `message` behind any pending bytes and drain the queue.
    ///
    /// Messages over the configured ceiling are rejected before anything is
    /// queued, since the peer's framer would reject them anyway.
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        let length = message.header().length;
        if length > self.config.max_message_length {
            return Err(RepeError::ResourceLimitExceeded {
                length,
                max: self.config.max_message_length,
            });
        }

        self.enqueue(message);
        self.flush()
    }

    /// Build and send a request with raw-binary formats.
    pub fn send(
        &mut self,
        id: u64,
        query: impl Into<Bytes>,
        body: impl Into<Bytes>,
    ) -> Result<()> {
        self.write_message(&Message::request(id, query, body))
    }

    /// Drain queued bytes, then flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        self.drain()?;
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(RepeError::Io(err)),
            }
        }
    }

    /// Number of encoded bytes not yet accepted by the stream.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn enqueue(&mut self, message: &Message) {
        let header = message.header();
        self.pending.reserve(message.wire_size());
        header.encode(&mut self.pending);
        self.pending.put_slice(message.query());
        // body_length == 0 leaves the body section off the wire entirely.
        if header.body_length > 0 {
            self.pending.put_slice(message.body());
        }
        trace!(
            id = header.id,
            length = header.length,
            queued = self.pending.len(),
            "queued REPE message"
        );
    }

    fn drain(&mut self) -> Result<()> {
        while !self.pending.is_empty() {
            match self.inner.write(&self.pending) {
                Ok(0) => return Err(RepeError::ConnectionClosed),
                Ok(n) => self.pending.advance(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(RepeError::Io(err)),
            }
        }
        Ok(())
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream, dropping queued bytes.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the message length ceiling for subsequent writes.
    pub fn set_max_message_length(&mut self, max_message_length: u64) {
        self.config.max_message_length = max_message_length;
    }

    pub fn config(&self) -> &FramerConfig {
        &self.config
    }
}
