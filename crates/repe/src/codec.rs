//! `tokio_util::codec` adapter for async transports.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{RepeError, Result};
use crate::framer::{decode_frame, finish_frames, FramerConfig, FramerState};
use crate::message::Message;

/// Frames REPE messages on an async byte stream.
///
/// Decoding yields raw message bytes so a failed [`Message::decode`] can
/// still be answered through [`ErrorResponder::for_frame`](crate::ErrorResponder::for_frame).
#[derive(Debug, Default)]
pub struct RepeCodec {
    state: FramerState,
    config: FramerConfig,
}

impl RepeCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FramerConfig) -> Self {
        Self {
            state: FramerState::AwaitingPrefix,
            config,
        }
    }

    pub fn config(&self) -> &FramerConfig {
        &self.config
    }
}

impl Decoder for RepeCodec {
    type Item = Bytes;
    type Error = RepeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        decode_frame(src, &mut self.state, &self.config)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        finish_frames(src, &mut self.state)?;
        Ok(None)
    }
}

impl Encoder<&Message> for RepeCodec {
    type Error = RepeError;

    fn encode(&mut self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        let length = message.header().length;
        if length > self.config.max_message_length {
            return Err(RepeError::ResourceLimitExceeded {
                length,
                max: self.config.max_message_length,
            });
        }
        message.encode(dst);
        Ok(())
    }
}

impl Encoder<Message> for RepeCodec {
    type Error = RepeError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<()> {
        Encoder::<&Message>::encode(self, &message, dst)
    }
}
