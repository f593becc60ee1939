//! Error responses.
//!
//! Notify requests never receive a response, error or otherwise. Every other
//! failed request gets a response carrying its `id`, the error code, and an
//! optional UTF-8 message as the body.

use bytes::Bytes;
use tracing::debug;

use crate::error::RepeError;
use crate::error_code::ErrorCode;
use crate::format::{body_format, query_format};
use crate::header::Header;
use crate::message::Message;

/// Builds error responses for failed requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorResponder {
    echo_query: bool,
}

impl ErrorResponder {
    /// Create a responder that omits the request query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo the original query (and its format) back in error responses.
    pub fn echo_query(mut self, echo: bool) -> Self {
        self.echo_query = echo;
        self
    }

    /// Build an error response from the request header alone.
    ///
    /// The query is never echoed since only the header is available.
    pub fn for_header(
        &self,
        original: &Header,
        ec: ErrorCode,
        message: Option<&str>,
    ) -> Option<Message> {
        build(original, ec, message, None)
    }

    /// Build an error response to a decoded request.
    pub fn for_message(
        &self,
        original: &Message,
        ec: ErrorCode,
        message: Option<&str>,
    ) -> Option<Message> {
        let query = self
            .echo_query
            .then(|| Bytes::copy_from_slice(original.query()));
        build(original.header(), ec, message, query)
    }

    /// Build the response owed for a decode failure of `original`.
    ///
    /// Returns `None` for notify requests and for failures that never reach
    /// the wire (framing and I/O errors).
    pub fn for_error(&self, original: &Header, err: &RepeError) -> Option<Message> {
        let Some(ec) = err.error_code() else {
            debug!(id = original.id, error = %err, "no error response for local failure");
            return None;
        };
        let text = err.to_string();
        self.for_header(original, ec, Some(&text))
    }

    /// Build the response owed for a frame that failed [`Message::decode`].
    ///
    /// Returns `None` if not even the header could be recovered, since
    /// there is no `id` to answer.
    pub fn for_frame(&self, frame: &[u8], err: &RepeError) -> Option<Message> {
        let header = Header::decode(frame).ok()?;
        self.for_error(&header, err)
    }
}

/// Build an error response for `original`, omitting the query.
///
/// Returns `None` when `original` is a notify request.
pub fn make_error_response(
    original: &Header,
    ec: ErrorCode,
    message: Option<&str>,
) -> Option<Message> {
    ErrorResponder::new().for_header(original, ec, message)
}

fn build(
    original: &Header,
    ec: ErrorCode,
    message: Option<&str>,
    query: Option<Bytes>,
) -> Option<Message> {
    if original.is_notify() {
        debug!(id = original.id, ec = ec.as_u32(), "suppressing error response to notify");
        return None;
    }

    let body = message
        .map(|text| Bytes::copy_from_slice(text.as_bytes()))
        .unwrap_or_default();
    let query_format = if query.is_some() {
        original.query_format
    } else {
        query_format::RAW_BINARY
    };

    let response = Message::request(original.id, query.unwrap_or_default(), body)
        .with_query_format(query_format)
        .with_body_format(body_format::UTF8)
        .with_error_code(ec);
    debug!(id = original.id, ec = ec.as_u32(), "built error response");
    Some(response)
}
