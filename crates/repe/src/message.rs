use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{RepeError, Result};
use crate::error_code::ErrorCode;
use crate::format::body_format;
use crate::header::{Header, HEADER_SIZE, REPE_VERSION};

/// A validated REPE message: header plus query and body bytes.
///
/// Query and body are opaque; their declared formats are carried in the
/// header for whatever layer consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    header: Header,
    query: Bytes,
    body: Bytes,
}

impl Message {
    /// Assemble a message, enforcing the length invariant.
    ///
    /// Fails with [`RepeError::LengthMismatch`] unless `query_length`,
    /// `body_length`, and `length` all agree with the supplied bytes.
    pub fn build(header: Header, query: impl Into<Bytes>, body: impl Into<Bytes>) -> Result<Self> {
        let query = query.into();
        let body = body.into();

        check_field("query_length", header.query_length, query.len())?;
        check_field("body_length", header.body_length, body.len())?;
        let actual = (HEADER_SIZE + query.len() + body.len()) as u64;
        if header.length != actual {
            return Err(RepeError::LengthMismatch {
                field: "length",
                declared: header.length,
                actual,
            });
        }

        Ok(Self {
            header,
            query,
            body,
        })
    }

    /// Decode and validate one complete message against [`REPE_VERSION`].
    ///
    /// `frame` must hold exactly one message, as produced by
    /// [`MessageFramer`](crate::MessageFramer). Query and body are zero-copy
    /// slices of `frame`.
    pub fn decode(frame: Bytes) -> Result<Self> {
        Self::decode_version(frame, REPE_VERSION)
    }

    /// Decode and validate one complete message against `supported`.
    pub fn decode_version(frame: Bytes, supported: u8) -> Result<Self> {
        let header = Header::decode(&frame)?;
        header.validate_version(supported)?;
        header.check_lengths()?;
        check_field("length", header.length, frame.len())?;

        let query_end = HEADER_SIZE + header.query_length as usize;
        let query = frame.slice(HEADER_SIZE..query_end);
        let body = frame.slice(query_end..);

        Ok(Self {
            header,
            query,
            body,
        })
    }

    /// Create a request for `id` with raw-binary query and body formats.
    pub fn request(id: u64, query: impl Into<Bytes>, body: impl Into<Bytes>) -> Self {
        let query = query.into();
        let body = body.into();
        let mut header = Header::new(id);
        header.set_lengths(query.len() as u64, body.len() as u64);
        Self {
            header,
            query,
            body,
        }
    }

    /// Create a notify request; the receiver sends no response.
    pub fn notify(id: u64, query: impl Into<Bytes>, body: impl Into<Bytes>) -> Self {
        let mut message = Self::request(id, query, body);
        message.header.notify = 1;
        message
    }

    /// Create a successful response to `request`.
    ///
    /// Returns `None` when `request` is a notify.
    pub fn response(request: &Header, body: impl Into<Bytes>, body_format: u16) -> Option<Self> {
        if request.is_notify() {
            return None;
        }
        let mut message = Self::request(request.id, Bytes::new(), body);
        message.header.body_format = body_format;
        Some(message)
    }

    /// Set the query format tag.
    pub fn with_query_format(mut self, format: u16) -> Self {
        self.header.query_format = format;
        self
    }

    /// Set the body format tag.
    pub fn with_body_format(mut self, format: u16) -> Self {
        self.header.body_format = format;
        self
    }

    /// Set the error code.
    pub fn with_error_code(mut self, ec: ErrorCode) -> Self {
        self.header.ec = ec.as_u32();
        self
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn id(&self) -> u64 {
        self.header.id
    }

    pub fn query(&self) -> &[u8] {
        &self.query
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn query_format(&self) -> u16 {
        self.header.query_format
    }

    pub fn body_format(&self) -> u16 {
        self.header.body_format
    }

    /// Returns true if no response is expected.
    pub fn is_notify(&self) -> bool {
        self.header.is_notify()
    }

    /// Returns true if the header carries a non-zero error code.
    pub fn is_error(&self) -> bool {
        self.header.ec != 0
    }

    pub fn error_code(&self) -> ErrorCode {
        self.header.error_code()
    }

    /// The UTF-8 error text of an error response, if present.
    pub fn error_message(&self) -> Option<&str> {
        if !self.is_error() || self.body.is_empty() || self.header.body_format != body_format::UTF8
        {
            return None;
        }
        std::str::from_utf8(&self.body).ok()
    }

    /// Split into header, query, and body.
    pub fn into_parts(self) -> (Header, Bytes, Bytes) {
        (self.header, self.query, self.body)
    }

    /// The total wire size (header + query + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.query.len() + self.body.len()
    }

    /// Encode the message into `dst`. An empty body contributes no bytes.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_size());
        self.header.encode(dst);
        dst.put_slice(&self.query);
        if !self.body.is_empty() {
            dst.put_slice(&self.body);
        }
    }

    /// Encode the message into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut buf);
        buf.freeze()
    }
}

fn check_field(field: &'static str, declared: u64, actual: usize) -> Result<()> {
    if declared != actual as u64 {
        return Err(RepeError::LengthMismatch {
            field,
            declared,
            actual: actual as u64,
        });
    }
    Ok(())
}
