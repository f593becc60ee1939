use bytes::{Buf, BufMut, BytesMut};

use crate::error::{RepeError, Result};
use crate::error_code::ErrorCode;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 48;

/// Spec magic identifying a REPE header.
pub const SPEC_MAGIC: u16 = 0x1507;

/// Protocol version spoken by this crate.
pub const REPE_VERSION: u8 = 1;

/// Bytes needed to read `length` (8B) and `spec` (2B) from the front of a message.
pub const PREFIX_SIZE: usize = 10;

/// The fixed 48-byte REPE header.
///
/// Wire format (all fields little-endian, no padding):
/// ```text
/// ┌────────────┬──────────┬─────────┬────────┬────────────┬──────────┐
/// │ length 8B  │ spec 2B  │ ver 1B  │ ntf 1B │ reserved 4B│ id 8B    │
/// ├────────────┴──┬───────┴─────────┴──┬─────┴────────────┴──┬───────┤
/// │ query_len 8B  │ body_len 8B        │ qfmt 2B │ bfmt 2B   │ ec 4B │
/// └───────────────┴────────────────────┴─────────┴───────────┴───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Total bytes of header + query + body.
    pub length: u64,
    /// Spec magic; must be [`SPEC_MAGIC`].
    pub spec: u16,
    /// Protocol version.
    pub version: u8,
    /// 1 when the sender expects no response.
    pub notify: u8,
    /// Written as zero, ignored on read.
    pub reserved: u32,
    /// Request/response correlation id.
    pub id: u64,
    /// Byte length of the query section.
    pub query_length: u64,
    /// Byte length of the body section.
    pub body_length: u64,
    /// Format tag for the query bytes.
    pub query_format: u16,
    /// Format tag for the body bytes.
    pub body_format: u16,
    /// Error code; 0 means OK.
    pub ec: u32,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            length: HEADER_SIZE as u64,
            spec: SPEC_MAGIC,
            version: REPE_VERSION,
            notify: 0,
            reserved: 0,
            id: 0,
            query_length: 0,
            body_length: 0,
            query_format: 0,
            body_format: 0,
            ec: 0,
        }
    }
}

impl Header {
    /// Create a header for `id` with empty query and body.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Set query/body lengths and recompute `length`.
    ///
    /// `length` saturates at `u64::MAX`; such a header fails
    /// [`check_lengths`](Self::check_lengths).
    pub fn set_lengths(&mut self, query_length: u64, body_length: u64) {
        self.query_length = query_length;
        self.body_length = body_length;
        self.length = (HEADER_SIZE as u64)
            .saturating_add(query_length)
            .saturating_add(body_length);
    }

    /// The total length implied by the section lengths.
    ///
    /// Returns `None` if the sum overflows `u64`.
    pub fn expected_length(&self) -> Option<u64> {
        (HEADER_SIZE as u64)
            .checked_add(self.query_length)?
            .checked_add(self.body_length)
    }

    /// Returns true if the sender expects no response.
    pub fn is_notify(&self) -> bool {
        self.notify == 1
    }

    /// The `ec` field as an [`ErrorCode`].
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from(self.ec)
    }

    /// Encode the header into `dst`.
    ///
    /// `reserved` is always written as zero.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        self.put(dst);
    }

    /// Encode the header into a fixed 48-byte array.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        self.put(&mut &mut out[..]);
        out
    }

    fn put(&self, dst: &mut impl BufMut) {
        dst.put_u64_le(self.length);
        dst.put_u16_le(self.spec);
        dst.put_u8(self.version);
        dst.put_u8(self.notify);
        dst.put_u32_le(0);
        dst.put_u64_le(self.id);
        dst.put_u64_le(self.query_length);
        dst.put_u64_le(self.body_length);
        dst.put_u16_le(self.query_format);
        dst.put_u16_le(self.body_format);
        dst.put_u32_le(self.ec);
    }

    /// Decode a header from the first 48 bytes of `src`.
    ///
    /// Only the size is checked here; call [`Header::validate`] for the
    /// semantic checks.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < HEADER_SIZE {
            return Err(RepeError::MalformedHeader { len: src.len() });
        }

        let mut buf = &src[..HEADER_SIZE];
        let length = buf.get_u64_le();
        let spec = buf.get_u16_le();
        let version = buf.get_u8();
        let notify = buf.get_u8();
        let reserved = buf.get_u32_le();
        let id = buf.get_u64_le();
        let query_length = buf.get_u64_le();
        let body_length = buf.get_u64_le();
        let query_format = buf.get_u16_le();
        let body_format = buf.get_u16_le();
        let ec = buf.get_u32_le();

        Ok(Self {
            length,
            spec,
            version,
            notify,
            reserved,
            id,
            query_length,
            body_length,
            query_format,
            body_format,
            ec,
        })
    }

    /// Validate spec magic, version, and notify flag against [`REPE_VERSION`].
    pub fn validate(&self) -> Result<()> {
        self.validate_version(REPE_VERSION)
    }

    /// Validate spec magic, version, and notify flag against `supported`.
    ///
    /// The magic is checked first, then the version; nothing past the
    /// version is interpreted when either check fails.
    pub fn validate_version(&self, supported: u8) -> Result<()> {
        if self.spec != SPEC_MAGIC {
            return Err(RepeError::InvalidSpec { found: self.spec });
        }
        if self.version != supported {
            return Err(RepeError::VersionMismatch {
                found: self.version,
                supported,
            });
        }
        if self.notify > 1 {
            return Err(RepeError::InvalidNotify { found: self.notify });
        }
        Ok(())
    }

    /// Check `length == 48 + query_length + body_length`.
    pub fn check_lengths(&self) -> Result<()> {
        match self.expected_length() {
            Some(expected) if expected == self.length => Ok(()),
            Some(expected) => Err(RepeError::LengthMismatch {
                field: "length",
                declared: self.length,
                actual: expected,
            }),
            None => Err(RepeError::LengthMismatch {
                field: "length",
                declared: self.length,
                actual: u64::MAX,
            }),
        }
    }
}

/// The `length` and `spec` fields, readable before the full header arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    /// Declared total message length.
    pub length: u64,
    /// Spec magic.
    pub spec: u16,
}

impl Prefix {
    /// Returns true if the prefix carries the REPE spec magic.
    pub fn is_repe(&self) -> bool {
        self.spec == SPEC_MAGIC
    }
}

/// Read the declared `length` without consuming; needs 8 bytes.
pub fn peek_length(src: &[u8]) -> Option<u64> {
    let mut buf = src.get(..8)?;
    Some(buf.get_u64_le())
}

/// Read `length` and `spec` without consuming; needs [`PREFIX_SIZE`] bytes.
pub fn peek_prefix(src: &[u8]) -> Option<Prefix> {
    let mut buf = src.get(..PREFIX_SIZE)?;
    let length = buf.get_u64_le();
    let spec = buf.get_u16_le();
    Some(Prefix { length, spec })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn scenario_header() -> Header {
        Header {
            length: 60,
            spec: SPEC_MAGIC,
            version: 1,
            notify: 0,
            reserved: 0,
            id: 42,
            query_length: 4,
            body_length: 8,
            query_format: 0,
            body_format: 2,
            ec: 0,
        }
    }

    #[test]
    fn encoded_size_is_fixed() {
        let mut buf = BytesMut::new();
        scenario_header().encode(&mut buf);
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[..], &scenario_header().to_bytes()[..]);
    }

    #[test]
    fn field_offsets_are_exact() {
        let bytes = scenario_header().to_bytes();
        assert_eq!(&bytes[0..8], &60u64.to_le_bytes());
        assert_eq!(&bytes[8..10], &[0x07, 0x15]);
        assert_eq!(bytes[10], 1);
        assert_eq!(bytes[11], 0);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        assert_eq!(&bytes[16..24], &42u64.to_le_bytes());
        assert_eq!(&bytes[24..32], &4u64.to_le_bytes());
        assert_eq!(&bytes[32..40], &8u64.to_le_bytes());
        assert_eq!(&bytes[40..42], &[0, 0]);
        assert_eq!(&bytes[42..44], &[2, 0]);
        assert_eq!(&bytes[44..48], &[0, 0, 0, 0]);
    }

    #[test]
    fn id_is_little_endian() {
        let bytes = Header::new(1).to_bytes();
        assert_eq!(bytes[16], 0x01);
        assert!(bytes[17..24].iter().all(|b| *b == 0));
    }

    #[test]
    fn reserved_written_as_zero_and_ignored_on_read() {
        let mut header = scenario_header();
        header.reserved = 0xdead_beef;
        let mut bytes = header.to_bytes();
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);

        bytes[12..16].copy_from_slice(&0xffff_ffffu32.to_le_bytes());
        let decoded = Header::decode(&bytes).unwrap();
        assert!(decoded.validate().is_ok());
        assert_eq!(decoded.id, 42);
    }

    #[test]
    fn decode_short_input_is_malformed() {
        let bytes = scenario_header().to_bytes();
        let err = Header::decode(&bytes[..47]).unwrap_err();
        assert!(matches!(err, RepeError::MalformedHeader { len: 47 }));
    }

    #[test]
    fn validate_rejects_bad_magic_before_version() {
        let mut header = scenario_header();
        header.spec = 0x0715;
        header.version = 9;
        let err = header.validate().unwrap_err();
        assert!(matches!(err, RepeError::InvalidSpec { found: 0x0715 }));
        assert_eq!(err.error_code(), Some(ErrorCode::InvalidHeader));
    }

    #[test]
    fn validate_rejects_unsupported_version() {
        let mut header = scenario_header();
        header.version = 2;
        let err = header.validate().unwrap_err();
        assert!(matches!(
            err,
            RepeError::VersionMismatch {
                found: 2,
                supported: 1
            }
        ));
        assert_eq!(err.error_code(), Some(ErrorCode::VersionMismatch));
    }

    #[test]
    fn validate_rejects_bad_notify() {
        let mut header = scenario_header();
        header.notify = 2;
        assert!(matches!(
            header.validate(),
            Err(RepeError::InvalidNotify { found: 2 })
        ));
    }

    #[test]
    fn check_lengths_detects_mismatch_and_overflow() {
        let mut header = scenario_header();
        assert!(header.check_lengths().is_ok());

        header.length = 61;
        assert!(matches!(
            header.check_lengths(),
            Err(RepeError::LengthMismatch { declared: 61, .. })
        ));

        header.query_length = u64::MAX;
        assert!(header.check_lengths().is_err());
    }

    #[test]
    fn set_lengths_saturates_on_overflow() {
        let mut header = Header::new(3);
        header.set_lengths(u64::MAX, 1);
        assert_eq!(header.length, u64::MAX);
        assert!(matches!(
            header.check_lengths(),
            Err(RepeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn encode_and_to_bytes_agree() {
        let mut header = scenario_header();
        header.notify = 1;
        header.ec = 4097;
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(&buf[..], &header.to_bytes()[..]);
    }

    #[test]
    fn prefix_peeks_length_and_spec() {
        let bytes = scenario_header().to_bytes();
        assert_eq!(peek_length(&bytes[..7]), None);
        assert_eq!(peek_length(&bytes[..8]), Some(60));
        assert_eq!(peek_prefix(&bytes[..9]), None);

        let prefix = peek_prefix(&bytes).unwrap();
        assert_eq!(prefix.length, 60);
        assert!(prefix.is_repe());
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            id in any::<u64>(),
            query_length in 0u64..1 << 32,
            body_length in 0u64..1 << 32,
            notify in 0u8..=1,
            query_format in any::<u16>(),
            body_format in any::<u16>(),
            ec in any::<u32>(),
        ) {
            let mut header = Header::new(id);
            header.notify = notify;
            header.query_format = query_format;
            header.body_format = body_format;
            header.ec = ec;
            header.set_lengths(query_length, body_length);

            let decoded = Header::decode(&header.to_bytes()).unwrap();
            prop_assert_eq!(decoded, header);
            prop_assert!(decoded.validate().is_ok());
            prop_assert!(decoded.check_lengths().is_ok());
        }
    }
}
