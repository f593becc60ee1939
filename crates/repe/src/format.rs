//! Reserved query and body format ids.
//!
//! Format ids 0-4095 are reserved by the protocol.
//! Format ids 4096-65535 are available for application-defined formats.
//!
//! The codec never decodes payloads itself; these ids only tag the query and
//! body bytes so a consuming layer can route them to the right decoder.

/// First application-defined format id.
pub const APPLICATION_FORMAT_START: u16 = 4096;

/// Reserved `query_format` values.
pub mod query_format {
    /// Opaque binary query.
    pub const RAW_BINARY: u16 = 0;

    /// JSON-Pointer-style path syntax.
    pub const JSON_POINTER: u16 = 1;
}

/// Reserved `body_format` values.
pub mod body_format {
    /// Opaque binary body.
    pub const RAW_BINARY: u16 = 0;

    /// BEVE binary encoding.
    pub const BEVE: u16 = 1;

    /// JSON text.
    pub const JSON: u16 = 2;

    /// UTF-8 text (also used for error messages).
    pub const UTF8: u16 = 3;
}

const QUERY_FORMATS: &[(u16, &str)] = &[
    (query_format::RAW_BINARY, "RAW_BINARY"),
    (query_format::JSON_POINTER, "JSON_POINTER"),
];

const BODY_FORMATS: &[(u16, &str)] = &[
    (body_format::RAW_BINARY, "RAW_BINARY"),
    (body_format::BEVE, "BEVE"),
    (body_format::JSON, "JSON"),
    (body_format::UTF8, "UTF8"),
];

/// Classification of a format id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    /// A reserved id with an assigned meaning.
    Known(&'static str),
    /// A reserved id with no assigned meaning yet.
    Unassigned,
    /// An application-defined id.
    Application,
}

/// Returns true if the format id is in the reserved range.
pub fn is_reserved(id: u16) -> bool {
    id < APPLICATION_FORMAT_START
}

/// Returns true if the format id is application-defined.
pub fn is_application(id: u16) -> bool {
    !is_reserved(id)
}

/// Returns a human-readable name for a query format id.
pub fn query_format_name(id: u16) -> &'static str {
    format_name(QUERY_FORMATS, id)
}

/// Returns a human-readable name for a body format id.
pub fn body_format_name(id: u16) -> &'static str {
    format_name(BODY_FORMATS, id)
}

/// Classify a query format id.
pub fn classify_query_format(id: u16) -> FormatClass {
    classify(QUERY_FORMATS, id)
}

/// Classify a body format id.
pub fn classify_body_format(id: u16) -> FormatClass {
    classify(BODY_FORMATS, id)
}

fn classify(table: &[(u16, &'static str)], id: u16) -> FormatClass {
    if is_application(id) {
        return FormatClass::Application;
    }
    match lookup(table, id) {
        Some(name) => FormatClass::Known(name),
        None => FormatClass::Unassigned,
    }
}

fn format_name(table: &[(u16, &'static str)], id: u16) -> &'static str {
    match classify(table, id) {
        FormatClass::Known(name) => name,
        FormatClass::Unassigned => "RESERVED",
        FormatClass::Application => "APPLICATION",
    }
}

fn lookup(table: &[(u16, &'static str)], id: u16) -> Option<&'static str> {
    table
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, name)| *name)
}
