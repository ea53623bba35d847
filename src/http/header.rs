//! The known-field table, method table, and the parsed-request model.
//!
//! Grounded on `http/http.h`'s `HTTPHeader`/`HTTPMethod`/`HTTPHeaderName`
//! and `http/request.h`'s `is_request_header_end`. Slices into the captured
//! header bytes are represented as `Span`s rather than borrowed `&[u8]` (see
//! `bstr::Span`), so `ParsedRequest` itself carries no lifetime; resolving a
//! span requires the `header_data` it was produced from.

use crate::bstr::Span;

pub const HEADER_SIZE_MAX: usize = 8190;
pub const URI_MAX: usize = 4096;
pub const EXTRA_FIELDS_MAX: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Head,
    Unknown,
}

const METHOD_NAMES: [(&[u8], Method); 3] = [
    (b"GET", Method::Get),
    (b"POST", Method::Post),
    (b"HEAD", Method::Head),
];

/// Matches `lexeme` against each known method string in turn. An earlier
/// revision of this comparison compared the lexeme to itself
/// (`string_eq_case(name, name)`), which always matched `GET`; this compares
/// the scanned lexeme against each candidate, as intended.
pub fn lookup_method(lexeme: &[u8]) -> Method {
    for (name, method) in METHOD_NAMES {
        if lexeme.eq_ignore_ascii_case(name) {
            return method;
        }
    }
    Method::Unknown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderName {
    Allow,
    ContentEncoding,
    ContentLength,
    ContentType,
    Expires,
    LastModified,
    Pragma,
    Date,
    Location,
    Server,
    WwwAuthenticate,
    Authorization,
    From,
    IfModifiedSince,
    Referer,
    UserAgent,
    Host,
}

pub const HEADER_NAME_COUNT: usize = 17;

pub const KNOWN_HEADERS: [(&str, HeaderName); HEADER_NAME_COUNT] = [
    ("Allow", HeaderName::Allow),
    ("Content-Encoding", HeaderName::ContentEncoding),
    ("Content-Length", HeaderName::ContentLength),
    ("Content-Type", HeaderName::ContentType),
    ("Expires", HeaderName::Expires),
    ("Last-Modified", HeaderName::LastModified),
    ("Pragma", HeaderName::Pragma),
    ("Date", HeaderName::Date),
    ("Location", HeaderName::Location),
    ("Server", HeaderName::Server),
    ("WWW-Authenticate", HeaderName::WwwAuthenticate),
    ("Authorization", HeaderName::Authorization),
    ("From", HeaderName::From),
    ("If-Modified-Since", HeaderName::IfModifiedSince),
    ("Referer", HeaderName::Referer),
    ("User-Agent", HeaderName::UserAgent),
    ("Host", HeaderName::Host),
];

impl HeaderName {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn text(self) -> &'static str {
        KNOWN_HEADERS[self.index()].0
    }
}

/// Looks up `name` case-insensitively against the known-field table.
pub fn lookup_header_name(name: &[u8]) -> Option<HeaderName> {
    KNOWN_HEADERS
        .iter()
        .find(|(text, _)| name.eq_ignore_ascii_case(text.as_bytes()))
        .map(|(_, hn)| *hn)
}

/// URI decomposition into path/query/fragment is deliberately left
/// unimplemented (see source Open Questions); only `full` is ever populated.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestUri {
    pub full: Option<Span>,
    pub path: Option<Span>,
    pub query: Option<Span>,
    pub segment: Option<Span>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExtraField {
    pub name: Span,
    pub value: Span,
}

/// Why `parse_request` failed to produce a usable request. The handler task
/// maps this to a response status code (see `handler.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    /// The request-URI exceeded `URI_MAX`.
    UriTooLong,
    /// Any other malformed request line or header field.
    Malformed,
}

/// A parsed HTTP/1.0 (or 1.1-lexically-accepted) request. Every `Span`
/// inside borrows from the `header_data` buffer it was parsed out of; it
/// must not be resolved against any other buffer.
pub struct ParsedRequest {
    pub method: Method,
    pub version: Version,
    pub uri: RequestUri,
    pub std_fields: [Option<Span>; HEADER_NAME_COUNT],
    pub extra_fields: Vec<ExtraField>,
    pub first_line: Span,
}

impl ParsedRequest {
    pub fn empty() -> Self {
        ParsedRequest {
            method: Method::Unknown,
            version: Version::Http10,
            uri: RequestUri::default(),
            std_fields: [None; HEADER_NAME_COUNT],
            extra_fields: Vec::new(),
            first_line: Span::new(0, 0),
        }
    }

    pub fn reset(&mut self) {
        self.method = Method::Unknown;
        self.version = Version::Http10;
        self.uri = RequestUri::default();
        self.std_fields = [None; HEADER_NAME_COUNT];
        self.extra_fields.clear();
        self.first_line = Span::new(0, 0);
    }
}

/// The exact bytes received for one request's header block, plus a
/// running length. All spans inside a `ParsedRequest` produced from this
/// buffer point into `data[..len]`.
pub struct HeaderBuf {
    pub data: [u8; HEADER_SIZE_MAX],
    pub len: usize,
}

impl HeaderBuf {
    pub fn new() -> Self {
        HeaderBuf {
            data: [0u8; HEADER_SIZE_MAX],
            len: 0,
        }
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }

    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    /// Precondition: `!self.is_full()`.
    pub fn push(&mut self, byte: u8) {
        self.data[self.len] = byte;
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Scans the last up to four bytes for two `\n` bytes with any
    /// intervening `\r` ignored, which tolerates `\r\n\r\n`, `\n\n`,
    /// `\r\n\n`, and `\n\r\n`. Grounded on `request.h::is_request_header_end`.
    pub fn ends_with_terminator(&self) -> bool {
        let tail_start = self.len.saturating_sub(4);
        let tail = &self.data[tail_start..self.len];
        let mut prev = 0u8;
        for &c in tail {
            if c == b'\n' && prev == b'\n' {
                return true;
            }
            if c == b'\r' {
                continue;
            }
            prev = c;
        }
        false
    }
}

impl Default for HeaderBuf {
    fn default() -> Self {
        Self::new()
    }
}
