//! Status-reason table and the response header builder.
//!
//! Grounded on `http/http.c`'s `fill_response_header_data`/`add_std_header`
//! and `http/http.h`'s status-code table.

use crate::bstr::{ByteBuilder, Overflow};
use crate::http::header::{HeaderName, KNOWN_HEADERS, HEADER_NAME_COUNT};

/// Exact reason phrases for the statuses this server can emit. `_` covers
/// codes outside that set defensively; the handler task never produces one.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Moved Temporarily",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        414 => "Request URI Too Long",
        418 => "I'm a Teapot",
        431 => "Request Header Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        505 => "HTTP Version Not Supported",
        _ => "Unknown",
    }
}

/// The response side of the header model: a fixed-slot table of known
/// fields (mirroring the request side) plus an overflow list, filled in by
/// the handler task rather than a parser.
pub struct ResponseFields {
    pub std_fields: [Option<Vec<u8>>; HEADER_NAME_COUNT],
    pub extra_fields: Vec<(Vec<u8>, Vec<u8>)>,
}

impl ResponseFields {
    pub fn new() -> Self {
        ResponseFields {
            std_fields: Default::default(),
            extra_fields: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.std_fields = Default::default();
        self.extra_fields.clear();
    }

    /// Precondition: the slot is not already set, matching the source's
    /// `assert(string_is_null(resp->std_fields[hname]))`.
    pub fn set(&mut self, name: HeaderName, value: impl Into<Vec<u8>>) {
        let slot = &mut self.std_fields[name.index()];
        assert!(slot.is_none(), "response field {:?} set twice", name);
        *slot = Some(value.into());
    }
}

impl Default for ResponseFields {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the status line, known fields (in enum order), extra fields (in
/// insertion order), a `Content-Length` if one was not already set, and the
/// terminating blank line into `out`. Builder overflow is the only failure
/// mode; the caller treats it as a protocol-internal failure and closes the
/// connection silently (see `handler.rs`).
pub fn render(
    out: &mut ByteBuilder,
    status: u16,
    fields: &ResponseFields,
    body_len: usize,
) -> Result<(), Overflow> {
    out.append(b"HTTP/1.0 ")?;
    out.append_number(status as usize)?;
    out.append(b" ")?;
    out.append(reason_phrase(status).as_bytes())?;
    out.append(b"\r\n")?;

    for (i, field) in fields.std_fields.iter().enumerate() {
        let Some(value) = field else { continue };
        out.append(KNOWN_HEADERS[i].0.as_bytes())?;
        out.append(b": ")?;
        out.append(value)?;
        out.append(b"\r\n")?;
    }

    for (name, value) in &fields.extra_fields {
        out.append(name)?;
        out.append(b": ")?;
        out.append(value)?;
        out.append(b"\r\n")?;
    }

    if fields.std_fields[HeaderName::ContentLength.index()].is_none() {
        out.append(HeaderName::ContentLength.text().as_bytes())?;
        out.append(b": ")?;
        out.append_number(body_len)?;
        out.append(b"\r\n")?;
    }

    out.append(b"\r\n")
}
