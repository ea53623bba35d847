//! Recursive-descent parser over the `Scanner`'s token stream.
//!
//! Grounded on `http/parser.c`'s `parse_request_line` /
//! `parse_request_fields` / `parse_request`. See `DESIGN.md` for the two
//! source divergences this corrects: the method-lookup self-compare, and
//! the field loop returning after its first iteration.

use crate::bstr::Span;
use crate::http::header::{
    lookup_header_name, lookup_method, ExtraField, ParseFailure, ParsedRequest, RequestUri,
    Version, EXTRA_FIELDS_MAX, URI_MAX,
};
use crate::http::scanner::{Scanner, Token};

fn parse_request_line(s: &mut Scanner, req: &mut ParsedRequest) -> Result<(), ParseFailure> {
    let name = match s.next_token() {
        Token::Name(span) => span,
        _ => return Err(ParseFailure::Malformed),
    };
    req.method = lookup_method(s.resolve(name));

    match s.next_token() {
        Token::Blanks(_) => {}
        _ => return Err(ParseFailure::Malformed),
    }

    let uri = s.uri_run();
    if uri.len as usize > URI_MAX {
        return Err(ParseFailure::UriTooLong);
    }
    req.uri = RequestUri {
        full: Some(uri),
        ..RequestUri::default()
    };

    match s.next_token() {
        Token::Blanks(_) => {}
        _ => return Err(ParseFailure::Malformed),
    }

    let version = s.value_run();
    req.version = if s.resolve(version).eq_ignore_ascii_case(b"HTTP/1.0") {
        Version::Http10
    } else if s.resolve(version).eq_ignore_ascii_case(b"HTTP/1.1") {
        Version::Http11
    } else {
        return Err(ParseFailure::Malformed);
    };

    match s.next_token() {
        Token::Crlf => Ok(()),
        _ => Err(ParseFailure::Malformed),
    }
}

/// Parses `( NAME COLON BLANKS? <value-run> CRLF )* CRLF`, continuing
/// across every field up to the terminating blank line. An earlier
/// revision of this loop returned after its first iteration; every
/// multi-field testable property (S1's `Host`, S6's duplicate `Host`, the
/// 64/65 extra-field boundary) requires it to continue instead.
fn parse_header_fields(s: &mut Scanner, req: &mut ParsedRequest) -> Result<(), ParseFailure> {
    loop {
        let name = match s.next_token() {
            Token::Crlf => return Ok(()),
            Token::Name(span) => span,
            _ => return Err(ParseFailure::Malformed),
        };

        match s.next_token() {
            Token::Colon => {}
            _ => return Err(ParseFailure::Malformed),
        }
        s.skip_blanks();
        let value = s.value_run();
        match s.next_token() {
            Token::Crlf => {}
            _ => return Err(ParseFailure::Malformed),
        }

        match lookup_header_name(s.resolve(name)) {
            Some(hname) => {
                let slot = &mut req.std_fields[hname.index()];
                if slot.is_some() {
                    return Err(ParseFailure::Malformed);
                }
                *slot = Some(value);
            }
            None => {
                if req.extra_fields.len() == EXTRA_FIELDS_MAX {
                    return Err(ParseFailure::Malformed);
                }
                req.extra_fields.push(ExtraField { name, value });
            }
        }
    }
}

/// Exposed so callers that must log the request line even when they skip
/// invoking the parser outright (header-cap overflow) can still populate it.
pub(crate) fn first_line_span(data: &[u8]) -> Span {
    for (i, &c) in data.iter().enumerate() {
        if c == b'\r' || c == b'\n' {
            return Span::new(0, i);
        }
    }
    Span::new(0, data.len())
}

/// Parses a captured header block (request line + fields + blank line) into
/// `req`. On failure, any partially populated fields must not be used
/// beyond logging — this mirrors the source's "undefined on false return".
pub fn parse_request(data: &[u8], req: &mut ParsedRequest) -> Result<(), ParseFailure> {
    req.reset();
    req.first_line = first_line_span(data);

    let mut s = Scanner::new(data);
    parse_request_line(&mut s, req)?;
    parse_header_fields(&mut s, req)
}
