//! End-to-end request/response scenarios driven through `HandlerTask` with an
//! in-memory mock transport, instead of a real socket — see `SPEC_FULL.md`
//! §1.1 on test tooling.

use nbhttpd::coro::Signal;
use nbhttpd::handler::HandlerTask;
use std::io::{self, Cursor, Read, Write};

struct MockTransport {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
}

impl MockTransport {
    fn new(input: &[u8]) -> Self {
        MockTransport {
            input: Cursor::new(input.to_vec()),
            output: Vec::new(),
        }
    }
}

impl Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn demo_body() -> Vec<u8> {
    let mut body = vec![b'a'; 65536];
    *body.last_mut().unwrap() = b'!';
    body
}

/// Drives a request to completion and returns the response bytes together
/// with the number of access-log lines captured along the way. Most
/// scenarios log exactly one line, but a peer that sends nothing closes
/// before the handler ever logs — callers decide what count to expect.
fn serve_logged(input: &[u8], body: &[u8]) -> (Vec<u8>, usize) {
    let mut task = HandlerTask::new();
    let mut sock = MockTransport::new(input);
    let mut log_lines = Vec::new();
    loop {
        let signal = task
            .step(&mut sock, body, |status, line| {
                log_lines.push((status, line.to_vec()));
            })
            .expect("mock transport never errors");
        match signal {
            Signal::Done => break,
            Signal::Pending => panic!("mock transport never blocks"),
        }
    }
    (sock.output, log_lines.len())
}

fn serve(input: &[u8], body: &[u8]) -> Vec<u8> {
    let (response, log_count) = serve_logged(input, body);
    assert_eq!(log_count, 1, "exactly one access-log line per request");
    response
}

fn header_section(response: &[u8]) -> &[u8] {
    let end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a blank-line terminator");
    &response[..end]
}

fn content_length_occurrences(response: &[u8]) -> usize {
    response
        .windows(b"Content-Length".len())
        .filter(|w| *w == b"Content-Length")
        .count()
}

#[test]
fn get_request_returns_full_body() {
    let body = demo_body();
    let response = serve(b"GET / HTTP/1.0\r\nHost: localhost\r\n\r\n", &body);

    assert!(response.starts_with(b"HTTP/1.0 200 OK\r\n"));
    assert_eq!(content_length_occurrences(&response), 1);
    assert!(response.ends_with(&body));

    let expected_len_field = format!("Content-Length: {}\r\n", body.len());
    assert!(header_section(&response)
        .windows(expected_len_field.len())
        .any(|w| w == expected_len_field.as_bytes()));
}

#[test]
fn head_request_omits_body_but_keeps_content_length() {
    let body = demo_body();
    let response = serve(b"HEAD /index.html HTTP/1.0\r\n\r\n", &body);

    assert!(response.starts_with(b"HTTP/1.0 200 OK\r\n"));
    assert_eq!(content_length_occurrences(&response), 1);
    assert!(response.ends_with(b"\r\n\r\n"));
    assert_eq!(response.len(), header_section(&response).len() + 4);
}

#[test]
fn unsupported_version_yields_400() {
    let body = demo_body();
    let response = serve(b"GET / HTTP/2.0\r\n\r\n", &body);
    assert!(response.starts_with(b"HTTP/1.0 400 Bad Request\r\n"));
}

#[test]
fn unknown_method_still_parses_and_responds_200() {
    let body = demo_body();
    let response = serve(b"OPTIONS / HTTP/1.0\r\n\r\n", &body);
    assert!(response.starts_with(b"HTTP/1.0 200 OK\r\n"));
}

#[test]
fn duplicate_known_header_yields_400() {
    let body = demo_body();
    let response = serve(b"GET / HTTP/1.0\r\nHost: a\r\nHost: b\r\n\r\n", &body);
    assert!(response.starts_with(b"HTTP/1.0 400 Bad Request\r\n"));
}

#[test]
fn oversized_uri_yields_414() {
    let body = demo_body();
    let mut input = b"GET /".to_vec();
    input.extend(std::iter::repeat(b'x').take(4097));
    input.extend_from_slice(b" HTTP/1.0\r\n\r\n");
    let response = serve(&input, &body);
    assert!(response.starts_with(b"HTTP/1.0 414 Request URI Too Long\r\n"));
}

#[test]
fn header_block_over_cap_yields_431_and_never_reaches_parser() {
    let body = demo_body();
    let mut input = b"GET / HTTP/1.0\r\n".to_vec();
    while input.len() < 8300 {
        input.extend_from_slice(b"X-Filler: padding-value\r\n");
    }
    let response = serve(&input, &body);
    assert!(response.starts_with(b"HTTP/1.0 431 Request Header Too Large\r\n"));
    assert_eq!(content_length_occurrences(&response), 1);
}

#[test]
fn peer_that_sends_nothing_gets_no_response() {
    let body = demo_body();
    let (response, log_count) = serve_logged(b"", &body);
    assert!(response.is_empty());
    assert_eq!(log_count, 0, "connection closed before the header was ever read");
}

#[test]
fn sixty_four_extra_headers_succeed() {
    let body = demo_body();
    let mut input = b"GET / HTTP/1.0\r\n".to_vec();
    for i in 0..64 {
        input.extend_from_slice(format!("X-Custom-{i}: v\r\n").as_bytes());
    }
    input.extend_from_slice(b"\r\n");
    let response = serve(&input, &body);
    assert!(response.starts_with(b"HTTP/1.0 200 OK\r\n"));
}

#[test]
fn terminator_variants_are_all_accepted() {
    let body = demo_body();
    for terminator in [&b"\r\n\r\n"[..], &b"\n\n"[..], &b"\r\n\n"[..], &b"\n\r\n"[..]] {
        let mut input = b"GET / HTTP/1.0".to_vec();
        input.extend_from_slice(terminator);
        let response = serve(&input, &body);
        assert!(
            response.starts_with(b"HTTP/1.0 200 OK\r\n"),
            "terminator {:?} rejected",
            terminator
        );
    }
}
