//! Demo entrypoint: binds a listen address (default `127.0.0.1:7878`, or
//! `argv[1]` if given), builds the static demo body, and runs the server
//! until killed.

use std::net::SocketAddr;
use std::process::ExitCode;

use nbhttpd::error::Result;
use nbhttpd::Server;

const DEFAULT_ADDR: &str = "127.0.0.1:7878";
const DEMO_BODY_SIZE: usize = 64 * 1024;

/// 64 KiB of `a` bytes terminated by a single `!`, matching the
/// `original_source` reference server's demo payload.
fn demo_body() -> Vec<u8> {
    let mut body = vec![b'a'; DEMO_BODY_SIZE];
    *body.last_mut().expect("non-empty body") = b'!';
    body
}

fn run() -> Result<()> {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }

    let addr_str = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let addr: SocketAddr = addr_str.parse()?;

    let mut server = Server::new(addr, demo_body())?;
    server.run()
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
    }
}
