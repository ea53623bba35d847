//! The connection lifecycle engine.
//!
//! Grounded on `server/server.c`: a fixed-size connection table, linear-scan
//! slot allocation, an admission-controlled accept loop, and edge-triggered
//! dispatch by tagged user data. `mio`'s `Poll`/`Events`/`Token` stand in for
//! the original's raw `epoll_wait`/`epoll_event.data.ptr`.

use std::io;
use std::net::{Shutdown, SocketAddr};
use std::time::{Instant, SystemTime};

use mio::event::Event;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Socket, Type};

use crate::coro::Signal;
use crate::error::Result;
use crate::format::log_timestamp;
use crate::handler::HandlerTask;

pub const CONNECTIONS_MAX: usize = 256;
const BACKLOG_MAX: i32 = 64;
const EVENTS_MAX: usize = 64;
const LISTENER_TOKEN: Token = Token(CONNECTIONS_MAX);

struct Slot {
    is_open: bool,
    stream: Option<TcpStream>,
    addr: Option<SocketAddr>,
    established: Option<Instant>,
    task: Box<HandlerTask>,
}

impl Slot {
    fn empty() -> Self {
        Slot {
            is_open: false,
            stream: None,
            addr: None,
            established: None,
            task: Box::new(HandlerTask::new()),
        }
    }
}

/// A single-threaded, non-blocking HTTP/1.0 server. One listening socket, one
/// readiness multiplexer, a fixed table of connection slots each owning a
/// pre-allocated [`HandlerTask`].
pub struct Server {
    poll: Poll,
    listener: TcpListener,
    listen_addr: SocketAddr,
    active_count: usize,
    slots: Vec<Slot>,
    body: Box<[u8]>,
}

impl Server {
    /// Binds and starts listening on `addr`. `body` is the static response
    /// payload handed to every request that isn't a `HEAD`.
    pub fn new(addr: SocketAddr, body: Vec<u8>) -> Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(BACKLOG_MAX)?;
        socket.set_nonblocking(true)?;

        let mut listener = TcpListener::from_std(socket.into());
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        // Re-query in case the caller asked for port 0.
        let listen_addr = listener.local_addr()?;
        proxy_log::info!("Listening on {}", listen_addr);

        let mut slots = Vec::with_capacity(CONNECTIONS_MAX);
        slots.resize_with(CONNECTIONS_MAX, Slot::empty);

        Ok(Server {
            poll,
            listener,
            listen_addr,
            active_count: 0,
            slots,
            body: body.into_boxed_slice(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Runs the event loop. Returns only on a fatal multiplexer error.
    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(EVENTS_MAX);
        loop {
            self.poll.poll(&mut events, None)?;

            for event in events.iter() {
                let token = event.token();
                if token == LISTENER_TOKEN {
                    while self.accept_one()? {}
                } else {
                    self.dispatch(token.0, event_flags(event))?;
                }
            }
        }
    }

    /// Accepts at most one pending connection. Returns `Ok(true)` if a
    /// connection was accepted (caller should try again), `Ok(false)` if the
    /// accept queue is drained, would-block, aborted, or the slot table is
    /// full.
    fn accept_one(&mut self) -> io::Result<bool> {
        if self.active_count == CONNECTIONS_MAX {
            return Ok(false);
        }

        let (mut stream, addr) = match self.listener.accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
            Err(e) if e.kind() == io::ErrorKind::ConnectionAborted => return Ok(false),
            Err(e) => return Err(e),
        };

        let index = self
            .slots
            .iter()
            .position(|s| !s.is_open)
            .expect("active_count under CONNECTIONS_MAX implies a free slot");

        self.poll.registry().register(
            &mut stream,
            Token(index),
            Interest::READABLE | Interest::WRITABLE,
        )?;

        let slot = &mut self.slots[index];
        slot.task.reset();
        slot.stream = Some(stream);
        slot.addr = Some(addr);
        slot.established = Some(Instant::now());
        slot.is_open = true;
        self.active_count += 1;

        proxy_log::debug!("Connection received {}", addr);
        Ok(true)
    }

    /// Resumes the slot's task if readable/writable, then closes it on
    /// completion or peer hang-up. A genuine I/O error from the task is not
    /// this connection's problem alone: it is fatal to the whole process.
    fn dispatch(&mut self, index: usize, flags: u8) -> io::Result<()> {
        if !self.slots[index].is_open {
            return Ok(());
        }

        let mut should_close = false;

        if flags & (READABLE | WRITABLE) != 0 {
            let body: &[u8] = &self.body;
            let slot = &mut self.slots[index];
            let stream = slot.stream.as_mut().expect("open slot has a stream");
            let addr = slot.addr.expect("open slot has an address");

            let outcome = slot.task.step(stream, body, |status, line| {
                proxy_log::info!(
                    "[{}] {} -- \"{}\"",
                    log_timestamp(SystemTime::now()),
                    status,
                    String::from_utf8_lossy(line)
                );
            });

            match outcome {
                Ok(Signal::Pending) => {}
                Ok(Signal::Done) => should_close = true,
                Err(e) => {
                    proxy_log::errors!("connection {} failed: {}", addr, e);
                    return Err(e);
                }
            }
        }

        if flags & READ_CLOSED != 0 {
            should_close = true;
        }

        if should_close {
            self.close_connection(index);
        }
        Ok(())
    }

    fn close_connection(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        debug_assert!(slot.is_open);
        let addr = slot.addr.expect("open slot has an address");

        if let Some(mut stream) = slot.stream.take() {
            let _ = self.poll.registry().deregister(&mut stream);
            match stream.shutdown(Shutdown::Both) {
                Ok(()) => proxy_log::debug!("Connection closed   {}", addr),
                Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                    proxy_log::debug!("Connection dropped  {}", addr)
                }
                Err(e) => proxy_log::debug!("shutdown error for {}: {}", addr, e),
            }
        }

        let slot = &mut self.slots[index];
        slot.is_open = false;
        slot.addr = None;
        slot.established = None;
        self.active_count -= 1;
    }
}

const READABLE: u8 = 1;
const WRITABLE: u8 = 2;
const READ_CLOSED: u8 = 4;

fn event_flags(e: &Event) -> u8 {
    let mut flags = 0;
    if e.is_readable() {
        flags |= READABLE;
    }
    if e.is_writable() {
        flags |= WRITABLE;
    }
    if e.is_read_closed() || e.is_write_closed() || e.is_error() {
        flags |= READ_CLOSED;
    }
    flags
}
