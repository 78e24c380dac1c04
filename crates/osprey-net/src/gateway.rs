//! Network gateway implementation using mio.
//!
//! A non-blocking TCP server that frames newline-terminated JSON order
//! lines, decodes them, and feeds the matching engine's submission queue.
//! Accepted orders are answered with an ACK line on the same connection;
//! malformed lines are logged and dropped while the connection survives.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use osprey_core::SubmitHandle;
use osprey_proto::{OrderDecoder, ACK_LINE};

const SERVER: Token = Token(0);
const MAX_CONNECTIONS: usize = 1024;
const READ_BUFFER_SIZE: usize = 4096;
const WRITE_BUFFER_SIZE: usize = 4096;

/// Poll timeout; bounds how long shutdown can lag the running flag.
const POLL_TIMEOUT_MS: u64 = 100;

/// Per-connection state.
struct Connection {
    stream: TcpStream,
    read_buffer: [u8; READ_BUFFER_SIZE],
    read_pos: usize,
    write_buffer: [u8; WRITE_BUFFER_SIZE],
    write_pos: usize,
    write_len: usize,
    addr: SocketAddr,
}

impl Connection {
    fn new(stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            stream,
            read_buffer: [0; READ_BUFFER_SIZE],
            read_pos: 0,
            write_buffer: [0; WRITE_BUFFER_SIZE],
            write_pos: 0,
            write_len: 0,
            addr,
        }
    }

    /// Queue data for writing. Drops the payload if the write buffer is
    /// full; the client is lagging its own ACK stream at that point.
    fn queue_write(&mut self, data: &[u8]) -> bool {
        let available = WRITE_BUFFER_SIZE - self.write_len;
        if data.len() > available {
            return false;
        }

        self.write_buffer[self.write_len..self.write_len + data.len()].copy_from_slice(data);
        self.write_len += data.len();
        true
    }
}

/// TCP order gateway.
pub struct Gateway {
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    decoder: OrderDecoder,
    submit: SubmitHandle,
}

impl Gateway {
    /// Bind the listen socket. A failure here is fatal to the process.
    pub fn bind(addr: &str, decoder: OrderDecoder, submit: SubmitHandle) -> io::Result<Self> {
        let poll = Poll::new()?;
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut listener = TcpListener::bind(addr)?;
        poll.registry()
            .register(&mut listener, SERVER, Interest::READABLE)?;

        Ok(Self {
            poll,
            listener,
            connections: HashMap::with_capacity(MAX_CONNECTIONS),
            next_token: 1,
            decoder,
            submit,
        })
    }

    /// Address the gateway is listening on.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Drive the event loop until the running flag clears.
    pub fn run(&mut self, running: &AtomicBool) -> io::Result<()> {
        while running.load(Ordering::Relaxed) {
            self.poll(Some(POLL_TIMEOUT_MS))?;
        }
        Ok(())
    }

    /// One poll cycle with an optional timeout in milliseconds.
    pub fn poll(&mut self, timeout_ms: Option<u64>) -> io::Result<()> {
        let mut mio_events = Events::with_capacity(256);
        let timeout = timeout_ms.map(std::time::Duration::from_millis);

        self.poll.poll(&mut mio_events, timeout)?;

        for event in mio_events.iter() {
            match event.token() {
                SERVER => self.accept_connections()?,
                token => {
                    let is_readable = event.is_readable();
                    let is_writable = event.is_writable();
                    self.handle_connection(token, is_readable, is_writable);
                }
            }
        }

        Ok(())
    }

    fn accept_connections(&mut self) -> io::Result<()> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    stream.set_nodelay(true)?;

                    self.poll.registry().register(
                        &mut stream,
                        token,
                        Interest::READABLE | Interest::WRITABLE,
                    )?;

                    debug!(%addr, "client connected");
                    self.connections.insert(token, Connection::new(stream, addr));
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    fn handle_connection(&mut self, token: Token, is_readable: bool, is_writable: bool) {
        let decoder = &self.decoder;
        let submit = &self.submit;
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };

        if is_readable && read_and_decode(conn, decoder, submit) {
            self.remove_connection(token);
            return;
        }

        if is_writable {
            flush_writes(conn);
        }
    }

    fn remove_connection(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
            info!(addr = %conn.addr, "client disconnected");
        }
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Drain the socket, decoding lines as the buffer fills.
/// Returns true when the connection should be closed.
fn read_and_decode(conn: &mut Connection, decoder: &OrderDecoder, submit: &SubmitHandle) -> bool {
    loop {
        if conn.read_pos == READ_BUFFER_SIZE {
            // Buffer filled without a newline: decode what is framed, and
            // if nothing was, this is not a line-protocol client.
            process_lines(conn, decoder, submit);
            if conn.read_pos == READ_BUFFER_SIZE {
                warn!(
                    addr = %conn.addr,
                    "order line exceeds {} bytes, discarded",
                    READ_BUFFER_SIZE
                );
                conn.read_pos = 0;
            }
        }

        match conn.stream.read(&mut conn.read_buffer[conn.read_pos..]) {
            Ok(0) => return true, // peer closed
            Ok(n) => conn.read_pos += n,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(addr = %conn.addr, %err, "read failed, closing connection");
                return true;
            }
        }
    }

    process_lines(conn, decoder, submit);
    // Push queued ACKs out without waiting for the next writable event.
    flush_writes(conn);

    false
}

/// Split the read buffer on newlines and decode each complete line.
fn process_lines(conn: &mut Connection, decoder: &OrderDecoder, submit: &SubmitHandle) {
    let mut consumed = 0;
    while let Some(nl) = conn.read_buffer[consumed..conn.read_pos]
        .iter()
        .position(|&b| b == b'\n')
    {
        let line_end = consumed + nl;
        let line = &conn.read_buffer[consumed..line_end];
        consumed = line_end + 1;

        let text = match std::str::from_utf8(line) {
            Ok(text) => text,
            Err(_) => {
                warn!(addr = %conn.addr, "non-UTF-8 order line dropped");
                continue;
            }
        };
        if text.trim().is_empty() {
            continue;
        }

        match decoder.decode_line(text) {
            Ok(order) => {
                if submit.submit(order) {
                    conn.queue_write(ACK_LINE.as_bytes());
                } else {
                    // Engine is shutting down; stop acking.
                    debug!(addr = %conn.addr, "order dropped during shutdown");
                }
            }
            Err(err) => {
                // The line dies, the connection lives.
                warn!(addr = %conn.addr, %err, "rejected order line");
            }
        }
    }

    if consumed > 0 {
        conn.read_buffer.copy_within(consumed..conn.read_pos, 0);
        conn.read_pos -= consumed;
    }
}

/// Write as much of the pending buffer as the socket accepts.
fn flush_writes(conn: &mut Connection) {
    while conn.write_pos < conn.write_len {
        match conn
            .stream
            .write(&conn.write_buffer[conn.write_pos..conn.write_len])
        {
            Ok(n) => conn.write_pos += n,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break, // surfaced by the next read
        }
    }

    if conn.write_pos == conn.write_len {
        conn.write_pos = 0;
        conn.write_len = 0;
    }
}
