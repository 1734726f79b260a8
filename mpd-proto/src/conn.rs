//! Pipelined text connection to an MPD server.
//!
//! MPD speaks a line protocol: one command per line, terminated by a
//! single `\n` (never CR, which MPD rejects), answered by response lines
//! in issue order. [`TextConn`] owns the socket and a pipeline sequencer
//! that lets concurrent callers interleave request writes with response
//! reads while keeping both strictly ordered: the bytes of request A
//! precede those of request B on the wire iff A reserved its slot first,
//! and A's response is fully consumed before B's reader starts.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::sync::{Condvar, Mutex};

use crate::error::{ProtoError, Result};

/// The underlying stream socket, TCP or UNIX domain.
#[derive(Debug)]
enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Stream {
    fn try_clone(&self) -> io::Result<Stream> {
        match self {
            Stream::Tcp(s) => s.try_clone().map(Stream::Tcp),
            #[cfg(unix)]
            Stream::Unix(s) => s.try_clone().map(Stream::Unix),
        }
    }

    fn shutdown(&self) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => s.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Stream::Unix(s) => s.shutdown(Shutdown::Both),
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Stream::Unix(s) => s.flush(),
        }
    }
}

/// Token-ordered gate serializing request writes and response reads.
///
/// Issuing a command reserves a monotonically increasing id; writers and
/// readers each wait for their turn counter to reach that id. Requests
/// and responses advance independently, so request N+1 may be written
/// while response N is still being read.
#[derive(Default, Debug)]
struct Pipeline {
    turns: Mutex<Turns>,
    write_cv: Condvar,
    read_cv: Condvar,
}

#[derive(Default, Debug)]
struct Turns {
    next_id: u64,
    write_turn: u64,
    read_turn: u64,
}

impl Pipeline {
    fn next(&self) -> u64 {
        let mut turns = self.turns.lock().expect("pipeline lock poisoned");
        let id = turns.next_id;
        turns.next_id += 1;
        id
    }

    fn start_request(&self, id: u64) {
        let mut turns = self.turns.lock().expect("pipeline lock poisoned");
        while turns.write_turn != id {
            turns = self.write_cv.wait(turns).expect("pipeline lock poisoned");
        }
    }

    fn end_request(&self, id: u64) {
        let mut turns = self.turns.lock().expect("pipeline lock poisoned");
        turns.write_turn = id + 1;
        drop(turns);
        self.write_cv.notify_all();
    }

    fn start_response(&self, id: u64) {
        let mut turns = self.turns.lock().expect("pipeline lock poisoned");
        while turns.read_turn != id {
            turns = self.read_cv.wait(turns).expect("pipeline lock poisoned");
        }
    }

    fn end_response(&self, id: u64) {
        let mut turns = self.turns.lock().expect("pipeline lock poisoned");
        turns.read_turn = id + 1;
        drop(turns);
        self.read_cv.notify_all();
    }
}

/// A line-oriented connection to an MPD server.
///
/// The reader and writer halves are clones of the same socket, so a
/// writer (say, a `noidle` interrupt) can proceed while another thread is
/// parked in [`TextConn::read_line`]. All synchronization between
/// callers happens through the request/response slots; holders of the
/// current slot never contend on the internal locks.
#[derive(Debug)]
pub struct TextConn {
    reader: Mutex<BufReader<Stream>>,
    writer: Mutex<BufWriter<Stream>>,
    ctrl: Stream,
    pipeline: Pipeline,
}

impl TextConn {
    /// Connect over `network` (`"tcp"` or `"unix"`) to `addr`, a
    /// `host:port` pair or a socket path.
    pub fn connect(network: &str, addr: &str) -> Result<TextConn> {
        let stream = match network {
            "tcp" => Stream::Tcp(TcpStream::connect(addr)?),
            #[cfg(unix)]
            "unix" => Stream::Unix(UnixStream::connect(addr)?),
            other => {
                return Err(ProtoError::Protocol(format!(
                    "unsupported network {other:?}"
                )))
            }
        };
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream.try_clone()?);
        Ok(TextConn {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            ctrl: stream,
            pipeline: Pipeline::default(),
        })
    }

    /// Reserve the next request/response slot.
    pub fn next(&self) -> u64 {
        self.pipeline.next()
    }

    /// Block until it is `id`'s turn to write its request.
    pub fn start_request(&self, id: u64) {
        self.pipeline.start_request(id);
    }

    /// Mark request `id` as fully written, releasing the next writer.
    pub fn end_request(&self, id: u64) {
        self.pipeline.end_request(id);
    }

    /// Block until every response before `id` has been consumed.
    pub fn start_response(&self, id: u64) {
        self.pipeline.start_response(id);
    }

    /// Mark response `id` as fully consumed, releasing the next reader.
    pub fn end_response(&self, id: u64) {
        self.pipeline.end_response(id);
    }

    /// Reserve a slot and write one command line inside its request gate.
    ///
    /// Returns the slot id; the caller owns the matching response slot
    /// and must consume it with [`TextConn::respond`] or
    /// [`TextConn::skip_response`].
    pub fn send(&self, line: &str) -> Result<u64> {
        let id = self.next();
        self.start_request(id);
        let written = self.write_line(line);
        self.end_request(id);
        written.map(|_| id)
    }

    /// Run `read` inside the response slot for `id`.
    pub fn respond<T>(&self, id: u64, read: impl FnOnce(&TextConn) -> Result<T>) -> Result<T> {
        self.start_response(id);
        let out = read(self);
        self.end_response(id);
        out
    }

    /// Consume the response slot for `id` without reading any bytes.
    ///
    /// Used for commands the server answers through another in-flight
    /// response (`noidle`) or not at all (command-list members, whose
    /// output arrives inside `command_list_end`'s slot).
    pub fn skip_response(&self, id: u64) {
        self.start_response(id);
        self.end_response(id);
    }

    /// Write `line` terminated by a single `\n` and flush.
    ///
    /// This bypasses the pipeline; use [`TextConn::send`] unless the line
    /// is outside the request/response exchange (the `close` farewell).
    pub fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self.writer.lock().expect("writer lock poisoned");
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        tracing::trace!(line = %line, "request line sent");
        Ok(())
    }

    /// Read one line, stripping the trailing `\n`.
    pub fn read_line(&self) -> Result<String> {
        let mut reader = self.reader.lock().expect("reader lock poisoned");
        let mut buf = Vec::new();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Err(ProtoError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by peer",
            )));
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        let line = String::from_utf8_lossy(&buf).into_owned();
        tracing::trace!(line = %line, "response line received");
        Ok(line)
    }

    /// Shut the socket down in both directions.
    ///
    /// Any thread blocked in [`TextConn::read_line`] observes a transport
    /// error and returns.
    pub fn close(&self) -> Result<()> {
        self.ctrl.shutdown()?;
        Ok(())
    }
}
