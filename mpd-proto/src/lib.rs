//! Low-level wire protocol for MPD (Music Player Daemon).
//!
//! This crate provides the transport layer the higher-level client crates
//! build on: the argument quoting codec, a pipelined line-oriented
//! connection over TCP or UNIX domain sockets, and readers for the three
//! canonical MPD response shapes. The protocol reference can be found at
//! <https://www.musicpd.org/doc/html/protocol.html>.

mod codec;
mod conn;
mod error;
mod response;

pub use codec::{parse_args, quote, unquote};
pub use conn::TextConn;
pub use error::{Ack, ProtoError, Result};
pub use response::Attrs;
