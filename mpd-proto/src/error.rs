//! Error types for the wire protocol layer.

use std::fmt;
use std::io;

use thiserror::Error;

/// A parsed MPD `ACK` failure line.
///
/// The wire shape is `ACK [code@index] {command} message`. Servers (the
/// fake one included) sometimes emit reduced forms such as
/// `ACK {command} message`; missing pieces parse to `-1` / empty strings
/// and the message always carries whatever text remained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Machine-readable error code, or -1 when absent.
    pub code: i32,
    /// Index of the failing command inside a command list, or -1.
    pub command_list_index: i32,
    /// The command the server was processing, possibly empty.
    pub command: String,
    /// Human-readable description from the server.
    pub message: String,
}

impl Ack {
    pub(crate) fn parse(line: &str) -> Ack {
        let mut ack = Ack {
            code: -1,
            command_list_index: -1,
            command: String::new(),
            message: String::new(),
        };
        let mut rest = line.strip_prefix("ACK").unwrap_or(line).trim_start();
        if let Some(inner) = rest.strip_prefix('[') {
            if let Some(close) = inner.find(']') {
                if let Some((code, index)) = inner[..close].split_once('@') {
                    ack.code = code.parse().unwrap_or(-1);
                    ack.command_list_index = index.parse().unwrap_or(-1);
                }
                rest = inner[close + 1..].trim_start();
            }
        }
        if let Some(inner) = rest.strip_prefix('{') {
            if let Some((command, tail)) = inner.split_once('}') {
                ack.command = command.to_string();
                rest = tail.trim_start();
            }
        }
        ack.message = rest.to_string();
        ack
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.command.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{{{}}} {}", self.command, self.message)
        }
    }
}

/// Errors surfaced by the connection and response readers.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// The underlying socket failed; the connection is unusable.
    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    /// The response did not conform to the protocol; the connection is
    /// left in an indeterminate state and should be closed.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server rejected the command with an `ACK` line. The
    /// connection remains usable.
    #[error("server error: {0}")]
    Ack(Ack),
}

impl ProtoError {
    /// True when the peer is gone and no further commands can succeed.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtoError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

/// Convenience alias for results using [`ProtoError`].
pub type Result<T> = std::result::Result<T, ProtoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_parse_full_form() {
        let ack = Ack::parse("ACK [50@1] {play} Bad song index");
        assert_eq!(ack.code, 50);
        assert_eq!(ack.command_list_index, 1);
        assert_eq!(ack.command, "play");
        assert_eq!(ack.message, "Bad song index");
    }

    #[test]
    fn test_ack_parse_reduced_form() {
        let ack = Ack::parse("ACK {add} URI not found");
        assert_eq!(ack.code, -1);
        assert_eq!(ack.command_list_index, -1);
        assert_eq!(ack.command, "add");
        assert_eq!(ack.message, "URI not found");
    }

    #[test]
    fn test_ack_parse_unknown_command_form() {
        let ack = Ack::parse("ACK {} unknown command \"bogus\"");
        assert_eq!(ack.command, "");
        assert_eq!(ack.message, "unknown command \"bogus\"");
    }

    #[test]
    fn test_ack_parse_degenerate_line() {
        let ack = Ack::parse("ACK something went wrong");
        assert_eq!(ack.code, -1);
        assert_eq!(ack.message, "something went wrong");
    }

    #[test]
    fn test_disconnect_classification() {
        let eof = ProtoError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(eof.is_disconnect());
        let timeout = ProtoError::Io(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert!(!timeout.is_disconnect());
        assert!(!ProtoError::Protocol("bad line".into()).is_disconnect());
    }
}
