//! Readers for the three canonical MPD response shapes.
//!
//! Every successful response is zero or more `Key: Value` lines followed
//! by a terminator (`OK`, or `list_OK` inside a command list); failures
//! replace the terminator with an `ACK` line. The readers here consume
//! exactly one response from the connection's current read slot and
//! discard partial results on any parse failure.

use std::collections::HashMap;

use crate::conn::TextConn;
use crate::error::{Ack, ProtoError, Result};

/// A set of attributes returned by MPD.
pub type Attrs = HashMap<String, String>;

fn split_pair(line: &str) -> Result<(&str, &str)> {
    line.split_once(": ")
        .ok_or_else(|| ProtoError::Protocol(format!("can't parse line: {line}")))
}

impl TextConn {
    /// Read one response line, surfacing `ACK` failures as errors.
    pub fn read_response_line(&self) -> Result<String> {
        let line = self.read_line()?;
        if line.starts_with("ACK ") {
            return Err(ProtoError::Ack(Ack::parse(&line)));
        }
        Ok(line)
    }

    /// Read a single attribute block terminated by `terminator`.
    pub fn read_attrs(&self, terminator: &str) -> Result<Attrs> {
        let mut attrs = Attrs::new();
        loop {
            let line = self.read_response_line()?;
            if line == terminator {
                return Ok(attrs);
            }
            let (key, value) = split_pair(&line)?;
            attrs.insert(key.to_string(), value.to_string());
        }
    }

    /// Read an ordered list of attribute blocks terminated by `OK`.
    ///
    /// A line beginning `start_key: ` opens a new block; subsequent
    /// attribute lines populate the current one. An attribute line before
    /// the first block is a protocol error.
    pub fn read_attrs_list(&self, start_key: &str) -> Result<Vec<Attrs>> {
        let prefix = format!("{start_key}: ");
        let mut list: Vec<Attrs> = Vec::new();
        loop {
            let line = self.read_response_line()?;
            if line == "OK" {
                return Ok(list);
            }
            if line.starts_with(&prefix) {
                list.push(Attrs::new());
            }
            let (key, value) = split_pair(&line)?;
            let entry = list
                .last_mut()
                .ok_or_else(|| ProtoError::Protocol(format!("unexpected line: {line}")))?;
            entry.insert(key.to_string(), value.to_string());
        }
    }

    /// Read an ordered list of raw values, each labelled `key`,
    /// terminated by `OK`.
    pub fn read_list(&self, key: &str) -> Result<Vec<String>> {
        let prefix = format!("{key}: ");
        let mut list = Vec::new();
        loop {
            let line = self.read_response_line()?;
            if line == "OK" {
                return Ok(list);
            }
            let value = line
                .strip_prefix(&prefix)
                .ok_or_else(|| ProtoError::Protocol(format!("unexpected line: {line}")))?;
            list.push(value.to_string());
        }
    }

    /// Verify the next line is exactly `terminator`.
    pub fn read_ok_line(&self, terminator: &str) -> Result<()> {
        let line = self.read_response_line()?;
        if line == terminator {
            return Ok(());
        }
        Err(ProtoError::Protocol(format!("unexpected response: {line}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    /// Connect a `TextConn` to a peer that writes `lines` and hangs up.
    fn conn_fed_with(lines: &[&str]) -> TextConn {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let script: Vec<String> = lines.iter().map(|l| format!("{l}\n")).collect();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            for line in script {
                stream.write_all(line.as_bytes()).unwrap();
            }
        });
        TextConn::connect("tcp", &addr.to_string()).unwrap()
    }

    #[test]
    fn test_read_attrs_block() {
        let conn = conn_fed_with(&["volume: 50", "state: play", "OK"]);
        let attrs = conn.read_attrs("OK").unwrap();
        assert_eq!(attrs.get("volume").unwrap(), "50");
        assert_eq!(attrs.get("state").unwrap(), "play");
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_read_attrs_rejects_unparseable_line() {
        let conn = conn_fed_with(&["volume: 50", "garbage", "OK"]);
        let err = conn.read_attrs("OK").unwrap_err();
        assert!(matches!(err, ProtoError::Protocol(_)));
    }

    #[test]
    fn test_read_attrs_surfaces_ack() {
        let conn = conn_fed_with(&["ACK [2@0] {play} Bad song index"]);
        let err = conn.read_attrs("OK").unwrap_err();
        match err {
            ProtoError::Ack(ack) => assert_eq!(ack.message, "Bad song index"),
            other => panic!("expected Ack, got {other:?}"),
        }
    }

    #[test]
    fn test_read_attrs_list_groups_by_start_key() {
        let conn = conn_fed_with(&[
            "file: a.ogg",
            "Title: A",
            "file: b.ogg",
            "Title: B",
            "OK",
        ]);
        let list = conn.read_attrs_list("file").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].get("file").unwrap(), "a.ogg");
        assert_eq!(list[0].get("Title").unwrap(), "A");
        assert_eq!(list[1].get("file").unwrap(), "b.ogg");
    }

    #[test]
    fn test_read_attrs_list_rejects_attribute_before_entry() {
        let conn = conn_fed_with(&["Title: orphan", "OK"]);
        let err = conn.read_attrs_list("file").unwrap_err();
        assert!(matches!(err, ProtoError::Protocol(_)));
    }

    #[test]
    fn test_read_attrs_list_empty_response() {
        let conn = conn_fed_with(&["OK"]);
        assert!(conn.read_attrs_list("file").unwrap().is_empty());
    }

    #[test]
    fn test_read_list_preserves_order() {
        let conn = conn_fed_with(&["changed: player", "changed: mixer", "OK"]);
        let list = conn.read_list("changed").unwrap();
        assert_eq!(list, vec!["player", "mixer"]);
    }

    #[test]
    fn test_read_list_rejects_foreign_key() {
        let conn = conn_fed_with(&["file: a.ogg", "OK"]);
        assert!(conn.read_list("changed").is_err());
    }

    #[test]
    fn test_read_ok_line() {
        let conn = conn_fed_with(&["OK", "list_OK"]);
        conn.read_ok_line("OK").unwrap();
        conn.read_ok_line("list_OK").unwrap();
    }

    #[test]
    fn test_read_ok_line_rejects_other_lines() {
        let conn = conn_fed_with(&["volume: 50"]);
        let err = conn.read_ok_line("OK").unwrap_err();
        assert!(matches!(err, ProtoError::Protocol(_)));
    }
}
