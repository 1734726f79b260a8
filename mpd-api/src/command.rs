//! Low-level access to the MPD protocol.

use mpd_proto::Attrs;

use crate::client::Client;
use crate::error::Result;

/// A raw MPD command, finished by choosing a response shape.
///
/// This enables protocol-level access for verbs the typed catalogue does
/// not wrap and should be avoided unless you are familiar with the MPD
/// protocol. Arguments are not quoted automatically; use
/// [`mpd_proto::quote`] for anything that may contain whitespace or
/// quotes.
pub struct Command<'a> {
    client: &'a Client,
    line: String,
}

impl Client {
    /// Build a raw protocol command.
    pub fn command(&self, line: impl Into<String>) -> Command<'_> {
        Command {
            client: self,
            line: line.into(),
        }
    }
}

impl Command<'_> {
    /// Send the command and expect a bare `OK`.
    pub fn ok(self) -> Result<()> {
        self.client.ok_cmd(&self.line)
    }

    /// Send the command and read a single attribute block.
    pub fn attrs(self) -> Result<Attrs> {
        self.client.attrs_cmd(&self.line)
    }

    /// Send the command and read a list of attribute blocks, each
    /// starting with `start_key`.
    pub fn attrs_list(self, start_key: &str) -> Result<Vec<Attrs>> {
        self.client.attrs_list_cmd(&self.line, start_key)
    }

    /// Send the command and read a list of values labelled `key`.
    pub fn strings(self, key: &str) -> Result<Vec<String>> {
        self.client.list_cmd(&self.line, key)
    }
}
