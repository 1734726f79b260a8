//! Batched command execution with deferred results.
//!
//! MPD's command lists (`command_list_ok_begin` … `command_list_end`) run
//! a batch of commands in one exchange, answering `list_OK` per command
//! and a final `OK`. Because responses only arrive once the whole batch
//! is flushed, commands that produce output hand back a *promise*: a slot
//! that flips from pending to ready when [`CommandList::end`] binds the
//! matching response to it.

use std::sync::{Arc, Mutex};

use mpd_proto::{quote, Attrs, ProtoError};

use crate::client::Client;
use crate::error::{ApiError, Result};

/// A set of attributes MPD has promised to return.
#[derive(Debug, Clone)]
pub struct PromisedAttrs {
    slot: Arc<Mutex<Option<Attrs>>>,
}

impl PromisedAttrs {
    fn new() -> PromisedAttrs {
        PromisedAttrs {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// The computed attributes, or [`ApiError::PendingPromise`] while the
    /// owning command list has not completed.
    pub fn value(&self) -> Result<Attrs> {
        self.slot
            .lock()
            .expect("promise lock poisoned")
            .clone()
            .ok_or(ApiError::PendingPromise)
    }
}

/// A song identifier MPD has promised to return.
#[derive(Debug, Clone)]
pub struct PromisedId {
    slot: Arc<Mutex<Option<i32>>>,
}

impl PromisedId {
    fn new() -> PromisedId {
        PromisedId {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// The computed id, or [`ApiError::PendingPromise`] while the owning
    /// command list has not completed.
    pub fn value(&self) -> Result<i32> {
        self.slot
            .lock()
            .expect("promise lock poisoned")
            .ok_or(ApiError::PendingPromise)
    }
}

/// How a queued command's `list_OK` response binds back to its call site.
enum ResponseKind {
    None,
    Attrs(Arc<Mutex<Option<Attrs>>>),
    Id(Arc<Mutex<Option<i32>>>),
}

struct Queued {
    line: String,
    kind: ResponseKind,
}

/// A batch of MPD commands dispatched in one exchange.
///
/// Wrappers mirror the synchronous catalogue but enqueue instead of
/// sending; methods that would return attributes hand back a promise.
/// Nothing reaches the wire until [`CommandList::end`], which is
/// all-or-nothing from the caller's view: on any failure the error is
/// returned and promises already resolved should be discarded. The queue
/// is cleared either way, so the list is reusable.
pub struct CommandList<'a> {
    client: &'a Client,
    queue: Vec<Queued>,
}

impl Client {
    /// Start a new command list bound to this connection.
    pub fn begin_command_list(&self) -> CommandList<'_> {
        CommandList {
            client: self,
            queue: Vec::new(),
        }
    }
}

impl CommandList<'_> {
    fn push(&mut self, line: impl Into<String>) {
        self.queue.push(Queued {
            line: line.into(),
            kind: ResponseKind::None,
        });
    }

    fn push_attrs(&mut self, line: impl Into<String>) -> PromisedAttrs {
        let promise = PromisedAttrs::new();
        self.queue.push(Queued {
            line: line.into(),
            kind: ResponseKind::Attrs(Arc::clone(&promise.slot)),
        });
        promise
    }

    /// Send a no-op message.
    pub fn ping(&mut self) {
        self.push("ping");
    }

    /// Information about the current song in the playlist.
    pub fn current_song(&mut self) -> PromisedAttrs {
        self.push_attrs("currentsong")
    }

    /// Information about the current status of MPD.
    pub fn status(&mut self) -> PromisedAttrs {
        self.push_attrs("status")
    }

    /// Play the next song in the playlist.
    pub fn next(&mut self) {
        self.push("next");
    }

    /// Play the previous song in the playlist.
    pub fn previous(&mut self) {
        self.push("previous");
    }

    /// Stop playback.
    pub fn stop(&mut self) {
        self.push("stop");
    }

    /// Pause playback if `pause` is true; resume otherwise.
    pub fn pause(&mut self, pause: bool) {
        self.push(if pause { "pause 1" } else { "pause 0" });
    }

    /// Start playing at playlist position `pos`, or the current position
    /// when `pos` is negative.
    pub fn play(&mut self, pos: i32) {
        if pos < 0 {
            self.push("play");
        } else {
            self.push(format!("play {pos}"));
        }
    }

    /// Play the song identified by `id`, or the current position when
    /// `id` is negative.
    pub fn play_id(&mut self, id: i32) {
        if id < 0 {
            self.push("playid");
        } else {
            self.push(format!("playid {id}"));
        }
    }

    /// Seek to `time` (seconds) within the song at position `pos`.
    pub fn seek(&mut self, pos: i32, time: i32) {
        self.push(format!("seek {pos} {time}"));
    }

    /// Like `seek`, but the song is identified by its id.
    pub fn seek_id(&mut self, id: i32, time: i32) {
        self.push(format!("seekid {id} {time}"));
    }

    /// Set the volume (0-100).
    pub fn set_volume(&mut self, volume: i32) {
        self.push(format!("setvol {volume}"));
    }

    /// Enable or disable random playback.
    pub fn random(&mut self, random: bool) {
        self.push(if random { "random 1" } else { "random 0" });
    }

    /// Enable or disable repeat mode.
    pub fn repeat(&mut self, repeat: bool) {
        self.push(if repeat { "repeat 1" } else { "repeat 0" });
    }

    /// Enable or disable single mode.
    pub fn single(&mut self, single: bool) {
        self.push(if single { "single 1" } else { "single 0" });
    }

    /// Enable or disable consume mode.
    pub fn consume(&mut self, consume: bool) {
        self.push(if consume { "consume 1" } else { "consume 0" });
    }

    /// Delete the range `[start, end)` from the playlist, or the song at
    /// `start` when `end` is negative.
    pub fn delete(&mut self, start: i32, end: i32) -> Result<()> {
        if start < 0 {
            return Err(ApiError::InvalidArgument("negative start index"));
        }
        if end < 0 {
            self.push(format!("delete {start}"));
        } else {
            self.push(format!("delete {start}:{end}"));
        }
        Ok(())
    }

    /// Delete the song identified by `id`.
    pub fn delete_id(&mut self, id: i32) {
        self.push(format!("deleteid {id}"));
    }

    /// Move the songs in `[start, end)` to `position`, or just the song
    /// at `start` when `end` is negative.
    pub fn move_range(&mut self, start: i32, end: i32, position: i32) -> Result<()> {
        if start < 0 {
            return Err(ApiError::InvalidArgument("negative start index"));
        }
        if end < 0 {
            self.push(format!("move {start} {position}"));
        } else {
            self.push(format!("move {start}:{end} {position}"));
        }
        Ok(())
    }

    /// Move the song identified by `id` to `position`.
    pub fn move_id(&mut self, id: i32, position: i32) {
        self.push(format!("moveid {id} {position}"));
    }

    /// Add the file or directory `uri` to the playlist.
    pub fn add(&mut self, uri: &str) {
        self.push(format!("add {}", quote(uri)));
    }

    /// Add `uri` to the playlist, returning a promise for the id the
    /// server assigns. A non-negative `pos` inserts at that position.
    pub fn add_id(&mut self, uri: &str, pos: i32) -> PromisedId {
        let promise = PromisedId::new();
        let line = if pos >= 0 {
            format!("addid {} {pos}", quote(uri))
        } else {
            format!("addid {}", quote(uri))
        };
        self.queue.push(Queued {
            line,
            kind: ResponseKind::Id(Arc::clone(&promise.slot)),
        });
        promise
    }

    /// Clear the current playlist.
    pub fn clear(&mut self) {
        self.push("clear");
    }

    /// Shuffle the range `[start, end)`, or the whole playlist when
    /// either bound is negative.
    pub fn shuffle(&mut self, start: i32, end: i32) {
        if start < 0 || end < 0 {
            self.push("shuffle");
        } else {
            self.push(format!("shuffle {start}:{end}"));
        }
    }

    /// Update MPD's database under `uri` (empty = everything). The
    /// promised attributes carry the `updating_db` job id.
    pub fn update(&mut self, uri: &str) -> PromisedAttrs {
        self.push_attrs(format!("update {}", quote(uri)))
    }

    /// Enable the audio output with the given id.
    pub fn enable_output(&mut self, id: i32) {
        self.push(format!("enableoutput {id}"));
    }

    /// Disable the audio output with the given id.
    pub fn disable_output(&mut self, id: i32) {
        self.push(format!("disableoutput {id}"));
    }

    /// Load the stored playlist `name` into the queue; when both bounds
    /// are non-negative, only the range `[start, end)`.
    pub fn playlist_load(&mut self, name: &str, start: i32, end: i32) {
        if start < 0 || end < 0 {
            self.push(format!("load {}", quote(name)));
        } else {
            self.push(format!("load {} {start}:{end}", quote(name)));
        }
    }

    /// Add the song `uri` to the stored playlist `name`.
    pub fn playlist_add(&mut self, name: &str, uri: &str) {
        self.push(format!("playlistadd {} {}", quote(name), quote(uri)));
    }

    /// Clear the stored playlist `name`.
    pub fn playlist_clear(&mut self, name: &str) {
        self.push(format!("playlistclear {}", quote(name)));
    }

    /// Delete the song at `pos` from the stored playlist `name`.
    pub fn playlist_delete(&mut self, name: &str, pos: i32) {
        self.push(format!("playlistdelete {} {pos}", quote(name)));
    }

    /// Move the song identified by `id` within the stored playlist
    /// `name` to position `pos`.
    pub fn playlist_move(&mut self, name: &str, id: i32, pos: i32) {
        self.push(format!("playlistmove {} {id} {pos}", quote(name)));
    }

    /// Rename the stored playlist `name` to `new_name`.
    pub fn playlist_rename(&mut self, name: &str, new_name: &str) {
        self.push(format!("rename {} {}", quote(name), quote(new_name)));
    }

    /// Remove the stored playlist `name`.
    pub fn playlist_remove(&mut self, name: &str) {
        self.push(format!("rm {}", quote(name)));
    }

    /// Save the current queue as the stored playlist `name`.
    pub fn playlist_save(&mut self, name: &str) {
        self.push(format!("save {}", quote(name)));
    }

    /// Execute the queued commands.
    ///
    /// Flushes `command_list_ok_begin`, every queued line, and
    /// `command_list_end`, then binds one `list_OK`-terminated response
    /// per queued command, in order, before consuming the final `OK`.
    /// Returns the first failure; the queue is cleared regardless.
    pub fn end(&mut self) -> Result<()> {
        let queue = std::mem::take(&mut self.queue);
        let conn = &self.client.conn;

        let begin = conn.send("command_list_ok_begin")?;
        conn.skip_response(begin);
        for queued in &queue {
            let id = conn.send(&queued.line)?;
            conn.skip_response(id);
        }
        let end = conn.send("command_list_end")?;

        conn.respond(end, |c| {
            for queued in &queue {
                match &queued.kind {
                    ResponseKind::None => c.read_ok_line("list_OK")?,
                    ResponseKind::Attrs(slot) => {
                        let attrs = c.read_attrs("list_OK")?;
                        *slot.lock().expect("promise lock poisoned") = Some(attrs);
                    }
                    ResponseKind::Id(slot) => {
                        let attrs = c.read_attrs("list_OK")?;
                        let id = attrs
                            .get("Id")
                            .ok_or_else(|| {
                                ProtoError::Protocol("addid did not return Id".into())
                            })?
                            .parse()
                            .map_err(|_| {
                                ProtoError::Protocol("addid returned a malformed Id".into())
                            })?;
                        *slot.lock().expect("promise lock poisoned") = Some(id);
                    }
                }
            }
            c.read_ok_line("OK")
        })?;
        Ok(())
    }
}
