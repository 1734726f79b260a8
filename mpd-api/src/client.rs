//! The user-facing MPD client handle.

use std::sync::atomic::{AtomicBool, Ordering};

use mpd_proto::{quote, Attrs, ProtoError, TextConn};

use crate::error::{ApiError, Result};

/// A client connection to an MPD server.
///
/// Every method sends one command and consumes its response. Methods take
/// `&self`: the connection's request/response slots serialize concurrent
/// callers, so a `Client` can be shared behind an `Arc` without external
/// locking. A second command issued before the first returns simply waits
/// its turn, and any method may block on the socket arbitrarily long.
#[derive(Debug)]
pub struct Client {
    pub(crate) conn: TextConn,
    closed: AtomicBool,
}

impl Client {
    /// Connect to MPD listening on `addr` (e.g. `"127.0.0.1:6600"`) over
    /// `network` (`"tcp"` or `"unix"`).
    ///
    /// The server must greet with a line starting `OK MPD`; anything else
    /// fails with [`ApiError::Greeting`].
    pub fn dial(network: &str, addr: &str) -> Result<Client> {
        let conn = TextConn::connect(network, addr)?;
        let line = conn.read_line()?;
        if !line.starts_with("OK MPD") {
            return Err(ApiError::Greeting(line));
        }
        tracing::debug!(%addr, greeting = %line, "connected to MPD");
        Ok(Client {
            conn,
            closed: AtomicBool::new(false),
        })
    }

    /// Like [`Client::dial`], then authenticate with the plaintext
    /// `password` if it is non-empty.
    pub fn dial_authenticated(network: &str, addr: &str, password: &str) -> Result<Client> {
        let client = Client::dial(network, addr)?;
        if !password.is_empty() {
            client.ok_cmd(&format!("password {}", quote(password)))?;
        }
        Ok(client)
    }

    /// Terminate the connection: send the `close` farewell and shut the
    /// socket down. The handle becomes inert; calling again is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // The farewell is best-effort; the shutdown is what matters.
        let _ = self.conn.write_line("close");
        self.conn.close()?;
        Ok(())
    }

    /// Send a no-op message. Useful for keeping the connection alive.
    pub fn ping(&self) -> Result<()> {
        self.ok_cmd("ping")
    }

    //
    // Command plumbing shared by the catalogue, the low-level `Command`
    // builder, and the command-list executor.
    //

    pub(crate) fn ok_cmd(&self, line: &str) -> Result<()> {
        let id = self.conn.send(line)?;
        self.conn.respond(id, |c| c.read_ok_line("OK"))?;
        Ok(())
    }

    pub(crate) fn attrs_cmd(&self, line: &str) -> Result<Attrs> {
        let id = self.conn.send(line)?;
        Ok(self.conn.respond(id, |c| c.read_attrs("OK"))?)
    }

    pub(crate) fn attrs_list_cmd(&self, line: &str, start_key: &str) -> Result<Vec<Attrs>> {
        let id = self.conn.send(line)?;
        Ok(self.conn.respond(id, |c| c.read_attrs_list(start_key))?)
    }

    pub(crate) fn list_cmd(&self, line: &str, key: &str) -> Result<Vec<String>> {
        let id = self.conn.send(line)?;
        Ok(self.conn.respond(id, |c| c.read_list(key))?)
    }

    //
    // Status queries
    //

    /// Information about the current song in the playlist.
    pub fn current_song(&self) -> Result<Attrs> {
        self.attrs_cmd("currentsong")
    }

    /// Information about the current status of MPD.
    pub fn status(&self) -> Result<Attrs> {
        self.attrs_cmd("status")
    }

    /// Database statistics: number of artists, songs, playtime, etc.
    pub fn stats(&self) -> Result<Attrs> {
        self.attrs_cmd("stats")
    }

    //
    // Playback control
    //

    /// Play the next song in the playlist.
    pub fn next(&self) -> Result<()> {
        self.ok_cmd("next")
    }

    /// Play the previous song in the playlist.
    pub fn previous(&self) -> Result<()> {
        self.ok_cmd("previous")
    }

    /// Stop playback.
    pub fn stop(&self) -> Result<()> {
        self.ok_cmd("stop")
    }

    /// Pause playback if `pause` is true; resume otherwise.
    pub fn pause(&self, pause: bool) -> Result<()> {
        self.ok_cmd(if pause { "pause 1" } else { "pause 0" })
    }

    /// Start playing the song at playlist position `pos`. A negative
    /// `pos` means the current position.
    pub fn play(&self, pos: i32) -> Result<()> {
        if pos < 0 {
            return self.ok_cmd("play");
        }
        self.ok_cmd(&format!("play {pos}"))
    }

    /// Play the song identified by `id`. A negative `id` means the
    /// current position.
    pub fn play_id(&self, id: i32) -> Result<()> {
        if id < 0 {
            return self.ok_cmd("playid");
        }
        self.ok_cmd(&format!("playid {id}"))
    }

    /// Seek to `time` (seconds) within the song at playlist position
    /// `pos`.
    pub fn seek(&self, pos: i32, time: i32) -> Result<()> {
        self.ok_cmd(&format!("seek {pos} {time}"))
    }

    /// Like [`Client::seek`], but the song is identified by its id.
    pub fn seek_id(&self, id: i32, time: i32) -> Result<()> {
        self.ok_cmd(&format!("seekid {id} {time}"))
    }

    /// Set the volume (0-100).
    pub fn set_volume(&self, volume: i32) -> Result<()> {
        self.ok_cmd(&format!("setvol {volume}"))
    }

    /// Enable or disable random playback.
    pub fn random(&self, random: bool) -> Result<()> {
        self.ok_cmd(if random { "random 1" } else { "random 0" })
    }

    /// Enable or disable repeat mode.
    pub fn repeat(&self, repeat: bool) -> Result<()> {
        self.ok_cmd(if repeat { "repeat 1" } else { "repeat 0" })
    }

    /// Enable or disable single mode (stop after the current song).
    pub fn single(&self, single: bool) -> Result<()> {
        self.ok_cmd(if single { "single 1" } else { "single 0" })
    }

    /// Enable or disable consume mode (remove played songs).
    pub fn consume(&self, consume: bool) -> Result<()> {
        self.ok_cmd(if consume { "consume 1" } else { "consume 0" })
    }

    //
    // Current playlist
    //

    /// Attributes for songs in the current playlist.
    ///
    /// With both `start` and `end` negative, all songs are returned; with
    /// only `end` negative, the single song at `start`; otherwise the
    /// half-open range `[start, end)`. A negative `start` with a
    /// non-negative `end` fails without sending anything.
    pub fn playlist_info(&self, start: i32, end: i32) -> Result<Vec<Attrs>> {
        let line = match (start >= 0, end >= 0) {
            (false, false) => "playlistinfo".to_string(),
            (true, true) => format!("playlistinfo {start}:{end}"),
            (true, false) => format!("playlistinfo {start}"),
            (false, true) => return Err(ApiError::InvalidArgument("negative start index")),
        };
        self.attrs_list_cmd(&line, "file")
    }

    /// Delete songs from the playlist: the range `[start, end)`, or just
    /// the song at `start` when `end` is negative.
    pub fn delete(&self, start: i32, end: i32) -> Result<()> {
        if start < 0 {
            return Err(ApiError::InvalidArgument("negative start index"));
        }
        if end < 0 {
            return self.ok_cmd(&format!("delete {start}"));
        }
        self.ok_cmd(&format!("delete {start}:{end}"))
    }

    /// Delete the song identified by `id`.
    pub fn delete_id(&self, id: i32) -> Result<()> {
        self.ok_cmd(&format!("deleteid {id}"))
    }

    /// Move the songs in `[start, end)` to `position`. When `end` is
    /// negative, only the song at `start` is moved.
    pub fn move_range(&self, start: i32, end: i32, position: i32) -> Result<()> {
        if start < 0 {
            return Err(ApiError::InvalidArgument("negative start index"));
        }
        if end < 0 {
            return self.ok_cmd(&format!("move {start} {position}"));
        }
        self.ok_cmd(&format!("move {start}:{end} {position}"))
    }

    /// Move the song identified by `id` to `position`.
    pub fn move_id(&self, id: i32, position: i32) -> Result<()> {
        self.ok_cmd(&format!("moveid {id} {position}"))
    }

    /// Add the file or directory `uri` to the playlist. Directories add
    /// recursively.
    pub fn add(&self, uri: &str) -> Result<()> {
        self.ok_cmd(&format!("add {}", quote(uri)))
    }

    /// Add `uri` to the playlist and return the id assigned to it. A
    /// non-negative `pos` inserts at that position.
    pub fn add_id(&self, uri: &str, pos: i32) -> Result<i32> {
        let line = if pos >= 0 {
            format!("addid {} {pos}", quote(uri))
        } else {
            format!("addid {}", quote(uri))
        };
        let attrs = self.attrs_cmd(&line)?;
        let id = attrs
            .get("Id")
            .ok_or_else(|| ProtoError::Protocol("addid did not return Id".into()))?;
        id.parse()
            .map_err(|_| ProtoError::Protocol(format!("addid returned malformed Id: {id}")).into())
    }

    /// Clear the current playlist.
    pub fn clear(&self) -> Result<()> {
        self.ok_cmd("clear")
    }

    /// Shuffle the range `[start, end)` of the playlist, or the whole
    /// playlist when either bound is negative.
    pub fn shuffle(&self, start: i32, end: i32) -> Result<()> {
        if start < 0 || end < 0 {
            return self.ok_cmd("shuffle");
        }
        self.ok_cmd(&format!("shuffle {start}:{end}"))
    }

    //
    // Database queries
    //

    /// The entire list of files in the MPD database.
    pub fn get_files(&self) -> Result<Vec<String>> {
        self.list_cmd("list file", "file")
    }

    /// Update MPD's database: find new files, remove deleted files,
    /// update modified files. An empty `uri` updates everything. Returns
    /// the id of the enqueued update job.
    pub fn update(&self, uri: &str) -> Result<i32> {
        let id = self.conn.send(&format!("update {}", quote(uri)))?;
        Ok(self.conn.respond(id, |c| {
            let line = c.read_response_line()?;
            let job = line
                .strip_prefix("updating_db: ")
                .ok_or_else(|| ProtoError::Protocol(format!("unexpected response: {line}")))?
                .parse()
                .map_err(|_| ProtoError::Protocol(format!("malformed job id: {line}")))?;
            c.read_ok_line("OK")?;
            Ok(job)
        })?)
    }

    /// Attributes for every song inside or matching `uri`. Pass `"/"`
    /// for the whole library. Directory lines close the current entry;
    /// no attributes are collected for directories themselves.
    pub fn list_all_info(&self, uri: &str) -> Result<Vec<Attrs>> {
        let id = self.conn.send(&format!("listallinfo {}", quote(uri)))?;
        Ok(self.conn.respond(id, |c| {
            let mut list: Vec<Attrs> = Vec::new();
            let mut in_entry = false;
            loop {
                let line = c.read_response_line()?;
                if line == "OK" {
                    return Ok(list);
                } else if line.starts_with("file: ") {
                    list.push(Attrs::new());
                    in_entry = true;
                } else if line.starts_with("directory: ") {
                    in_entry = false;
                }
                if in_entry {
                    let (key, value) = line
                        .split_once(": ")
                        .ok_or_else(|| ProtoError::Protocol(format!("can't parse line: {line}")))?;
                    let entry = list
                        .last_mut()
                        .ok_or_else(|| ProtoError::Protocol(format!("unexpected line: {line}")))?;
                    entry.insert(key.to_string(), value.to_string());
                }
            }
        })?)
    }

    /// The contents of the directory `uri`, via `lsinfo`. Entries open
    /// on `file:`, `directory:`, or `playlist:` lines; keys are
    /// lowercased.
    pub fn list_info(&self, uri: &str) -> Result<Vec<Attrs>> {
        let id = self.conn.send(&format!("lsinfo {}", quote(uri)))?;
        Ok(self.conn.respond(id, |c| {
            let mut list: Vec<Attrs> = Vec::new();
            loop {
                let line = c.read_response_line()?;
                if line == "OK" {
                    return Ok(list);
                }
                if line.starts_with("file: ")
                    || line.starts_with("directory: ")
                    || line.starts_with("playlist: ")
                {
                    list.push(Attrs::new());
                }
                let (key, value) = line
                    .split_once(": ")
                    .ok_or_else(|| ProtoError::Protocol(format!("can't parse line: {line}")))?;
                let entry = list
                    .last_mut()
                    .ok_or_else(|| ProtoError::Protocol(format!("unexpected line: {line}")))?;
                entry.insert(key.to_ascii_lowercase(), value.to_string());
            }
        })?)
    }

    /// Attributes for library songs matching `query`, e.g.
    /// `artist "Newcleus" album "Jam On It"`.
    pub fn find(&self, query: &str) -> Result<Vec<Attrs>> {
        self.attrs_list_cmd(&format!("find {}", quote(query)), "file")
    }

    /// Search the database for tag values, e.g. `artist`, or
    /// `artist album <name>`. Values are collected regardless of their
    /// key label.
    pub fn list(&self, query: &str) -> Result<Vec<String>> {
        let id = self.conn.send(&format!("list {}", quote(query)))?;
        Ok(self.conn.respond(id, |c| {
            let mut values = Vec::new();
            loop {
                let line = c.read_response_line()?;
                if line == "OK" {
                    return Ok(values);
                }
                match line.split_once(": ") {
                    Some((key, value)) if !key.is_empty() => values.push(value.to_string()),
                    _ => {
                        return Err(ProtoError::Protocol(format!("can't parse line: {line}")));
                    }
                }
            }
        })?)
    }

    //
    // Outputs
    //

    /// All configured outputs with their name, id, and enabled state.
    pub fn list_outputs(&self) -> Result<Vec<Attrs>> {
        self.attrs_list_cmd("outputs", "outputid")
    }

    /// Enable the audio output with the given id.
    pub fn enable_output(&self, id: i32) -> Result<()> {
        self.ok_cmd(&format!("enableoutput {id}"))
    }

    /// Disable the audio output with the given id.
    pub fn disable_output(&self, id: i32) -> Result<()> {
        self.ok_cmd(&format!("disableoutput {id}"))
    }

    //
    // Stored playlists
    //

    /// All stored playlists.
    pub fn list_playlists(&self) -> Result<Vec<Attrs>> {
        self.attrs_list_cmd("listplaylists", "playlist")
    }

    /// Attributes for the songs in the stored playlist `name`.
    pub fn playlist_contents(&self, name: &str) -> Result<Vec<Attrs>> {
        self.attrs_list_cmd(&format!("listplaylistinfo {}", quote(name)), "file")
    }

    /// Load the stored playlist `name` into the current queue; when both
    /// bounds are non-negative, only the range `[start, end)`.
    pub fn playlist_load(&self, name: &str, start: i32, end: i32) -> Result<()> {
        if start < 0 || end < 0 {
            return self.ok_cmd(&format!("load {}", quote(name)));
        }
        self.ok_cmd(&format!("load {} {start}:{end}", quote(name)))
    }

    /// Add the song `uri` to the stored playlist `name`.
    pub fn playlist_add(&self, name: &str, uri: &str) -> Result<()> {
        self.ok_cmd(&format!("playlistadd {} {}", quote(name), quote(uri)))
    }

    /// Clear the stored playlist `name`.
    pub fn playlist_clear(&self, name: &str) -> Result<()> {
        self.ok_cmd(&format!("playlistclear {}", quote(name)))
    }

    /// Delete the song at `pos` from the stored playlist `name`.
    pub fn playlist_delete(&self, name: &str, pos: i32) -> Result<()> {
        self.ok_cmd(&format!("playlistdelete {} {pos}", quote(name)))
    }

    /// Move the song identified by `id` within the stored playlist
    /// `name` to position `pos`.
    pub fn playlist_move(&self, name: &str, id: i32, pos: i32) -> Result<()> {
        self.ok_cmd(&format!("playlistmove {} {id} {pos}", quote(name)))
    }

    /// Rename the stored playlist `name` to `new_name`.
    pub fn playlist_rename(&self, name: &str, new_name: &str) -> Result<()> {
        self.ok_cmd(&format!("rename {} {}", quote(name), quote(new_name)))
    }

    /// Remove the stored playlist `name` from the playlist directory.
    pub fn playlist_remove(&self, name: &str) -> Result<()> {
        self.ok_cmd(&format!("rm {}", quote(name)))
    }

    /// Save the current queue as the stored playlist `name`.
    pub fn playlist_save(&self, name: &str) -> Result<()> {
        self.ok_cmd(&format!("save {}", quote(name)))
    }

    //
    // Idle
    //

    /// Block until at least one of `subsystems` changes (empty = all)
    /// and return the changed subsystem names in server order.
    ///
    /// Low-level: while an `idle` is in flight the connection carries no
    /// other command except [`Client::no_idle`]. The watcher in
    /// `mpd-stream` wraps this into an event stream.
    pub fn idle<S: AsRef<str>>(&self, subsystems: &[S]) -> Result<Vec<String>> {
        let line = if subsystems.is_empty() {
            "idle".to_string()
        } else {
            let names: Vec<&str> = subsystems.iter().map(|s| s.as_ref()).collect();
            format!("idle {}", names.join(" "))
        };
        let id = self.conn.send(&line)?;
        Ok(self.conn.respond(id, |c| c.read_list("changed"))?)
    }

    /// Cancel an in-flight [`Client::idle`].
    ///
    /// The server answers through the outstanding `idle` response
    /// (possibly with an empty changed-set), so this consumes its own
    /// response slot without reading.
    pub fn no_idle(&self) -> Result<()> {
        let id = self.conn.send("noidle")?;
        self.conn.skip_response(id);
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
