//! Request dispatcher: one MPD command in, response lines out.

use std::io;

use crossbeam_channel::Sender;

use crate::playlist::QueueEntry;
use crate::server::ConnWriter;
use crate::state::{PlayState, State};

/// How a dispatched command ended.
pub(crate) enum Outcome {
    /// The command succeeded and its terminator was written.
    Done,
    /// The command failed; an `ACK` replaced the terminator.
    Failed,
    /// The client asked to close the connection.
    Closed,
}

/// Parse a `start:end` range argument (or a bare position) into a
/// half-open index range.
fn parse_range(arg: &str) -> Result<(usize, usize), &'static str> {
    let parts: Vec<&str> = arg.split(':').collect();
    match parts.len() {
        1 => {
            let i: i64 = parts[0].parse().map_err(|_| "invalid song position")?;
            if i < 0 {
                return Err("Number is negative");
            }
            Ok((i as usize, i as usize + 1))
        }
        2 => {
            let start: i64 = parts[0].parse().map_err(|_| "Integer or range expected")?;
            let end: i64 = parts[1].parse().map_err(|_| "Integer or range expected")?;
            if start < 0 || end < 0 {
                return Err("Number is negative");
            }
            Ok((start as usize, end as usize))
        }
        _ => Err("Integer or range expected"),
    }
}

/// Handle one request, writing response lines followed by `ok_line` on
/// success or an `ACK` line on failure. Inside a command list `ok_line`
/// is `list_OK`; the caller appends the final `OK`.
pub(crate) fn dispatch(
    state: &mut State,
    out: &ConnWriter,
    events: &Sender<String>,
    args: &[String],
    ok_line: &str,
) -> io::Result<Outcome> {
    let Some(verb) = args.first() else {
        out.line("No command given")?;
        return Ok(Outcome::Failed);
    };
    let ack = |msg: &str| -> io::Result<Outcome> {
        out.line(&format!("ACK {{{verb}}} {msg}"))?;
        Ok(Outcome::Failed)
    };
    let fire = |name: &str| {
        // Rendezvous with the broadcaster; a missing broadcaster only
        // happens during teardown.
        let _ = events.send(name.to_string());
    };

    match verb.as_str() {
        "close" => return Ok(Outcome::Closed),

        "ping" | "password" => {}

        "list" => {
            if args.len() < 2 {
                return ack("too few arguments");
            }
            if args[1] == "file" {
                for i in 0..state.database.len() {
                    out.line(&format!("file: {}", state.file(i)))?;
                }
            }
        }

        "lsinfo" => {
            for i in 0..state.database.len() {
                out.line(&format!("file: {}", state.file(i)))?;
                out.line("Last-Modified: 2014-07-02T12:32:26Z")?;
                out.line("Artist: Newcleus")?;
                out.line("Title: Jam On It")?;
                out.line("Track: 02")?;
            }
            for dir in [
                "music/Buck 65 - Dirtbike 1",
                "music/Howlin' Wolf - Moanin' in the Moonlight",
            ] {
                out.line(&format!("directory: {dir}"))?;
            }
            out.line("playlist: BBC 6 Music.m3u")?;
        }

        "listallinfo" => {
            for i in 0..state.database.len() {
                out.line(&format!("file: {}", state.file(i)))?;
            }
        }

        "find" => {
            if args.len() < 2 {
                return ack("too few arguments");
            }
            for i in 0..state.database.len() {
                out.line(&format!("file: {}", state.file(i)))?;
            }
        }

        "listplaylists" => {
            for name in state.playlists.keys() {
                out.line(&format!("playlist: {name}"))?;
            }
        }

        "playlistinfo" => {
            let len = state.queue.len();
            let (start, end) = match args.get(1) {
                Some(range) => match parse_range(range) {
                    Ok(bounds) => bounds,
                    Err(msg) => return ack(msg),
                },
                None => (0, len),
            };
            if start > len {
                return ack("Bad song index");
            }
            for i in start..end.min(len) {
                let entry = state.queue.at(i).expect("index checked against len");
                out.line(&format!("file: {}", state.file(entry.song)))?;
                out.line(&format!("Pos: {i}"))?;
            }
        }

        "listplaylistinfo" => {
            if args.len() < 2 {
                return ack("too few arguments");
            }
            let Some(playlist) = state.playlists.get(&args[1]) else {
                return ack("no such playlist");
            };
            for entry in playlist.entries() {
                out.line(&format!("file: {}", state.file(entry.song)))?;
            }
        }

        "playlistadd" => {
            if args.len() != 3 {
                return ack("wrong number of arguments");
            }
            let (name, uri) = (&args[1], &args[2]);
            let Some(&song) = state.index.get(uri) else {
                return ack("URI not found");
            };
            let id = state.assign_id();
            state
                .playlists
                .entry(name.clone())
                .or_default()
                .add(QueueEntry { id, song });
            fire("stored_playlist");
        }

        "playlistdelete" => {
            if args.len() != 3 {
                return ack("wrong number of arguments");
            }
            let Ok(pos) = args[2].parse::<usize>() else {
                return ack("invalid position number");
            };
            let Some(playlist) = state.playlists.get_mut(&args[1]) else {
                return ack("playlist not found");
            };
            if !playlist.delete(pos) {
                return ack("invalid song position");
            }
            fire("stored_playlist");
        }

        "playlistclear" => {
            if args.len() != 2 {
                return ack("wrong number of arguments");
            }
            let Some(playlist) = state.playlists.get_mut(&args[1]) else {
                return ack("playlist not found");
            };
            playlist.clear();
            fire("stored_playlist");
        }

        "rm" => {
            if args.len() != 2 {
                return ack("wrong number of arguments");
            }
            if state.playlists.remove(&args[1]).is_none() {
                return ack("playlist not found");
            }
            fire("stored_playlist");
        }

        "rename" => {
            if args.len() != 3 {
                return ack("wrong number of arguments");
            }
            let (old, new) = (&args[1], &args[2]);
            if !state.playlists.contains_key(old) {
                return ack(&format!("playlist {old} does not exist"));
            }
            if state.playlists.contains_key(new) {
                return ack(&format!("playlist {new} already exists"));
            }
            let playlist = state.playlists.remove(old).expect("presence checked");
            state.playlists.insert(new.clone(), playlist);
            fire("stored_playlist");
        }

        "load" => {
            if args.len() < 2 {
                return ack("wrong number of arguments");
            }
            let Some(playlist) = state.playlists.get(&args[1]) else {
                return ack(&format!("playlist {} does not exist", args[1]));
            };
            let songs: Vec<usize> = playlist.entries().iter().map(|e| e.song).collect();
            for song in songs {
                let id = state.assign_id();
                state.queue.add(QueueEntry { id, song });
            }
            fire("playlist");
        }

        "clear" => {
            state.queue.clear();
            state.pos = 0;
            fire("playlist");
        }

        "add" => {
            if args.len() != 2 {
                return ack("wrong number of arguments");
            }
            let Some(&song) = state.index.get(&args[1]) else {
                return ack("URI not found");
            };
            let id = state.assign_id();
            state.queue.add(QueueEntry { id, song });
            fire("playlist");
        }

        "addid" => {
            if args.len() != 2 && args.len() != 3 {
                return ack("wrong number of arguments");
            }
            let Some(&song) = state.index.get(&args[1]) else {
                return ack("URI not found");
            };
            let id = state.assign_id();
            match args.get(2) {
                Some(pos_arg) => {
                    let Ok(pos) = pos_arg.parse::<usize>() else {
                        return ack("invalid song position");
                    };
                    if pos > state.queue.len() {
                        return ack("Bad song index");
                    }
                    state.queue.insert(pos, QueueEntry { id, song });
                }
                None => state.queue.add(QueueEntry { id, song }),
            }
            out.line(&format!("Id: {id}"))?;
            fire("playlist");
        }

        "delete" => {
            if args.len() != 2 {
                return ack("wrong number of arguments");
            }
            let Ok(pos) = args[1].parse::<usize>() else {
                return ack("invalid song position");
            };
            if !state.queue.delete(pos) {
                return ack("invalid song position");
            }
            fire("playlist");
        }

        "deleteid" => {
            if args.len() != 2 {
                return ack("wrong number of arguments");
            }
            let Ok(id) = args[1].parse::<i32>() else {
                return ack("invalid song id");
            };
            if !state.queue.remove_id(id) {
                return ack("No such song");
            }
            fire("playlist");
        }

        "move" => {
            if args.len() != 3 {
                return ack("wrong number of arguments");
            }
            let len = state.queue.len();
            let (start, end) = match parse_range(&args[1]) {
                Ok(bounds) => bounds,
                Err(msg) => return ack(msg),
            };
            let Ok(to) = args[2].parse::<usize>() else {
                return ack("invalid song position");
            };
            if start >= end || end > len || to + (end - start) > len {
                return ack("Bad song index");
            }
            state.queue.move_range(start, end, to);
            fire("playlist");
        }

        "moveid" => {
            if args.len() != 3 {
                return ack("wrong number of arguments");
            }
            let Ok(id) = args[1].parse::<i32>() else {
                return ack("invalid song id");
            };
            let Ok(to) = args[2].parse::<usize>() else {
                return ack("invalid song position");
            };
            let Some(from) = state.queue.position_of_id(id) else {
                return ack("No such song");
            };
            if to >= state.queue.len() {
                return ack("Bad song index");
            }
            state.queue.move_range(from, from + 1, to);
            fire("playlist");
        }

        "playlistmove" => {
            if args.len() != 4 {
                return ack("wrong number of arguments");
            }
            let Ok(id) = args[2].parse::<i32>() else {
                return ack("invalid song id");
            };
            let Ok(to) = args[3].parse::<usize>() else {
                return ack("invalid song position");
            };
            let Some(playlist) = state.playlists.get_mut(&args[1]) else {
                return ack("playlist not found");
            };
            let Some(from) = playlist.position_of_id(id) else {
                return ack("No such song");
            };
            if to >= playlist.len() {
                return ack("Bad song index");
            }
            playlist.move_range(from, from + 1, to);
            fire("stored_playlist");
        }

        "shuffle" => {
            // Deterministic stand-in for a real shuffle: reverse the
            // requested range (the whole queue without an argument).
            let len = state.queue.len();
            let (start, end) = match args.get(1) {
                Some(range) => match parse_range(range) {
                    Ok(bounds) => bounds,
                    Err(msg) => return ack(msg),
                },
                None => (0, len),
            };
            if start > end || end > len {
                return ack("Bad song index");
            }
            state.queue.reverse_range(start, end);
            fire("playlist");
        }

        "save" => {
            if args.len() != 2 {
                return ack("wrong number of arguments");
            }
            let name = &args[1];
            if state.playlists.contains_key(name) {
                return ack(&format!("playlist {name} already exists"));
            }
            let snapshot = state.queue.clone();
            state.playlists.insert(name.clone(), snapshot);
            fire("stored_playlist");
        }

        "play" => {
            if let Some(pos_arg) = args.get(1) {
                let Ok(pos) = pos_arg.parse::<usize>() else {
                    return ack("invalid song position");
                };
                if pos >= state.queue.len() {
                    return ack("Bad song index");
                }
                state.pos = pos;
            }
            state.state = PlayState::Play;
            fire("player");
        }

        "playid" => {
            if let Some(id_arg) = args.get(1) {
                let Ok(id) = id_arg.parse::<i32>() else {
                    return ack("invalid song id");
                };
                let Some(pos) = state.queue.position_of_id(id) else {
                    return ack("No such song");
                };
                state.pos = pos;
            }
            state.state = PlayState::Play;
            fire("player");
        }

        "stop" => {
            state.state = PlayState::Stop;
            fire("player");
        }

        "pause" => {
            if state.state != PlayState::Stop {
                state.state = if args.get(1).map(String::as_str) == Some("0") {
                    PlayState::Play
                } else {
                    PlayState::Pause
                };
                fire("player");
            }
        }

        "next" => {
            let len = state.queue.len();
            if len == 0 || state.pos >= len {
                state.pos = 0;
            } else {
                state.pos = (state.pos + 1) % len;
            }
            fire("player");
        }

        "previous" => {
            let len = state.queue.len();
            if len == 0 || state.pos >= len {
                state.pos = 0;
            } else if state.pos == 0 {
                state.pos = len - 1;
            } else {
                state.pos -= 1;
            }
            fire("player");
        }

        "seek" | "seekid" => {
            if args.len() != 3 {
                return ack("wrong number of arguments");
            }
            if args[1].parse::<i64>().is_err() || args[2].parse::<i64>().is_err() {
                return ack("Integer expected");
            }
            fire("player");
        }

        "setvol" => {
            if args.len() != 2 {
                return ack("wrong number of arguments");
            }
            let Ok(volume) = args[1].parse::<i32>() else {
                return ack("Integer expected");
            };
            state.volume = volume;
            fire("mixer");
        }

        "random" | "repeat" | "single" | "consume" => {
            let value = match args.get(1).map(String::as_str) {
                Some("1") => true,
                Some("0") => false,
                _ => return ack("Boolean (0/1) expected"),
            };
            match verb.as_str() {
                "random" => state.random = value,
                "repeat" => state.repeat = value,
                "single" => state.single = value,
                _ => state.consume = value,
            }
            fire("options");
        }

        "status" => {
            out.line(&format!("volume: {}", state.volume))?;
            out.line(&format!("repeat: {}", state.repeat as u8))?;
            out.line(&format!("random: {}", state.random as u8))?;
            out.line(&format!("single: {}", state.single as u8))?;
            out.line(&format!("consume: {}", state.consume as u8))?;
            out.line(&format!("playlistlength: {}", state.queue.len()))?;
            out.line(&format!("state: {}", state.state.as_str()))?;
            if let Some(entry) = state.queue.at(state.pos) {
                out.line(&format!("song: {}", state.pos))?;
                out.line(&format!("songid: {}", entry.id))?;
            }
        }

        "stats" => {
            out.line("artists: 1")?;
            out.line("albums: 1")?;
            out.line(&format!("songs: {}", state.database.len()))?;
            out.line("uptime: 0")?;
            out.line("db_playtime: 0")?;
            out.line("playtime: 0")?;
        }

        "currentsong" => {
            if !state.queue.is_empty() {
                if state.pos >= state.queue.len() {
                    state.pos = 0;
                }
                let entry = state.queue.at(state.pos).expect("position clamped");
                out.line(&format!("file: {}", state.file(entry.song)))?;
                out.line(&format!("Pos: {}", state.pos))?;
                out.line(&format!("Id: {}", entry.id))?;
            }
        }

        "update" => {
            let job = state.start_update_job();
            out.line(&format!("updating_db: {job}"))?;
            fire("update");
        }

        "outputs" => {
            out.line("outputid: 0")?;
            out.line("outputenabled: 1")?;
            out.line("outputname: downstairs")?;
            out.line("outputid: 1")?;
            out.line("outputenabled: 0")?;
            out.line("outputname: upstairs")?;
        }

        "enableoutput" | "disableoutput" => {
            fire("output");
        }

        other => {
            tracing::warn!(command = %other, "unknown command");
            out.line(&format!("ACK {{}} unknown command \"{other}\""))?;
            return Ok(Outcome::Failed);
        }
    }

    out.line(ok_line)?;
    Ok(Outcome::Done)
}
