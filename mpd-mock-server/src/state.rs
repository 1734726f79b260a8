//! The server's in-memory world.

use std::collections::HashMap;

use mpd_proto::Attrs;

use crate::playlist::Playlist;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayState {
    Play,
    Stop,
    Pause,
}

impl PlayState {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayState::Play => "play",
            PlayState::Stop => "stop",
            PlayState::Pause => "pause",
        }
    }
}

/// Everything the dispatcher reads and mutates, guarded by one mutex in
/// the server so concurrent connections stay consistent.
pub(crate) struct State {
    pub state: PlayState,
    /// Synthetic song database.
    pub database: Vec<Attrs>,
    /// Maps URI to database index.
    pub index: HashMap<String, usize>,
    pub playlists: HashMap<String, Playlist>,
    /// The current queue.
    pub queue: Playlist,
    /// Position in the current queue.
    pub pos: usize,
    next_song_id: i32,
    pub volume: i32,
    pub random: bool,
    pub repeat: bool,
    pub single: bool,
    pub consume: bool,
    update_jobs: i32,
}

impl State {
    pub fn new(database_size: usize) -> State {
        let mut database = Vec::with_capacity(database_size);
        let mut index = HashMap::with_capacity(database_size);
        for i in 0..database_size {
            let file = format!("song{i:04}.ogg");
            let mut attrs = Attrs::new();
            attrs.insert("file".to_string(), file.clone());
            database.push(attrs);
            index.insert(file, i);
        }
        State {
            state: PlayState::Stop,
            database,
            index,
            playlists: HashMap::new(),
            queue: Playlist::new(),
            pos: 0,
            next_song_id: 1,
            volume: 100,
            random: false,
            repeat: false,
            single: false,
            consume: false,
            update_jobs: 0,
        }
    }

    /// The URI of database entry `i`.
    pub fn file(&self, i: usize) -> &str {
        self.database
            .get(i)
            .and_then(|attrs| attrs.get("file"))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Hand out the next stable queue id.
    pub fn assign_id(&mut self) -> i32 {
        let id = self.next_song_id;
        self.next_song_id += 1;
        id
    }

    /// Enqueue a database update job and return its id.
    pub fn start_update_job(&mut self) -> i32 {
        self.update_jobs += 1;
        self.update_jobs
    }
}
