//! The idle event broadcaster.
//!
//! One thread owns the subscription tables: connections subscribe when a
//! client parks in `idle`, unsubscribe when that idle ends, and
//! dispatchers fire subsystem names at it whenever state changes. Each
//! subscriber gets a capacity-1 channel and a non-blocking send, so a
//! slow or already-woken subscriber never stalls the firing connection;
//! at most one pending event is retained per idle, matching MPD's
//! collapse of repeated changes within one idle window.

use std::collections::HashMap;
use std::thread;

use crossbeam_channel::{bounded, select, Receiver, Sender};

/// Subsystems the server knows how to broadcast.
pub(crate) const KNOWN_SUBSYSTEMS: &[&str] = &[
    "database",
    "update",
    "stored_playlist",
    "playlist",
    "player",
    "mixer",
    "output",
    "options",
];

/// A connection's request to park in `idle`.
pub(crate) struct IdleRequest {
    /// Subsystems to listen for; empty means all known ones.
    pub subsystems: Vec<String>,
    /// Where the broadcaster delivers at most one pending event.
    pub event_tx: Sender<String>,
    /// Where the broadcaster returns the subscription token.
    pub token_tx: Sender<u64>,
}

/// Sender bundle into the broadcaster thread; one clone per connection.
#[derive(Clone)]
pub(crate) struct Broadcaster {
    pub start_tx: Sender<IdleRequest>,
    pub end_tx: Sender<u64>,
    /// Dispatchers fire subsystem names here.
    pub fire_tx: Sender<String>,
}

/// Spawn the broadcaster thread. It runs until every [`Broadcaster`]
/// clone has been dropped.
pub(crate) fn spawn() -> Broadcaster {
    let (start_tx, start_rx) = bounded::<IdleRequest>(0);
    let (end_tx, end_rx) = bounded::<u64>(0);
    let (fire_tx, fire_rx) = bounded::<String>(0);
    thread::spawn(move || run(start_rx, end_rx, fire_rx));
    Broadcaster {
        start_tx,
        end_tx,
        fire_tx,
    }
}

fn run(start_rx: Receiver<IdleRequest>, end_rx: Receiver<u64>, fire_rx: Receiver<String>) {
    let mut subscribers: HashMap<u64, Sender<String>> = HashMap::new();
    let mut by_subsystem: HashMap<String, Vec<u64>> = KNOWN_SUBSYSTEMS
        .iter()
        .map(|name| (name.to_string(), Vec::new()))
        .collect();
    let mut next_token: u64 = 0;

    loop {
        select! {
            recv(start_rx) -> msg => {
                let Ok(request) = msg else { return };
                let token = next_token;
                next_token += 1;
                subscribers.insert(token, request.event_tx);
                let names = if request.subsystems.is_empty() {
                    KNOWN_SUBSYSTEMS.iter().map(|s| s.to_string()).collect()
                } else {
                    request.subsystems
                };
                for name in names {
                    by_subsystem.entry(name).or_default().push(token);
                }
                let _ = request.token_tx.send(token);
                tracing::trace!(token, "idle subscriber registered");
            }
            recv(end_rx) -> msg => {
                let Ok(token) = msg else { return };
                subscribers.remove(&token);
                for tokens in by_subsystem.values_mut() {
                    tokens.retain(|t| *t != token);
                }
                tracing::trace!(token, "idle subscriber removed");
            }
            recv(fire_rx) -> msg => {
                let Ok(name) = msg else { return };
                tracing::trace!(subsystem = %name, "broadcasting idle event");
                if let Some(tokens) = by_subsystem.get(&name) {
                    for token in tokens {
                        if let Some(chan) = subscribers.get(token) {
                            // Full channel = an event is already pending.
                            let _ = chan.try_send(name.clone());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn subscribe(broadcaster: &Broadcaster, subsystems: &[&str]) -> (Receiver<String>, u64) {
        let (event_tx, event_rx) = bounded(1);
        let (token_tx, token_rx) = bounded(1);
        broadcaster
            .start_tx
            .send(IdleRequest {
                subsystems: subsystems.iter().map(|s| s.to_string()).collect(),
                event_tx,
                token_tx,
            })
            .unwrap();
        let token = token_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        (event_rx, token)
    }

    #[test]
    fn test_subscriber_receives_matching_event() {
        let broadcaster = spawn();
        let (events, _token) = subscribe(&broadcaster, &["player"]);
        broadcaster.fire_tx.send("player".to_string()).unwrap();
        let got = events.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(got, "player");
    }

    #[test]
    fn test_subscriber_filters_other_subsystems() {
        let broadcaster = spawn();
        let (events, _token) = subscribe(&broadcaster, &["mixer"]);
        broadcaster.fire_tx.send("player".to_string()).unwrap();
        assert!(events.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_empty_filter_means_all_subsystems() {
        let broadcaster = spawn();
        let (events, _token) = subscribe(&broadcaster, &[]);
        broadcaster.fire_tx.send("options".to_string()).unwrap();
        let got = events.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(got, "options");
    }

    #[test]
    fn test_unsubscribed_token_is_dropped() {
        let broadcaster = spawn();
        let (events, token) = subscribe(&broadcaster, &["player"]);
        broadcaster.end_tx.send(token).unwrap();
        broadcaster.fire_tx.send("player".to_string()).unwrap();
        assert!(events.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
