//! Integration tests for the watcher and reactor against the fake
//! server. Events are triggered from a second client connection, the
//! way a real application would.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use mpd_api::Client;
use mpd_mock_server::{Server, ServerConfig};
use mpd_stream::{Handler, Reactor, Watcher};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Time for the watcher's idle subscription to land server-side before
/// events are triggered.
const SETTLE: Duration = Duration::from_millis(200);

fn start_server() -> String {
    let handle = Server::start(ServerConfig::ephemeral()).expect("server start");
    handle.addr().to_string()
}

#[test]
fn test_watcher_delivers_player_event() {
    let addr = start_server();
    let mut watcher = Watcher::new("tcp", &addr, "", &["player"]).expect("watcher");
    let client = Client::dial("tcp", &addr).expect("dial");
    thread::sleep(SETTLE);

    client.play(-1).expect("play");
    client.stop().expect("stop");

    let event = watcher.events().recv_timeout(EVENT_TIMEOUT).expect("player event");
    assert_eq!(event, "player");

    watcher.close().expect("close");
    client.close().expect("client close");
}

#[test]
fn test_watcher_filters_and_reconfigures() {
    let addr = start_server();
    let mut watcher = Watcher::new("tcp", &addr, "", &["player"]).expect("watcher");
    let client = Client::dial("tcp", &addr).expect("dial");
    thread::sleep(SETTLE);

    // First batch under the initial filter.
    client.play(-1).expect("play");
    let event = watcher.events().recv_timeout(EVENT_TIMEOUT).expect("player event");
    assert_eq!(event, "player");

    // Switch filters; player changes must no longer wake the watcher.
    watcher.subsystems(&["update", "mixer"]).expect("subsystems");
    thread::sleep(SETTLE);

    client.stop().expect("stop");
    client.update("").expect("update");

    let event = watcher.events().recv_timeout(EVENT_TIMEOUT).expect("update event");
    assert_eq!(event, "update");

    watcher.close().expect("close");
}

#[test]
fn test_watcher_close_unblocks_idle() {
    let addr = start_server();
    let mut watcher = Watcher::new("tcp", &addr, "", &["player"]).expect("watcher");

    // No events for a while; the watcher is parked inside idle.
    thread::sleep(Duration::from_secs(1));
    assert_eq!(watcher.events().try_recv().unwrap_err(), TryRecvError::Empty);

    let started = Instant::now();
    watcher.close().expect("close");
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "close took {:?}",
        started.elapsed()
    );

    // Both streams observe closure.
    assert_eq!(
        watcher.events().recv_timeout(EVENT_TIMEOUT).unwrap_err(),
        RecvTimeoutError::Disconnected
    );

    // A second close is a no-op.
    watcher.close().expect("second close");
}

#[test]
fn test_watcher_emits_one_error_then_terminates_on_eof() {
    // A peer that greets, accepts the idle command, then hangs up.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut stream = stream;
        stream.write_all(b"OK MPD 0.20\n").unwrap();
        let mut line = String::new();
        let _ = reader.read_line(&mut line); // the idle command
        drop(stream); // peer closes: the watcher sees EOF
    });

    let mut watcher = Watcher::new("tcp", &addr, "", &["player"]).expect("watcher");

    let err = watcher.errors().recv_timeout(EVENT_TIMEOUT).expect("transport error");
    assert!(err.is_disconnect(), "expected disconnect, got {err}");

    // Termination closes every stream; no further errors or events.
    assert_eq!(
        watcher.errors().recv_timeout(EVENT_TIMEOUT).unwrap_err(),
        RecvTimeoutError::Disconnected
    );
    assert_eq!(
        watcher.events().recv_timeout(EVENT_TIMEOUT).unwrap_err(),
        RecvTimeoutError::Disconnected
    );
}

#[test]
fn test_reactor_invokes_handler_with_batch() {
    let addr = start_server();
    let (batch_tx, batch_rx) = std::sync::mpsc::channel::<(Option<&'static str>, Vec<String>)>();

    let handler: Handler<&'static str> = Box::new(move |_client, interrupt, subsystems, _err| {
        let names = subsystems.iter().map(|s| s.to_string()).collect();
        let _ = batch_tx.send((interrupt, names));
    });
    let mut reactor = Reactor::new("tcp", &addr, "", handler, &["player"]).expect("reactor");
    let client = Client::dial("tcp", &addr).expect("dial");
    thread::sleep(SETTLE);

    client.play(-1).expect("play");
    let (interrupt, names) = batch_rx.recv_timeout(EVENT_TIMEOUT).expect("batch");
    assert_eq!(interrupt, None);
    assert_eq!(names, vec!["player".to_string()]);

    reactor.interrupt("poke").expect("interrupt");
    let (interrupt, names) = batch_rx.recv_timeout(EVENT_TIMEOUT).expect("interrupt batch");
    assert_eq!(interrupt, Some("poke"));
    assert!(names.is_empty());

    reactor.close().expect("close");
}
