//! Wire-byte assertions against a scripted stub listener: greeting
//! validation, quoting, range encoding, and response ordering.

mod support;

use mpd_api::{ApiError, Client};
use support::StubServer;

#[test]
fn test_dial_accepts_mpd_greeting() {
    let stub = StubServer::start("OK MPD 0.20", &[&["OK"]]);
    let client = Client::dial("tcp", stub.addr()).expect("dial");
    client.ping().expect("ping");
    client.close().expect("close");
}

#[test]
fn test_dial_rejects_foreign_greeting() {
    let stub = StubServer::start("HELLO 1.0", &[]);
    let err = Client::dial("tcp", stub.addr()).unwrap_err();
    match err {
        ApiError::Greeting(line) => assert_eq!(line, "HELLO 1.0"),
        other => panic!("expected greeting error, got {other}"),
    }
}

#[test]
fn test_add_quotes_uri_at_the_wire() {
    let stub = StubServer::start("OK MPD 0.20", &[&["OK"]]);
    let client = Client::dial("tcp", stub.addr()).expect("dial");
    client.add("test \"song\".ogg").expect("add");
    assert_eq!(stub.received(), vec!["add \"test \\\"song\\\".ogg\""]);
    client.close().expect("close");
}

#[test]
fn test_playlist_info_range_encoding() {
    let stub = StubServer::start("OK MPD 0.20", &[&["OK"], &["OK"], &["OK"]]);
    let client = Client::dial("tcp", stub.addr()).expect("dial");

    client.playlist_info(-1, -1).expect("all items");
    client.playlist_info(3, -1).expect("single item");
    client.playlist_info(2, 4).expect("range");
    assert_eq!(
        stub.received(),
        vec!["playlistinfo", "playlistinfo 3", "playlistinfo 2:4"]
    );

    // Negative start with non-negative end fails before any bytes move.
    let err = client.playlist_info(-1, 3).unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));
    assert_eq!(stub.received().len(), 3);

    client.close().expect("close");
}

#[test]
fn test_delete_and_move_validate_start_index() {
    let stub = StubServer::start("OK MPD 0.20", &[]);
    let client = Client::dial("tcp", stub.addr()).expect("dial");

    assert!(matches!(
        client.delete(-1, 4).unwrap_err(),
        ApiError::InvalidArgument(_)
    ));
    assert!(matches!(
        client.move_range(-2, 4, 0).unwrap_err(),
        ApiError::InvalidArgument(_)
    ));
    assert!(stub.received().is_empty());

    client.close().expect("close");
}

#[test]
fn test_negative_positions_omit_the_argument() {
    let stub = StubServer::start("OK MPD 0.20", &[&["OK"], &["OK"], &["OK"], &["OK"]]);
    let client = Client::dial("tcp", stub.addr()).expect("dial");

    client.play(-1).expect("play");
    client.play(2).expect("play 2");
    client.play_id(-5).expect("playid");
    client.play_id(7).expect("playid 7");
    assert_eq!(stub.received(), vec!["play", "play 2", "playid", "playid 7"]);

    client.close().expect("close");
}

#[test]
fn test_responses_bind_in_issue_order() {
    let stub = StubServer::start(
        "OK MPD 0.20",
        &[
            &["state: play", "OK"],
            &["file: a.ogg", "OK"],
            &["state: stop", "OK"],
            &["file: b.ogg", "OK"],
        ],
    );
    let client = Client::dial("tcp", stub.addr()).expect("dial");

    assert_eq!(client.status().expect("status").get("state").unwrap(), "play");
    assert_eq!(
        client.current_song().expect("song").get("file").unwrap(),
        "a.ogg"
    );
    assert_eq!(client.status().expect("status").get("state").unwrap(), "stop");
    assert_eq!(
        client.current_song().expect("song").get("file").unwrap(),
        "b.ogg"
    );

    assert_eq!(
        stub.received(),
        vec!["status", "currentsong", "status", "currentsong"]
    );
    client.close().expect("close");
}

#[test]
fn test_ack_is_surfaced_and_connection_stays_usable() {
    let stub = StubServer::start(
        "OK MPD 0.20",
        &[&["ACK [50@0] {play} Bad song index"], &["OK"]],
    );
    let client = Client::dial("tcp", stub.addr()).expect("dial");

    let err = client.play(99).unwrap_err();
    let ack = err.ack().expect("ack payload");
    assert_eq!(ack.code, 50);
    assert_eq!(ack.command, "play");
    assert_eq!(ack.message, "Bad song index");
    assert!(!err.is_disconnect());

    // The ACK terminated the response; the next command proceeds.
    client.ping().expect("ping after ack");
    client.close().expect("close");
}
