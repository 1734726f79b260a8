//! Command-list executor tests against the fake server: batching,
//! promise resolution, and failure behavior.

use mpd_api::{ApiError, Client};
use mpd_mock_server::{Server, ServerConfig};

fn dial() -> Client {
    let handle = Server::start(ServerConfig::ephemeral()).expect("server start");
    Client::dial("tcp", &handle.addr().to_string()).expect("dial")
}

fn load_files(client: &Client, n: usize) {
    client.clear().expect("clear");
    for i in 0..n {
        client.add(&format!("song{i:04}.ogg")).expect("add");
    }
}

#[test]
fn test_empty_list_round_trips() {
    let client = dial();
    let mut list = client.begin_command_list();
    list.end().expect("empty list");
    // The connection stays in sync afterwards.
    client.ping().expect("ping");
}

#[test]
fn test_three_nexts_advance_cursor() {
    let client = dial();
    load_files(&client, 4);
    client.play(0).expect("play");

    let mut list = client.begin_command_list();
    list.next();
    list.next();
    list.next();
    list.end().expect("list of nexts");

    let status = client.status().expect("status");
    assert_eq!(status.get("song").unwrap(), "3");
}

#[test]
fn test_list_is_reusable_after_end() {
    let client = dial();
    load_files(&client, 4);
    client.play(3).expect("play");

    let mut list = client.begin_command_list();
    list.previous();
    list.previous();
    list.end().expect("first batch");
    assert_eq!(client.status().unwrap().get("song").unwrap(), "1");

    list.previous();
    list.end().expect("second batch");
    assert_eq!(client.status().unwrap().get("song").unwrap(), "0");
}

#[test]
fn test_mixed_promises_resolve_in_order() {
    let client = dial();
    load_files(&client, 2);
    client.play(1).expect("play");

    let mut list = client.begin_command_list();
    let song = list.current_song();
    let status = list.status();

    // Not yet computed: end() has not run.
    assert!(matches!(song.value().unwrap_err(), ApiError::PendingPromise));
    assert!(matches!(status.value().unwrap_err(), ApiError::PendingPromise));

    list.end().expect("end");

    let song = song.value().expect("song promise");
    assert_eq!(song.get("file").unwrap(), "song0001.ogg");
    let status = status.value().expect("status promise");
    assert_eq!(status.get("state").unwrap(), "play");
}

#[test]
fn test_add_id_promise_resolves_to_server_id() {
    let client = dial();
    client.clear().expect("clear");

    let mut list = client.begin_command_list();
    let promised = list.add_id("song0000.ogg", -1);
    assert!(matches!(
        promised.value().unwrap_err(),
        ApiError::PendingPromise
    ));
    list.end().expect("end");

    let id = promised.value().expect("id promise");
    assert!(id > 0);

    // The id is live: deleting it empties the queue.
    client.delete_id(id).expect("deleteid");
    assert!(client.playlist_info(-1, -1).expect("playlist").is_empty());
}

#[test]
fn test_update_promise_carries_job_id() {
    let client = dial();
    let mut list = client.begin_command_list();
    let promised = list.update("");
    list.end().expect("end");

    let attrs = promised.value().expect("update promise");
    let job: i32 = attrs.get("updating_db").unwrap().parse().unwrap();
    assert!(job >= 1);
}

#[test]
fn test_failed_member_aborts_the_list() {
    let client = dial();
    client.clear().expect("clear");

    let mut list = client.begin_command_list();
    list.add("song0000.ogg");
    list.add("no-such-file.ogg");
    let promised = list.status();
    let err = list.end().unwrap_err();
    let ack = err.ack().expect("ack payload");
    assert_eq!(ack.message, "URI not found");

    // Promises behind the failure stay unresolved.
    assert!(matches!(
        promised.value().unwrap_err(),
        ApiError::PendingPromise
    ));

    // The failed list left no dangling response bytes.
    client.ping().expect("ping after failed list");
}

#[test]
fn test_queued_arguments_are_quoted() {
    let client = dial();
    let mut list = client.begin_command_list();
    list.playlist_add("My List", "song0000.ogg");
    list.playlist_add("My List", "song0001.ogg");
    list.end().expect("end");

    let contents = client.playlist_contents("My List").expect("contents");
    assert_eq!(contents.len(), 2);
}
