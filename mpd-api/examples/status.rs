//! Poll an MPD server and print the playing song whenever it changes.
//!
//! Usage: `status [addr]` (default `127.0.0.1:6600`).

use std::time::Duration;

use mpd_api::Client;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:6600".to_string());
    let client = Client::dial("tcp", &addr)?;

    let mut last = String::new();
    loop {
        let status = client.status()?;
        let line = if status.get("state").map(String::as_str) == Some("play") {
            let song = client.current_song()?;
            format!(
                "{} - {}",
                song.get("Artist").map(String::as_str).unwrap_or("?"),
                song.get("Title")
                    .or_else(|| song.get("file"))
                    .map(String::as_str)
                    .unwrap_or("?"),
            )
        } else {
            format!(
                "State: {}",
                status.get("state").map(String::as_str).unwrap_or("?")
            )
        };
        if line != last {
            println!("{line}");
            last = line;
        }
        std::thread::sleep(Duration::from_secs(1));
    }
}
