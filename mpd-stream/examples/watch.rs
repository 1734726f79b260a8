//! Print every subsystem change an MPD server reports.
//!
//! Usage: `watch [addr] [subsystem...]` (default `127.0.0.1:6600`, all
//! subsystems).

use mpd_stream::Watcher;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:6600".to_string());
    let subsystems: Vec<String> = args.collect();
    let filter: Vec<&str> = subsystems.iter().map(String::as_str).collect();

    let watcher = Watcher::new("tcp", &addr, "", &filter)?;
    for event in watcher.events().iter() {
        println!("changed: {event}");
    }
    for err in watcher.errors().try_iter() {
        eprintln!("watcher error: {err}");
    }
    Ok(())
}
