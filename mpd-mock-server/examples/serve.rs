//! Run the fake MPD server as a standalone process.
//!
//! Usage: `serve [addr]` (default `127.0.0.1:6600`).

use mpd_mock_server::{init_logging, LoggingMode, Server, ServerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingMode::Development)?;

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:6600".to_string());
    let handle = Server::start(ServerConfig::new().with_addr(addr))?;
    println!("fake MPD server listening on {}", handle.addr());

    loop {
        std::thread::park();
    }
}
