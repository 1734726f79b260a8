//! A scripted stub listener for wire-byte assertions.
//!
//! Unlike the full fake server, the stub answers each incoming line with
//! a pre-baked reply and records exactly what reached it, so tests can
//! assert on the bytes a client method emits (quoting, range encoding,
//! or the absence of any bytes at all).

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

pub struct StubServer {
    addr: String,
    received: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Start a one-connection stub that greets with `greeting` and then
    /// answers the n-th incoming line with `script[n]`. Lines beyond the
    /// script get no reply; a `close` line ends the connection and is
    /// not recorded.
    pub fn start(greeting: &str, script: &[&[&str]]) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
        let addr = listener.local_addr().expect("stub addr").to_string();
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&received);
        let greeting = format!("{greeting}\n");
        let script: Vec<Vec<String>> = script
            .iter()
            .map(|reply| reply.iter().map(|l| l.to_string()).collect())
            .collect();

        thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream.try_clone().expect("clone stub stream"));
            let mut writer = stream;
            if writer.write_all(greeting.as_bytes()).is_err() {
                return;
            }
            let mut replies = script.into_iter();
            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    return;
                }
                let line = line.trim_end_matches('\n').to_string();
                if line == "close" {
                    return;
                }
                log.lock().expect("stub log").push(line);
                if let Some(reply) = replies.next() {
                    for reply_line in reply {
                        if writer.write_all(format!("{reply_line}\n").as_bytes()).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        StubServer { addr, received }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Every command line received so far, in arrival order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().expect("stub log").clone()
    }
}
