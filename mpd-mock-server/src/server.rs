//! Listener, per-connection handler, and idle response plumbing.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use mpd_proto::parse_args;

use crate::broadcast::{self, Broadcaster, IdleRequest};
use crate::config::ServerConfig;
use crate::dispatch::{dispatch, Outcome};
use crate::error::Result;
use crate::state::State;

/// The fake MPD server.
pub struct Server;

/// Handle to a running server: the bound address plus a best-effort
/// shutdown switch for the accept loop. Connections already established
/// run until their peer hangs up.
pub struct ServerHandle {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
}

impl Server {
    /// Bind the configured address, spawn the accept loop and the idle
    /// broadcaster, and return a handle with the bound address.
    pub fn start(config: ServerConfig) -> Result<ServerHandle> {
        config.validate()?;
        let listener = TcpListener::bind(&config.addr)?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(State::new(config.database_size)));
        let broadcaster = broadcast::spawn();
        let stop = Arc::new(AtomicBool::new(false));

        let accept_stop = Arc::clone(&stop);
        let version = config.version.clone();
        thread::spawn(move || accept_loop(listener, state, broadcaster, version, accept_stop));

        tracing::info!(%addr, "fake MPD server listening");
        Ok(ServerHandle { addr, stop })
    }
}

impl ServerHandle {
    /// The address the server is listening on. With a port-0 config this
    /// is where the ephemeral port shows up.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting new connections.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        // Wake the accept loop so it observes the flag.
        let _ = TcpStream::connect(self.addr);
    }
}

fn accept_loop(
    listener: TcpListener,
    state: Arc<Mutex<State>>,
    broadcaster: Broadcaster,
    version: String,
    stop: Arc<AtomicBool>,
) {
    for conn in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        match conn {
            Ok(stream) => {
                let state = Arc::clone(&state);
                let broadcaster = broadcaster.clone();
                let version = version.clone();
                thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, state, broadcaster, &version) {
                        tracing::debug!(%err, "connection ended");
                    }
                });
            }
            Err(err) => {
                tracing::warn!(%err, "accept failed");
            }
        }
    }
}

/// Shared, line-buffered writer half of one connection. The request loop
/// and an in-flight idle responder both hold a clone; response ordering
/// is enforced by joining the responder before the next response is
/// written, not by this lock.
#[derive(Clone)]
pub(crate) struct ConnWriter(Arc<Mutex<BufWriter<TcpStream>>>);

impl ConnWriter {
    fn new(stream: TcpStream) -> ConnWriter {
        ConnWriter(Arc::new(Mutex::new(BufWriter::new(stream))))
    }

    pub(crate) fn line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.0.lock().expect("connection writer poisoned");
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// Read one request line; `None` at EOF.
fn read_request_line(reader: &mut BufReader<TcpStream>) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// An in-flight `idle`: the signal used to finish it plus the responder
/// thread to join before any later response may be written.
struct InFlightIdle {
    quit_tx: Sender<()>,
    responder: JoinHandle<()>,
}

fn handle_connection(
    stream: TcpStream,
    state: Arc<Mutex<State>>,
    broadcaster: Broadcaster,
    version: &str,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let out = ConnWriter::new(stream);
    out.line(&format!("OK MPD {version}"))?;

    let mut in_idle: Option<InFlightIdle> = None;
    loop {
        let Some(line) = read_request_line(&mut reader)? else {
            break;
        };
        let args = parse_args(&line);

        // Any new request finishes an in-flight idle first; its response
        // must be complete before ours starts.
        if let Some(idle) = in_idle.take() {
            let _ = idle.quit_tx.send(());
            let _ = idle.responder.join();
        }

        match args.first().map(String::as_str) {
            Some("idle") => {
                let (quit_tx, quit_rx) = bounded(1);
                let subsystems = args[1..].to_vec();
                let idle_out = out.clone();
                let idle_broadcaster = broadcaster.clone();
                let responder = thread::spawn(move || {
                    idle_response(idle_out, idle_broadcaster, subsystems, quit_rx);
                });
                in_idle = Some(InFlightIdle { quit_tx, responder });
            }

            Some("noidle") => {
                // The response was produced by the idle just finished
                // above; nothing else to write.
            }

            Some("command_list_ok_begin") => {
                let mut commands: Vec<Vec<String>> = Vec::new();
                loop {
                    let Some(line) = read_request_line(&mut reader)? else {
                        return Ok(());
                    };
                    let sub = parse_args(&line);
                    if sub.first().map(String::as_str) == Some("command_list_end") {
                        break;
                    }
                    commands.push(sub);
                }
                let mut all_ok = true;
                for command in &commands {
                    let outcome = {
                        let mut state = state.lock().expect("server state poisoned");
                        dispatch(&mut state, &out, &broadcaster.fire_tx, command, "list_OK")?
                    };
                    match outcome {
                        Outcome::Closed => return Ok(()),
                        Outcome::Failed => {
                            all_ok = false;
                            break;
                        }
                        Outcome::Done => {}
                    }
                }
                if all_ok {
                    out.line("OK")?;
                }
            }

            _ => {
                let outcome = {
                    let mut state = state.lock().expect("server state poisoned");
                    dispatch(&mut state, &out, &broadcaster.fire_tx, &args, "OK")?
                };
                if matches!(outcome, Outcome::Closed) {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Answer one `idle` request: subscribe, then either relay the first
/// matching event followed by `OK`, or write a bare `OK` when `quit_rx`
/// fires first (a `noidle` or the next request).
fn idle_response(out: ConnWriter, broadcaster: Broadcaster, subsystems: Vec<String>, quit_rx: Receiver<()>) {
    let (event_tx, event_rx) = bounded::<String>(1);
    let (token_tx, token_rx) = bounded::<u64>(1);
    if broadcaster
        .start_tx
        .send(IdleRequest {
            subsystems,
            event_tx,
            token_tx,
        })
        .is_err()
    {
        return;
    }
    let Ok(token) = token_rx.recv() else { return };

    select! {
        recv(event_rx) -> msg => {
            if let Ok(name) = msg {
                let _ = out.line(&format!("changed: {name}"));
                let _ = out.line("OK");
            }
            // Hold the response slot until the request loop releases us.
            let _ = quit_rx.recv();
        }
        recv(quit_rx) -> _ => {
            let _ = out.line("OK");
        }
    }
    let _ = broadcaster.end_tx.send(token);
}
