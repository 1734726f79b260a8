//! The idle watcher loop.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mpd_api::{ApiError, Client, Result};

use crate::subsystem::Subsystem;

enum Control {
    Subsystems(Vec<String>),
    Shutdown,
}

/// A dedicated MPD connection watched for subsystem change events.
///
/// The watcher thread loops on `idle`, emitting every changed subsystem
/// to the event channel in server order and every failure to the error
/// channel. Non-terminal failures (an `ACK`, a torn response) keep the
/// loop alive; a disconnect delivers one error and terminates it. On
/// termination the loop drops its channel senders, so both streams
/// observe closure exactly once.
///
/// Reconfiguration and shutdown go through an unbounded control channel
/// plus a `noidle` nudge, so the sender never deadlocks against a loop
/// that is parked inside a blocking read.
pub struct Watcher {
    client: Arc<Client>,
    events: Receiver<Subsystem>,
    errors: Receiver<ApiError>,
    control: Sender<Control>,
    handle: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Connect to MPD at `addr` over `network`, authenticate when
    /// `password` is non-empty, and watch for changes in `subsystems`.
    /// An empty filter reports every subsystem.
    pub fn new(network: &str, addr: &str, password: &str, subsystems: &[&str]) -> Result<Watcher> {
        let client = Arc::new(Client::dial_authenticated(network, addr, password)?);
        let (event_tx, events) = mpsc::channel();
        let (error_tx, errors) = mpsc::channel();
        let (control, control_rx) = mpsc::channel();
        let names: Vec<String> = subsystems.iter().map(|s| s.to_string()).collect();

        let loop_client = Arc::clone(&client);
        let handle = thread::spawn(move || watch_loop(loop_client, names, event_tx, error_tx, control_rx));

        Ok(Watcher {
            client,
            events,
            errors,
            control,
            handle: Some(handle),
        })
    }

    /// Subsystem change events, in the order the server reported them.
    /// The channel disconnects when the watcher terminates.
    pub fn events(&self) -> &Receiver<Subsystem> {
        &self.events
    }

    /// Failures the loop ran into. One disconnect error is the last
    /// thing delivered before termination.
    pub fn errors(&self) -> &Receiver<ApiError> {
        &self.errors
    }

    /// Change the subsystems to watch for; takes effect on the next
    /// iteration. The in-flight `idle` is interrupted so the switch does
    /// not wait for an unrelated event.
    pub fn subsystems(&self, names: &[&str]) -> Result<()> {
        let filter = names.iter().map(|s| s.to_string()).collect();
        let _ = self.control.send(Control::Subsystems(filter));
        self.client.no_idle()
    }

    /// Stop watching and close the connection. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.control.send(Control::Shutdown);
        // Unblock a loop parked in idle. A raced extra noidle only
        // yields an empty changed-set.
        let _ = self.client.no_idle();
        // The noidle can land between two idles and be swallowed;
        // shutting the socket down guarantees the loop wakes either way.
        let result = self.client.close();
        let _ = handle.join();
        result
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn watch_loop(
    client: Arc<Client>,
    mut names: Vec<String>,
    event_tx: Sender<Subsystem>,
    error_tx: Sender<ApiError>,
    control_rx: Receiver<Control>,
) {
    tracing::debug!(subsystems = ?names, "watcher loop started");
    loop {
        match client.idle(&names) {
            Ok(changed) => {
                for name in changed {
                    if event_tx.send(Subsystem::from(name)).is_err() {
                        tracing::debug!("event receiver dropped, stopping watcher");
                        return;
                    }
                }
            }
            Err(err) => {
                // A shutdown in progress makes any failure expected
                // teardown noise, not an error to report.
                if drain_control(&control_rx, &mut names) {
                    return;
                }
                let terminal = err.is_disconnect();
                let _ = error_tx.send(err);
                if terminal {
                    tracing::debug!("watcher connection lost");
                    return;
                }
                continue;
            }
        }

        if drain_control(&control_rx, &mut names) {
            return;
        }
    }
}

/// Apply pending reconfigurations; true when the loop should stop.
fn drain_control(control_rx: &Receiver<Control>, names: &mut Vec<String>) -> bool {
    loop {
        match control_rx.try_recv() {
            Ok(Control::Subsystems(new_names)) => {
                tracing::debug!(subsystems = ?new_names, "watcher reconfigured");
                *names = new_names;
            }
            Ok(Control::Shutdown) | Err(TryRecvError::Disconnected) => return true,
            Err(TryRecvError::Empty) => return false,
        }
    }
}
