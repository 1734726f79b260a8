//! A callback-driven variant of the watcher.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mpd_api::{ApiError, Client, Result};

use crate::subsystem::Subsystem;

/// Callback invoked once per `idle` batch with the shared client, any
/// interrupt payload delivered since the last batch, the changed
/// subsystems, and the error if the batch failed.
pub type Handler<T> = Box<dyn FnMut(&Client, Option<T>, &[Subsystem], Option<&ApiError>) + Send>;

enum Signal<T> {
    Interrupt(T),
    Exit,
}

/// Runs a [`Handler`] on a dedicated connection for every `idle` batch.
///
/// Where [`crate::Watcher`] hands events to whoever drains its channels,
/// the reactor pushes them into a callback that may issue follow-up
/// commands on the same connection (the loop is between idles at that
/// point). [`Reactor::interrupt`] wakes a parked loop early and passes
/// an arbitrary payload to the handler.
pub struct Reactor<T: Send + 'static> {
    client: Arc<Client>,
    signals: Sender<Signal<T>>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Reactor<T> {
    /// Connect to MPD at `addr` over `network`, authenticate when
    /// `password` is non-empty, and invoke `handler` for changes in
    /// `subsystems` (empty = all).
    pub fn new(
        network: &str,
        addr: &str,
        password: &str,
        handler: Handler<T>,
        subsystems: &[&str],
    ) -> Result<Reactor<T>> {
        let client = Arc::new(Client::dial_authenticated(network, addr, password)?);
        let (signals, signal_rx) = mpsc::channel();
        let names: Vec<String> = subsystems.iter().map(|s| s.to_string()).collect();

        let loop_client = Arc::clone(&client);
        let handle = thread::spawn(move || react_loop(loop_client, names, handler, signal_rx));

        Ok(Reactor {
            client,
            signals,
            handle: Some(handle),
        })
    }

    /// Wake the loop out of its current `idle` and hand `payload` to the
    /// handler alongside whatever changes had accumulated.
    pub fn interrupt(&self, payload: T) -> Result<()> {
        let _ = self.signals.send(Signal::Interrupt(payload));
        self.client.no_idle()
    }

    /// Stop the loop and close the connection. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.signals.send(Signal::Exit);
        let _ = self.client.no_idle();
        // Shutting the socket down guarantees the loop wakes even when
        // the noidle raced ahead of its idle.
        let result = self.client.close();
        let _ = handle.join();
        result
    }
}

impl<T: Send + 'static> Drop for Reactor<T> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn react_loop<T: Send + 'static>(
    client: Arc<Client>,
    names: Vec<String>,
    mut handler: Handler<T>,
    signal_rx: Receiver<Signal<T>>,
) {
    tracing::debug!(subsystems = ?names, "reactor loop started");
    loop {
        let batch = client.idle(&names);

        let mut interrupt = None;
        match signal_rx.try_recv() {
            Ok(Signal::Interrupt(payload)) => interrupt = Some(payload),
            Ok(Signal::Exit) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => {}
        }

        match batch {
            Ok(changed) => {
                let subsystems: Vec<Subsystem> =
                    changed.into_iter().map(Subsystem::from).collect();
                handler(&client, interrupt, &subsystems, None);
            }
            Err(err) => {
                let terminal = err.is_disconnect();
                handler(&client, interrupt, &[], Some(&err));
                if terminal {
                    tracing::debug!("reactor connection lost");
                    return;
                }
            }
        }
    }
}
