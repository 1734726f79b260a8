//! Event streaming for MPD's `idle` subsystem notifications.
//!
//! MPD's `idle` command parks a connection until something changes
//! server-side, then names the changed subsystems. This crate wraps that
//! into two shapes: [`Watcher`], which multiplexes events into channels,
//! and [`Reactor`], which invokes a callback per batch. Both own a
//! dedicated connection (an idling connection can carry no other
//! command) and both stay interruptible through `noidle`.

mod reactor;
mod subsystem;
mod watcher;

pub use reactor::{Handler, Reactor};
pub use subsystem::Subsystem;
pub use watcher::Watcher;
