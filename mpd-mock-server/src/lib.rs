//! An in-process fake MPD server.
//!
//! This crate speaks the MPD wire protocol over real TCP sockets against
//! an in-memory world: a synthetic song database, stored playlists, a
//! current queue, and player state. It exists so the client crates can be
//! exercised end-to-end under deterministic conditions, `idle` event
//! broadcasting included. Nothing is persisted; state vanishes with the
//! process.

mod broadcast;
mod config;
mod dispatch;
mod error;
mod logging;
mod playlist;
mod server;
mod state;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use logging::{init_logging, LoggingError, LoggingMode};
pub use server::{Server, ServerHandle};
