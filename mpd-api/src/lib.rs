//! Synchronous client for MPD (Music Player Daemon).
//!
//! This crate maps each MPD verb to a typed method on [`Client`]: one
//! command out, one response in, over a pipelined text connection from
//! `mpd-proto`. Batched execution with deferred results is available
//! through [`CommandList`], and [`Client::command`] offers raw protocol
//! access for verbs the catalogue does not wrap.

mod client;
mod command;
mod command_list;
mod error;

pub use client::Client;
pub use command::Command;
pub use command_list::{CommandList, PromisedAttrs, PromisedId};
pub use error::{ApiError, Result};
pub use mpd_proto::{Ack, Attrs};
