//! Core library for the `loadwire` server.
//!
//! A WebSocket control channel accepts run requests naming a signup page,
//! drives a paced HTTP load run against it and streams one telemetry message
//! per completed request back over the same connection. The optional signup
//! targets give the runs something local to hit. The primary interface is the
//! `loadwire` binary; library APIs exist for embedding and integration tests.
pub mod args;
pub mod channel;
pub mod config;
pub mod error;
pub mod http;
pub mod shutdown;
pub mod signup;
pub mod target;

mod entry;
mod listener;
mod logger;

pub use entry::run;
