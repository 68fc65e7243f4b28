//! WebSocket control channel: run requests in, telemetry out.
mod protocol;
mod server;
mod session;
mod settings;


pub use protocol::{OutboundMessage, RunDefaults, RunRequest, RunSpec};
pub use server::ChannelServer;
pub use settings::{ServerSettings, SessionSettings};
