pub(crate) const DEFAULT_USER_AGENT: &str = concat!("loadwire/", env!("CARGO_PKG_VERSION"));

/// Control channel bind address.
pub(crate) const DEFAULT_LISTEN: &str = "0.0.0.0:8001";
/// WebSocket path clients connect to.
pub(crate) const DEFAULT_CHANNEL_PATH: &str = "/test";
pub(crate) const DEFAULT_TARGET_BASE_URL: &str = "http://localhost:8000";
pub(crate) const DEFAULT_TARGETS_LISTEN: &str = "127.0.0.1:8000";
