use clap::Parser;
use std::time::Duration;

use super::defaults::{
    DEFAULT_CHANNEL_PATH, DEFAULT_LISTEN, DEFAULT_TARGET_BASE_URL, DEFAULT_TARGETS_LISTEN,
};
use super::parsers::{
    parse_channel_path, parse_duration_arg, parse_positive_u64, parse_positive_usize,
};
use super::types::{PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "WebSocket-controlled HTTP load generator: send a run spec, get per-request telemetry streamed back in real time."
)]
pub struct ServerArgs {
    /// Address the control channel listens on
    #[arg(long, default_value = DEFAULT_LISTEN)]
    pub listen: String,

    /// WebSocket path accepted by the control channel
    #[arg(long = "path", default_value = DEFAULT_CHANNEL_PATH, value_parser = parse_channel_path)]
    pub path: String,

    /// Base URL the symbolic pages resolve against
    #[arg(long = "target-base-url", default_value = DEFAULT_TARGET_BASE_URL)]
    pub target_base_url: String,

    /// Full URL for the captcha-gated signup target (overrides the base URL)
    #[arg(long = "captcha-url")]
    pub captcha_url: Option<String>,

    /// Full URL for the captcha-free signup target (overrides the base URL)
    #[arg(long = "nocaptcha-url")]
    pub nocaptcha_url: Option<String>,

    /// Requests per second used when a run request omits `rps`
    #[arg(long = "default-rps", default_value = "5000", value_parser = parse_positive_u64)]
    pub default_rps: PositiveU64,

    /// Total requests used when a run request omits `max`
    #[arg(long = "default-max", default_value = "200000", value_parser = parse_positive_u64)]
    pub default_max: PositiveU64,

    /// Maximum requests in flight per run
    #[arg(long, short = 'c', default_value = "4", value_parser = parse_positive_usize)]
    pub concurrency: PositiveUsize,

    /// Pacing tick in milliseconds
    #[arg(long = "tick-interval", default_value = "10", value_parser = parse_positive_u64)]
    pub tick_interval: PositiveU64,

    /// Per-request timeout (supports ms/s/m/h)
    #[arg(long = "timeout", default_value = "10s", value_parser = parse_duration_arg)]
    pub request_timeout: Duration,

    /// Connection timeout (supports ms/s/m/h)
    #[arg(long = "connect-timeout", default_value = "5s", value_parser = parse_duration_arg)]
    pub connect_timeout: Duration,

    /// Maximum response body bytes echoed back per telemetry event
    #[arg(long = "body-limit", default_value = "65536", value_parser = parse_positive_usize)]
    pub body_limit: PositiveUsize,

    /// Also serve the built-in signup targets
    #[arg(long = "serve-targets")]
    pub serve_targets: bool,

    /// Address the signup targets listen on
    #[arg(long = "targets-listen", default_value = DEFAULT_TARGETS_LISTEN)]
    pub targets_listen: String,

    /// Secret mixed into captcha hashes (random per process when unset)
    #[arg(long = "captcha-secret", env = "LOADWIRE_CAPTCHA_SECRET", hide_env_values = true)]
    pub captcha_secret: Option<String>,

    /// Captcha issuances allowed per client IP per window
    #[arg(long = "captcha-rate-limit", default_value = "100", value_parser = parse_positive_u64)]
    pub captcha_rate_limit: PositiveU64,

    /// Captcha rate limit window (supports ms/s/m/h)
    #[arg(long = "captcha-rate-window", default_value = "15m", value_parser = parse_duration_arg)]
    pub captcha_rate_window: Duration,

    /// Path to config file (TOML/JSON). Defaults to ./loadwire.toml or ./loadwire.json
    #[arg(long, short = 'C')]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}
