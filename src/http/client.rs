use std::time::Duration;

use reqwest::Client;

use crate::args::{DEFAULT_USER_AGENT, PositiveUsize, ServerArgs};
use crate::error::{AppError, AppResult, HttpError};

#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Idle keep-alive connections kept per host.
    pub pool_max_idle_per_host: PositiveUsize,
}

impl ClientSettings {
    #[must_use]
    pub const fn from_args(args: &ServerArgs) -> Self {
        Self {
            request_timeout: args.request_timeout,
            connect_timeout: args.connect_timeout,
            pool_max_idle_per_host: args.concurrency,
        }
    }
}

/// Builds the pooled client shared by every run of a session.
///
/// # Errors
///
/// Returns an error when the TLS backend or client cannot be initialised.
pub fn build_client(settings: &ClientSettings) -> AppResult<Client> {
    Client::builder()
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .user_agent(DEFAULT_USER_AGENT)
        .pool_max_idle_per_host(settings.pool_max_idle_per_host.get())
        .no_proxy()
        .build()
        .map_err(|source| AppError::http(HttpError::BuildClientFailed { source }))
}
