use std::sync::Arc;
use std::time::Duration;

use crate::args::{PositiveUsize, ServerArgs};
use crate::error::AppResult;
use crate::http::{ClientSettings, RandomSource, ThreadRandom};
use crate::target::TargetResolver;

use super::protocol::RunDefaults;

/// Per-connection settings shared by every session of a server.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub resolver: TargetResolver,
    pub defaults: RunDefaults,
    /// Requests in flight per run; not client-configurable.
    pub concurrency: PositiveUsize,
    pub tick_interval: Duration,
    pub body_limit: usize,
    pub client: ClientSettings,
    pub random: Arc<dyn RandomSource>,
}

impl SessionSettings {
    /// # Errors
    ///
    /// Returns an error when a target URL is invalid.
    pub fn from_args(args: &ServerArgs) -> AppResult<Self> {
        Ok(Self {
            resolver: TargetResolver::from_args(args)?,
            defaults: RunDefaults {
                requests_per_second: args.default_rps,
                max_requests: args.default_max,
            },
            concurrency: args.concurrency,
            tick_interval: Duration::from_millis(args.tick_interval.get()),
            body_limit: args.body_limit.get(),
            client: ClientSettings::from_args(args),
            random: Arc::new(ThreadRandom),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen: String,
    /// Only upgrades on this path are accepted.
    pub path: String,
    pub session: SessionSettings,
}

impl ServerSettings {
    /// # Errors
    ///
    /// Returns an error when a target URL is invalid.
    pub fn from_args(args: &ServerArgs) -> AppResult<Self> {
        Ok(Self {
            listen: args.listen.clone(),
            path: args.path.clone(),
            session: SessionSettings::from_args(args)?,
        })
    }
}
