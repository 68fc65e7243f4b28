//! Request templating, pacing and execution of load runs.
mod body;
mod client;
mod events;
mod execution;
mod generator;
mod limiter;
mod rate;

#[cfg(test)]
pub(crate) mod test_support;

pub use body::{RandomSource, RequestTemplater, SeededRandom, SignupBody, ThreadRandom};
pub use client::{ClientSettings, build_client};
pub use events::{
    Latency, ResponseResult, RunCompletion, RunEvent, TelemetryEvent, TransportError,
    TransportErrorKind,
};
pub use generator::{LoadGenerator, RunPlan, TelemetryStream};

#[cfg(test)]
pub(crate) use body::{FIELD_LEN, HASH_LEN};
#[cfg(test)]
pub(crate) use rate::TickBudget;
