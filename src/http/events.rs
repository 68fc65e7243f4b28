use serde::Serialize;

/// Timing for one completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Latency {
    /// Dispatch order within the run, starting at 0.
    pub request_index: u64,
    /// Offset of the dispatch from the start of the run.
    pub started_after_ms: u64,
    pub latency_ms: u64,
    pub latency_us: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Transport
        };
        Self {
            kind,
            message: error_chain(err),
        }
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseResult {
    pub status_code: u16,
    pub body: String,
    /// Set when the body exceeded the capture limit and was cut.
    pub truncated: bool,
}

/// Outcome of one completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryEvent {
    pub latency: Latency,
    pub error: Option<TransportError>,
    pub result: Option<ResponseResult>,
    /// Requests in flight when this one was dispatched, itself included.
    #[serde(skip)]
    pub in_flight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCompletion {
    /// Run-level failure, if any.
    pub error: Option<String>,
    /// Request events emitted by the run.
    pub completed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Request(TelemetryEvent),
    Finished(RunCompletion),
}
