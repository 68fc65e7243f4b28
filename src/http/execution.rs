use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Request};
use tokio::time::Instant;
use tracing::trace;

use super::events::{ResponseResult, TransportError};

#[derive(Debug)]
pub(super) struct RequestOutcome {
    /// Time until response headers arrived, or until failure.
    pub(super) elapsed: Duration,
    pub(super) error: Option<TransportError>,
    pub(super) result: Option<ResponseResult>,
}

pub(super) async fn execute_request(
    client: &Client,
    request: Request,
    body_limit: usize,
) -> RequestOutcome {
    let start = Instant::now();
    match client.execute(request).await {
        Ok(response) => {
            let elapsed = start.elapsed();
            let status_code = response.status().as_u16();
            let (captured, read_error) = capture_response_body(response, body_limit).await;
            let error = read_error.map(|err| {
                trace!("Failed to read response body: {}", err);
                TransportError::from_reqwest(&err)
            });
            RequestOutcome {
                elapsed,
                error,
                result: Some(ResponseResult {
                    status_code,
                    body: String::from_utf8_lossy(&captured.bytes).into_owned(),
                    truncated: captured.truncated,
                }),
            }
        }
        Err(err) => {
            trace!("Request failed: {}", err);
            RequestOutcome {
                elapsed: start.elapsed(),
                error: Some(TransportError::from_reqwest(&err)),
                result: None,
            }
        }
    }
}

struct CapturedBody {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Reads the whole body so the connection can be reused, keeping at most `limit` bytes.
async fn capture_response_body(
    response: reqwest::Response,
    limit: usize,
) -> (CapturedBody, Option<reqwest::Error>) {
    let mut captured = CapturedBody {
        bytes: Vec::new(),
        truncated: false,
    };
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(err) => return (captured, Some(err)),
        };
        let room = limit.saturating_sub(captured.bytes.len());
        if bytes.len() > room {
            captured.truncated = true;
        }
        if let Some(kept) = bytes.get(..room.min(bytes.len())) {
            captured.bytes.extend_from_slice(kept);
        }
    }
    (captured, None)
}
