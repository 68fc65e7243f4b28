use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Pause between failed accepts.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Calls `accept` until it succeeds. Failures are logged and retried, never returned.
pub(crate) async fn accept_with_retry<F, Fut, T>(mut accept: F, listener_name: &str) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return accepted,
            Err(err) => {
                warn!("{} failed to accept connection: {}", listener_name, err);
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}
