use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use crate::signup::http::HttpConnection;

#[derive(Debug, Default)]
pub(crate) struct StubStats {
    pub(crate) requests: AtomicU64,
    active: AtomicU64,
    pub(crate) max_active: AtomicU64,
}

/// Minimal keep-alive HTTP target answering every request the same way.
pub(crate) struct StubTarget {
    pub(crate) addr: SocketAddr,
    pub(crate) stats: Arc<StubStats>,
    task: JoinHandle<()>,
}

impl StubTarget {
    pub(crate) async fn spawn(
        status: u16,
        delay: Duration,
        body: serde_json::Value,
    ) -> Result<Self, String> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|err| format!("Failed to bind stub: {}", err))?;
        let addr = listener
            .local_addr()
            .map_err(|err| format!("Failed to read stub addr: {}", err))?;
        let stats = Arc::new(StubStats::default());
        let body = Arc::new(body);
        let task_stats = stats.clone();
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let stats = task_stats.clone();
                let body = body.clone();
                tokio::spawn(async move {
                    let mut connection = HttpConnection::new(socket);
                    while let Ok(Some(_request)) = connection.read_request().await {
                        stats.requests.fetch_add(1, Ordering::SeqCst);
                        let active = stats.active.fetch_add(1, Ordering::SeqCst).saturating_add(1);
                        stats.max_active.fetch_max(active, Ordering::SeqCst);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        stats.active.fetch_sub(1, Ordering::SeqCst);
                        if connection
                            .write_json_response(status, body.as_ref(), true)
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                });
            }
        });
        Ok(Self { addr, stats, task })
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, String> {
        Url::parse(&format!("http://{}{}", self.addr, path)).map_err(|err| err.to_string())
    }
}

impl Drop for StubTarget {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Address with nothing listening on it.
pub(crate) async fn unreachable_url() -> Result<Url, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|err| format!("Failed to bind: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("Failed to read addr: {}", err))?;
    drop(listener);
    Url::parse(&format!("http://{}/nocaptcha/signup", addr)).map_err(|err| err.to_string())
}
