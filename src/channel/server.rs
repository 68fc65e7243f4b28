use std::net::SocketAddr;
use std::sync::Arc;

use http::StatusCode;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ChannelError};
use crate::listener::accept_with_retry;
use crate::shutdown::ShutdownReceiver;

use super::session::run_session;
use super::settings::{ServerSettings, SessionSettings};

/// Accepts control connections and runs one session per connection.
pub struct ChannelServer {
    listener: TcpListener,
    path: Arc<str>,
    session: Arc<SessionSettings>,
}

impl ChannelServer {
    /// Binds the control channel listener.
    ///
    /// # Errors
    ///
    /// Returns an error when the listen address cannot be bound.
    pub async fn bind(settings: ServerSettings) -> AppResult<Self> {
        let listener = TcpListener::bind(&settings.listen)
            .await
            .map_err(|source| {
                AppError::channel(ChannelError::Bind {
                    addr: settings.listen.clone(),
                    source,
                })
            })?;
        Ok(Self {
            listener,
            path: Arc::from(settings.path),
            session: Arc::new(settings.session),
        })
    }

    /// # Errors
    ///
    /// Returns an error when the socket address cannot be read.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        self.listener.local_addr().map_err(|source| {
            AppError::channel(ChannelError::Io {
                context: "read local address",
                source,
            })
        })
    }

    /// Accepts connections until shutdown is signalled. Open sessions are left to wind down.
    ///
    /// # Errors
    ///
    /// Accept failures are logged and retried, so this returns `Ok` once shutdown is signalled.
    pub async fn serve(self, mut shutdown_rx: ShutdownReceiver) -> AppResult<()> {
        if let Ok(addr) = self.local_addr() {
            info!("Control channel listening on ws://{}{}", addr, self.path);
        }
        let listener = &self.listener;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                accepted = accept_with_retry(|| listener.accept(), "control channel") => {
                    let (socket, peer) = accepted;
                    let path = self.path.clone();
                    let session = self.session.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(socket, peer, &path, session).await {
                            warn!("Control connection {} ended with error: {}", peer, err);
                        }
                    });
                }
            }
        }
        info!("Control channel stopped accepting connections");
        Ok(())
    }
}

async fn handle_connection(
    socket: TcpStream,
    peer: SocketAddr,
    path: &str,
    session: Arc<SessionSettings>,
) -> AppResult<()> {
    let expected = path.to_owned();
    let check_path = move |request: &Request, response: Response| {
        if request.uri().path() == expected {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("Not found".to_owned()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };
    let websocket = match accept_hdr_async(socket, check_path).await {
        Ok(websocket) => websocket,
        Err(source) => {
            debug!("Handshake with {} failed: {}", peer, source);
            return Err(AppError::channel(ChannelError::Handshake {
                source: Box::new(source),
            }));
        }
    };
    info!("Control connection opened from {}", peer);
    let result = run_session(websocket, peer, session).await;
    info!("Control connection closed from {}", peer);
    result
}
