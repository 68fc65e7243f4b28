//! Built-in signup targets: captcha issuance plus the two signup endpoints.
mod captcha;
mod handlers;
pub(crate) mod http;
mod limiter;


use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::args::{PositiveU64, ServerArgs};
use crate::error::{AppError, AppResult, SignupError};
use crate::http::{RandomSource, ThreadRandom};
use crate::listener::accept_with_retry;
use crate::shutdown::ShutdownReceiver;

pub use captcha::{Captcha, CaptchaIssuer};

use handlers::SignupHandler;
use self::http::HttpConnection;
use limiter::FixedWindowLimiter;

const GENERATED_SECRET_LEN: usize = 32;
const SECRET_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone)]
pub struct SignupSettings {
    pub listen: String,
    pub secret: String,
    pub rate_limit: PositiveU64,
    pub rate_window: Duration,
}

impl SignupSettings {
    /// Uses the configured secret, or a random one for this process.
    #[must_use]
    pub fn from_args(args: &ServerArgs) -> Self {
        let secret = args
            .captcha_secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .unwrap_or_else(|| generate_secret(&ThreadRandom));
        Self {
            listen: args.targets_listen.clone(),
            secret,
            rate_limit: args.captcha_rate_limit,
            rate_window: args.captcha_rate_window,
        }
    }
}

fn generate_secret(random: &dyn RandomSource) -> String {
    (0..GENERATED_SECRET_LEN)
        .filter_map(|_| {
            SECRET_ALPHABET
                .get(random.next_index(SECRET_ALPHABET.len()))
                .copied()
                .map(char::from)
        })
        .collect()
}

pub struct SignupServer {
    listener: TcpListener,
    handler: Arc<SignupHandler>,
}

impl SignupServer {
    /// Binds the signup targets.
    ///
    /// # Errors
    ///
    /// Returns an error when the listen address cannot be bound.
    pub async fn bind(settings: SignupSettings) -> AppResult<Self> {
        let listener = TcpListener::bind(&settings.listen)
            .await
            .map_err(|source| {
                AppError::signup(SignupError::Bind {
                    addr: settings.listen.clone(),
                    source,
                })
            })?;
        let issuer = CaptchaIssuer::new(settings.secret, Arc::new(ThreadRandom));
        let limiter = FixedWindowLimiter::new(settings.rate_limit.get(), settings.rate_window);
        Ok(Self {
            listener,
            handler: Arc::new(SignupHandler::new(issuer, limiter)),
        })
    }

    /// Address actually bound, useful when listening on port 0.
    ///
    /// # Errors
    ///
    /// Returns an error when the socket address cannot be read.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        self.listener.local_addr().map_err(|source| {
            AppError::signup(SignupError::Io {
                context: "read local address",
                source,
            })
        })
    }

    /// Accepts connections until shutdown is signalled.
    ///
    /// # Errors
    ///
    /// Accept failures are logged and retried, so this returns `Ok` once shutdown is signalled.
    pub async fn serve(self, mut shutdown_rx: ShutdownReceiver) -> AppResult<()> {
        if let Ok(addr) = self.local_addr() {
            info!("Signup targets listening on {}", addr);
        }
        let listener = &self.listener;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                accepted = accept_with_retry(|| listener.accept(), "signup targets") => {
                    let (socket, peer) = accepted;
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(socket, peer.ip(), &handler).await {
                            debug!("Signup connection {} ended: {}", peer, err);
                        }
                    });
                }
            }
        }
        info!("Signup targets stopped");
        Ok(())
    }
}

async fn handle_connection(
    socket: TcpStream,
    client: IpAddr,
    handler: &SignupHandler,
) -> AppResult<()> {
    let mut connection = HttpConnection::new(socket);
    loop {
        let request = match connection.read_request().await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(err) => {
                warn!("Rejected malformed request from {}: {}", client, err.message);
                connection
                    .write_error_response(err.status, &err.message, false)
                    .await?;
                return Ok(());
            }
        };
        let keep_alive = request.keep_alive();
        let reply = handler.handle(&request, client);
        debug!(
            "{} {} -> {} for {}",
            request.method, request.path, reply.status, client
        );
        connection
            .write_json_response(reply.status, &reply.body, keep_alive)
            .await?;
        if !keep_alive {
            return Ok(());
        }
    }
}
