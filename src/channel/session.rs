use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ChannelError};
use crate::http::{
    LoadGenerator, RequestTemplater, RunEvent, RunPlan, TelemetryStream, build_client,
};

use super::protocol::{OutboundMessage, RunRequest, RunSpec};
use super::settings::SessionSettings;

const OUTBOUND_BUFFER: usize = 1024;

/// Serves one control connection until the peer closes it.
///
/// Every accepted run request starts a new run; runs already in progress keep
/// going and their events interleave on the connection.
pub(super) async fn run_session<S>(
    socket: WebSocketStream<S>,
    peer: SocketAddr,
    settings: Arc<SessionSettings>,
) -> AppResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let client = build_client(&settings.client)?;
    let generator = LoadGenerator::new(
        client,
        Arc::new(RequestTemplater::new(settings.random.clone())),
    );

    let (mut write, mut read) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            if write.send(message).await.is_err() {
                break;
            }
        }
        drop(write.close().await);
    });

    let mut runs: JoinSet<AppResult<()>> = JoinSet::new();
    loop {
        tokio::select! {
            frame = read.next() => {
                let text = match frame {
                    None => break,
                    Some(Err(err)) => {
                        debug!("Control connection {} failed: {}", peer, err);
                        break;
                    }
                    Some(Ok(message)) => match message {
                        Message::Text(text) => Ok(text),
                        Message::Binary(bytes) => String::from_utf8(bytes)
                            .map_err(|err| ChannelError::BinaryNotUtf8 { source: err.utf8_error() }),
                        Message::Close(_) => break,
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                    },
                };
                match text.and_then(|text| parse_run_spec(&text, &settings)) {
                    Ok(spec) => {
                        info!(
                            "Run on {} for {}: {} at {} rps, max {}",
                            peer,
                            spec.page.as_str(),
                            spec.url,
                            spec.requests_per_second,
                            spec.max_requests
                        );
                        let stream = generator.start(RunPlan {
                            url: spec.url,
                            requests_per_second: spec.requests_per_second,
                            max_requests: spec.max_requests,
                            concurrency: settings.concurrency,
                            tick_interval: settings.tick_interval,
                            body_limit: settings.body_limit,
                        });
                        runs.spawn(forward_run(stream, out_tx.clone(), peer));
                    }
                    Err(err) => {
                        warn!("Rejected message from {}: {}", peer, err);
                        let rejected = OutboundMessage::Rejected { error: err.to_string() };
                        if out_tx.send(rejected.to_frame()?).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Some(joined) = runs.join_next(), if !runs.is_empty() => {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => warn!("Run on {} stopped: {}", peer, err),
                    Err(err) => warn!("Run task on {} failed: {}", peer, err),
                }
            }
        }
    }

    let active = runs.len();
    runs.shutdown().await;
    if active > 0 {
        info!("Cancelled {} active run(s) on {}", active, peer);
    }
    drop(out_tx);
    writer.await.map_err(AppError::from)?;
    Ok(())
}

fn parse_run_spec(text: &str, settings: &SessionSettings) -> Result<RunSpec, ChannelError> {
    RunRequest::parse(text)?.into_spec(&settings.resolver, settings.defaults)
}

async fn forward_run(
    mut stream: TelemetryStream,
    out_tx: mpsc::Sender<Message>,
    peer: SocketAddr,
) -> AppResult<()> {
    while let Some(event) = stream.next().await {
        let message = match event {
            RunEvent::Request(event) => OutboundMessage::Result(event),
            RunEvent::Finished(completion) => {
                match completion.error.as_deref() {
                    Some(error) => warn!(
                        "Run on {} failed after {} requests: {}",
                        peer, completion.completed, error
                    ),
                    None => info!(
                        "Run on {} finished: {} requests",
                        peer, completion.completed
                    ),
                }
                OutboundMessage::from(completion)
            }
        };
        let frame = message.to_frame().map_err(AppError::from)?;
        if out_tx.send(frame).await.is_err() {
            debug!("Dropping telemetry for closed connection {}", peer);
            break;
        }
    }
    Ok(())
}
