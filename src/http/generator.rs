use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, trace};
use url::Url;

use crate::args::{PositiveU64, PositiveUsize};
use crate::error::{AppError, AppResult, HttpError};
use crate::shutdown::{ShutdownSender, shutdown_channel};

use super::body::RequestTemplater;
use super::events::{Latency, RunCompletion, RunEvent, TelemetryEvent};
use super::execution::execute_request;
use super::limiter::{InflightGuard, RequestLimiter};
use super::rate::Pacer;

const RUN_EVENT_BUFFER: usize = 1024;

/// Everything needed to drive one run against one URL.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub url: Url,
    pub requests_per_second: PositiveU64,
    pub max_requests: PositiveU64,
    pub concurrency: PositiveUsize,
    pub tick_interval: Duration,
    /// Response body bytes kept per event.
    pub body_limit: usize,
}

/// Issues paced POST requests and reports each outcome on a [`TelemetryStream`].
#[derive(Debug, Clone)]
pub struct LoadGenerator {
    client: Client,
    templater: Arc<RequestTemplater>,
}

struct RunContext {
    client: Client,
    templater: Arc<RequestTemplater>,
    url: Url,
    body_limit: usize,
    permits: Arc<Semaphore>,
    limiter: RequestLimiter,
    in_flight: AtomicU64,
    completed: AtomicU64,
    started_at: Instant,
}

impl LoadGenerator {
    #[must_use]
    pub const fn new(client: Client, templater: Arc<RequestTemplater>) -> Self {
        Self { client, templater }
    }

    /// Starts a run on the current runtime. Dropping the returned stream stops dispatching.
    #[must_use]
    pub fn start(&self, plan: RunPlan) -> TelemetryStream {
        let (cancel_tx, cancel_rx) = shutdown_channel();
        let (events_tx, events_rx) = mpsc::channel(RUN_EVENT_BUFFER);

        let permits = Arc::new(Semaphore::new(0));
        let pacer = Pacer::spawn(
            permits.clone(),
            plan.requests_per_second.get(),
            plan.tick_interval,
            cancel_rx,
        );
        let context = Arc::new(RunContext {
            client: self.client.clone(),
            templater: self.templater.clone(),
            url: plan.url,
            body_limit: plan.body_limit,
            permits,
            limiter: RequestLimiter::new(plan.max_requests.get()),
            in_flight: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            started_at: Instant::now(),
        });

        debug!(
            "Starting run against {} (rps={}, max={}, concurrency={})",
            context.url,
            plan.requests_per_second,
            plan.max_requests,
            plan.concurrency
        );
        tokio::spawn(drive_run(context, plan.concurrency, events_tx, pacer));

        TelemetryStream {
            events: events_rx,
            cancel_tx,
            finished: false,
        }
    }
}

async fn drive_run(
    context: Arc<RunContext>,
    concurrency: PositiveUsize,
    events_tx: mpsc::Sender<RunEvent>,
    pacer: Pacer,
) {
    let mut workers = JoinSet::new();
    for _ in 0..concurrency.get() {
        workers.spawn(run_worker(context.clone(), events_tx.clone()));
    }

    let mut error: Option<String> = None;
    while let Some(joined) = workers.join_next().await {
        let outcome = joined
            .map_err(|source| AppError::http(HttpError::WorkerFailed { source }))
            .and_then(|result| result);
        if let Err(err) = outcome
            && error.is_none()
        {
            debug!("Run aborted: {}", err);
            context.permits.close();
            error = Some(err.to_string());
        }
    }
    drop(pacer);

    let completion = RunCompletion {
        error,
        completed: context.completed.load(Ordering::Relaxed),
    };
    debug!(
        "Run against {} finished after {} requests",
        context.url, completion.completed
    );
    if events_tx.send(RunEvent::Finished(completion)).await.is_err() {
        trace!("Run finished with no listener");
    }
}

async fn run_worker(context: Arc<RunContext>, events_tx: mpsc::Sender<RunEvent>) -> AppResult<()> {
    let content_type = HeaderValue::from_static("application/json");
    loop {
        let Ok(permit) = context.permits.acquire().await else {
            return Ok(());
        };
        permit.forget();

        let Some(request_index) = context.limiter.try_reserve() else {
            context.permits.close();
            return Ok(());
        };
        if context.limiter.is_exhausted() {
            // Idle workers stop waiting for tokens that can no longer be used.
            context.permits.close();
        }

        let body = context.templater.build_json()?;
        let request = context
            .client
            .post(context.url.clone())
            .header(CONTENT_TYPE, content_type.clone())
            .body(body)
            .build()
            .map_err(|source| AppError::http(HttpError::BuildRequestFailed { source }))?;

        let started_after = context.started_at.elapsed();
        let guard = InflightGuard::acquire(&context.in_flight);
        let in_flight = guard.in_flight();
        let outcome = execute_request(&context.client, request, context.body_limit).await;
        drop(guard);

        let event = TelemetryEvent {
            latency: Latency {
                request_index,
                started_after_ms: duration_ms(started_after),
                latency_ms: duration_ms(outcome.elapsed),
                latency_us: u64::try_from(outcome.elapsed.as_micros()).unwrap_or(u64::MAX),
            },
            error: outcome.error,
            result: outcome.result,
            in_flight,
        };
        context.completed.fetch_add(1, Ordering::Relaxed);
        if events_tx.send(RunEvent::Request(event)).await.is_err() {
            return Ok(());
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Events of one run: request events, then exactly one [`RunEvent::Finished`].
///
/// The stream ends after `Finished`. Dropping it before then cancels the run:
/// no further requests are dispatched and in-flight results are discarded.
#[derive(Debug)]
pub struct TelemetryStream {
    events: mpsc::Receiver<RunEvent>,
    cancel_tx: ShutdownSender,
    finished: bool,
}

impl TelemetryStream {
    /// Stops dispatching new requests. In-flight requests still report, then `Finished`.
    pub fn cancel(&self) {
        drop(self.cancel_tx.send(()));
    }
}

impl Stream for TelemetryStream {
    type Item = RunEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.events.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if matches!(event, RunEvent::Finished(_)) {
                    this.finished = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for TelemetryStream {
    fn drop(&mut self) {
        drop(self.cancel_tx.send(()));
    }
}
