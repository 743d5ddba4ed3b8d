//! Concurrent request dispatcher with single-task delivery.
//!
//! Submitted requests wait in a priority heap until one of `max_workers`
//! permits frees up. Each dispatched request runs transport, then parse, then
//! hands its outcome to one delivery task that completes handles and runs
//! callbacks one at a time, so caller code never races with itself.

use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use super::job::QueuedJob;
use crate::application::parsers::ResponseParser;
use crate::domain::CancellationToken;
use crate::domain::entities::{CacheMetadata, Delivery, Request, RequestId, Response};
use crate::domain::errors::RequestError;
use crate::domain::ports::TransportPort;

/// Default number of concurrently executing requests.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Configuration for the request queue.
#[derive(Debug, Clone)]
pub struct RequestQueueConfig {
    /// Maximum requests executing at once.
    pub max_workers: usize,
}

impl Default for RequestQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

type DeliveryTask = Box<dyn FnOnce() + Send>;
type Registry = Arc<Mutex<HashMap<RequestId, TrackedRequest>>>;

enum QueueCommand {
    Submit(QueuedJob),
    Shutdown,
}

struct TrackedRequest {
    token: CancellationToken,
    tag: Option<String>,
}

enum Completion<T> {
    Channel(oneshot::Sender<Delivery<T>>),
    Callback(Box<dyn FnOnce(Delivery<T>) + Send>),
}

impl<T> Completion<T> {
    fn complete(self, delivery: Delivery<T>) {
        match self {
            Self::Channel(tx) => {
                let _ = tx.send(delivery);
            }
            Self::Callback(callback) => callback(delivery),
        }
    }
}

/// Handle to a submitted request.
///
/// Resolves to exactly one delivery unless the request is cancelled, in which
/// case [`RequestHandle::response`] yields `None`.
#[derive(Debug)]
pub struct RequestHandle<T> {
    id: RequestId,
    token: CancellationToken,
    receiver: oneshot::Receiver<Delivery<T>>,
}

impl<T> RequestHandle<T> {
    /// Returns the request id.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Cancels the request. See [`CancellationToken`] for the guarantees.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true if the request was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns a token that cancels this request.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Waits for the terminal outcome. `None` means the request was cancelled.
    pub async fn response(self) -> Option<Delivery<T>> {
        self.receiver.await.ok()
    }
}

/// Everything a running request needs after leaving the heap.
struct JobContext {
    id: RequestId,
    token: CancellationToken,
    transport: Arc<dyn TransportPort>,
    delivery_tx: mpsc::UnboundedSender<DeliveryTask>,
    current: Registry,
}

/// State for the background dispatcher loop.
struct DispatcherState {
    command_rx: mpsc::UnboundedReceiver<QueueCommand>,
    semaphore: Arc<Semaphore>,
    current: Registry,
}

/// Dispatches requests to the transport and delivers their outcomes.
pub struct RequestQueue {
    transport: Arc<dyn TransportPort>,
    command_tx: mpsc::UnboundedSender<QueueCommand>,
    delivery_tx: mpsc::UnboundedSender<DeliveryTask>,
    current: Registry,
    next_id: AtomicU64,
    config: RequestQueueConfig,
}

impl std::fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQueue")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight_count())
            .finish_non_exhaustive()
    }
}

impl RequestQueue {
    /// Creates a queue and starts its dispatcher and delivery tasks.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn new(config: RequestQueueConfig, transport: Arc<dyn TransportPort>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let current: Registry = Arc::default();
        let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));

        tokio::spawn(Self::run_dispatcher(DispatcherState {
            command_rx,
            semaphore,
            current: current.clone(),
        }));
        tokio::spawn(Self::run_delivery(delivery_rx));

        info!(max_workers = config.max_workers, "Request queue started");

        Self {
            transport,
            command_tx,
            delivery_tx,
            current,
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Submits a request and returns a handle resolving to its outcome.
    pub fn submit<P: ResponseParser>(
        &self,
        request: Request,
        parser: P,
    ) -> RequestHandle<P::Output> {
        let (tx, receiver) = oneshot::channel();
        let token = CancellationToken::new();
        let id = self.enqueue(request, parser, token.clone(), Completion::Channel(tx));
        RequestHandle {
            id,
            token,
            receiver,
        }
    }

    /// Submits a request whose outcome is passed to `callback`.
    ///
    /// Callbacks run one at a time on the queue's delivery task.
    pub fn submit_with<P, F>(&self, request: Request, parser: P, callback: F) -> RequestId
    where
        P: ResponseParser,
        F: FnOnce(Delivery<P::Output>) + Send + 'static,
    {
        self.submit_with_token(request, parser, CancellationToken::new(), callback)
    }

    /// Like [`RequestQueue::submit_with`], cancelled through a caller-owned token.
    ///
    /// One token may be shared by several requests to cancel them together.
    pub fn submit_with_token<P, F>(
        &self,
        request: Request,
        parser: P,
        token: CancellationToken,
        callback: F,
    ) -> RequestId
    where
        P: ResponseParser,
        F: FnOnce(Delivery<P::Output>) + Send + 'static,
    {
        self.enqueue(request, parser, token, Completion::Callback(Box::new(callback)))
    }

    fn enqueue<P: ResponseParser>(
        &self,
        request: Request,
        parser: P,
        token: CancellationToken,
        completion: Completion<P::Output>,
    ) -> RequestId {
        let id = RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let priority = request.priority();

        self.current.lock().insert(
            id,
            TrackedRequest {
                token: token.clone(),
                tag: request.tag().map(str::to_owned),
            },
        );

        debug!(
            id = %id,
            method = %request.method(),
            url = %request.url(),
            parser = %parser.kind(),
            priority = ?priority,
            "Request submitted"
        );

        let context = JobContext {
            id,
            token: token.clone(),
            transport: self.transport.clone(),
            delivery_tx: self.delivery_tx.clone(),
            current: self.current.clone(),
        };

        let job = QueuedJob {
            id,
            priority,
            token: token.clone(),
            run: Box::new(move || run_request(context, request, parser, completion).boxed()),
        };

        if self.command_tx.send(QueueCommand::Submit(job)).is_err() {
            warn!(id = %id, "Request queue is shut down; request dropped");
            token.cancel();
            self.current.lock().remove(&id);
        }

        id
    }

    /// Cancels one request. Returns false if it already completed.
    pub fn cancel(&self, id: RequestId) -> bool {
        let current = self.current.lock();
        current.get(&id).is_some_and(|tracked| {
            tracked.token.cancel();
            debug!(id = %id, "Cancelled request");
            true
        })
    }

    /// Cancels every request carrying `tag`. Returns how many were cancelled.
    pub fn cancel_tagged(&self, tag: &str) -> usize {
        let current = self.current.lock();
        let mut count = 0;
        for tracked in current.values() {
            if tracked.tag.as_deref() == Some(tag) {
                tracked.token.cancel();
                count += 1;
            }
        }
        debug!(tag = tag, count = count, "Cancelled tagged requests");
        count
    }

    /// Cancels all queued and in-flight requests.
    pub fn cancel_all(&self) -> usize {
        let current = self.current.lock();
        for tracked in current.values() {
            tracked.token.cancel();
        }
        let count = current.len();
        if count > 0 {
            debug!(count = count, "Cancelled all requests");
        }
        count
    }

    /// Cancels everything and stops the dispatcher.
    pub fn shutdown(&self) {
        self.cancel_all();
        let _ = self.command_tx.send(QueueCommand::Shutdown);
        info!("Request queue shut down");
    }

    /// Number of submitted requests not yet delivered or dropped.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.current.lock().len()
    }

    /// Returns the queue configuration.
    #[must_use]
    pub const fn config(&self) -> &RequestQueueConfig {
        &self.config
    }

    /// Dispatcher loop: orders submissions and throttles execution.
    async fn run_dispatcher(mut state: DispatcherState) {
        let mut pending: BinaryHeap<QueuedJob> = BinaryHeap::new();

        loop {
            tokio::select! {
                biased;
                command = state.command_rx.recv() => match command {
                    Some(QueueCommand::Submit(job)) => pending.push(job),
                    Some(QueueCommand::Shutdown) | None => break,
                },
                Ok(permit) = state.semaphore.clone().acquire_owned(), if !pending.is_empty() => {
                    let Some(job) = pending.pop() else {
                        continue;
                    };

                    if job.token.is_cancelled() {
                        state.current.lock().remove(&job.id);
                        debug!(id = %job.id, "Skipping request cancelled before dispatch");
                        continue;
                    }

                    trace!(id = %job.id, priority = ?job.priority, "Dispatching request");
                    let future = (job.run)();
                    tokio::spawn(async move {
                        future.await;
                        drop(permit);
                    });
                }
            }
        }

        state.command_rx.close();
        while let Ok(command) = state.command_rx.try_recv() {
            if let QueueCommand::Submit(job) = command {
                pending.push(job);
            }
        }

        let dropped = pending.len();
        {
            let mut current = state.current.lock();
            for job in pending.drain() {
                job.token.cancel();
                current.remove(&job.id);
            }
        }
        debug!(dropped = dropped, "Request dispatcher stopped");
    }

    /// Delivery loop: completes outcomes strictly one at a time.
    async fn run_delivery(mut delivery_rx: mpsc::UnboundedReceiver<DeliveryTask>) {
        while let Some(task) = delivery_rx.recv().await {
            if let Err(panic_info) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                error!(panic = %panic_msg, "Response callback panicked");
            }
        }
        trace!("Delivery task stopped");
    }
}

async fn run_request<P: ResponseParser>(
    context: JobContext,
    request: Request,
    parser: P,
    completion: Completion<P::Output>,
) {
    let Some(delivery) = perform(&context, &request, parser).await else {
        context.current.lock().remove(&context.id);
        return;
    };

    let JobContext {
        id,
        token,
        delivery_tx,
        current,
        ..
    } = context;

    let task: DeliveryTask = Box::new(move || {
        current.lock().remove(&id);
        if token.is_cancelled() {
            debug!(id = %id, "Dropping response of cancelled request");
            return;
        }
        trace!(id = %id, success = delivery.is_ok(), "Delivering response");
        completion.complete(delivery);
    });

    if delivery_tx.send(task).is_err() {
        warn!(id = %id, "Delivery task stopped; response dropped");
    }
}

/// Runs transport then parse. `None` when the request was cancelled meanwhile.
async fn perform<P: ResponseParser>(
    context: &JobContext,
    request: &Request,
    parser: P,
) -> Option<Delivery<P::Output>> {
    let policy = *request.retry_policy();
    let mut attempt = 0;

    let raw = loop {
        let timeout = policy.timeout_for_attempt(attempt);
        match context.transport.execute(request, timeout).await {
            Ok(raw) => break Ok(raw),
            Err(e)
                if e.is_network_error()
                    && attempt < policy.max_retries()
                    && !context.token.is_cancelled() =>
            {
                attempt += 1;
                warn!(id = %context.id, attempt = attempt, error = %e, "Retrying request");
            }
            Err(e) => break Err(e),
        }
    };

    if context.token.is_cancelled() {
        debug!(id = %context.id, "Discarding result of cancelled request");
        return None;
    }

    let raw = match raw {
        Ok(raw) => raw,
        Err(e) => {
            debug!(id = %context.id, error = %e, "Request failed");
            return Some(Err(e));
        }
    };

    let cache = CacheMetadata::from_headers(raw.headers(), Utc::now());
    let kind = parser.kind();
    let parsed = tokio::task::spawn_blocking(move || parser.parse(&raw)).await;

    Some(match parsed {
        Ok(Ok(value)) => Ok(Response::new(value, cache)),
        Ok(Err(e)) => {
            debug!(id = %context.id, parser = %kind, error = %e, "Parsing failed");
            Err(e)
        }
        Err(e) => Err(RequestError::parse(format!("{kind} parser task failed: {e}"))),
    })
}
