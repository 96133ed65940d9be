#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::domain::models::QueueError;

trait Task: Send {
    fn run(self: Box<Self>) -> BoxFuture<'static, ()>;
    fn cancel(self: Box<Self>);
}

struct PendingRequest<F, T> {
    request_fn: F,
    timeout: Option<Duration>,
    tx: oneshot::Sender<Result<T, QueueError>>,
}

impl<F, Fut, T> Task for PendingRequest<F, T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let PendingRequest {
            request_fn,
            timeout,
            tx,
        } = *self;

        return async move {
            let res = match timeout {
                Some(limit) => match tokio::time::timeout(limit, request_fn()).await {
                    Ok(res) => res.map_err(QueueError::Task),
                    Err(_) => Err(QueueError::TimedOut(limit)),
                },
                None => request_fn().await.map_err(QueueError::Task),
            };

            // The caller may have stopped listening, which is fine.
            let _ = tx.send(res);
        }
        .boxed();
    }

    fn cancel(self: Box<Self>) {
        let _ = self.tx.send(Err(QueueError::Cancelled));
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Box<dyn Task>>,
    processing: bool,
}

fn lock(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    return state.lock().unwrap_or_else(PoisonError::into_inner);
}

async fn drain(state: Arc<Mutex<QueueState>>, first: Box<dyn Task>) {
    let mut next = Some(first);
    while let Some(task) = next.take() {
        if AssertUnwindSafe(task.run()).catch_unwind().await.is_err() {
            tracing::error!("Queued request panicked, its caller receives a dropped outcome");
        }

        {
            let mut guard = lock(&state);
            next = guard.pending.pop_front();
            if next.is_none() {
                guard.processing = false;
            }
        }
    }
}

/// Runs asynchronous requests one at a time, strictly in the order they were
/// added. A request only starts once the previous one has fully settled, so a
/// slow request holds back everything behind it.
///
/// Clones share the same queue. Requests are driven on the Tokio runtime, so
/// `add` must be called from within one.
#[derive(Clone, Default)]
pub struct SequentialRequestQueue {
    state: Arc<Mutex<QueueState>>,
    timeout: Option<Duration>,
}

impl SequentialRequestQueue {
    pub fn new() -> SequentialRequestQueue {
        return SequentialRequestQueue::default();
    }

    /// Every request added through `add` settles as `TimedOut` if it runs
    /// longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> SequentialRequestQueue {
        return SequentialRequestQueue {
            state: Arc::default(),
            timeout: Some(timeout),
        };
    }

    /// Queues `request_fn`. The queue invokes it exactly once, when every
    /// request added before it has settled. Failures only settle the returned
    /// outcome.
    pub fn add<F, Fut, T>(&self, request_fn: F) -> QueueOutcome<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        return self.enqueue(request_fn, self.timeout);
    }

    /// Same as `add`, with a timeout for this request alone.
    pub fn add_with_timeout<F, Fut, T>(&self, request_fn: F, timeout: Duration) -> QueueOutcome<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        return self.enqueue(request_fn, Some(timeout));
    }

    /// Number of requests waiting to start. A running request is not counted.
    pub fn length(&self) -> usize {
        return lock(&self.state).pending.len();
    }

    pub fn is_processing(&self) -> bool {
        return lock(&self.state).processing;
    }

    /// Settles every waiting request as `Cancelled` and returns how many there
    /// were. A running request is left alone.
    pub fn clear(&self) -> usize {
        let discarded = {
            let mut guard = lock(&self.state);
            guard.pending.drain(..).collect::<Vec<Box<dyn Task>>>()
        };

        let count = discarded.len();
        for task in discarded {
            task.cancel();
        }

        if count > 0 {
            tracing::debug!(count, "Cancelled waiting requests");
        }

        return count;
    }

    fn enqueue<F, Fut, T>(&self, request_fn: F, timeout: Option<Duration>) -> QueueOutcome<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task: Box<dyn Task> = Box::new(PendingRequest {
            request_fn,
            timeout,
            tx,
        });

        let first = {
            let mut guard = lock(&self.state);
            guard.pending.push_back(task);
            if guard.processing {
                None
            } else {
                guard.processing = true;
                guard.pending.pop_front()
            }
        };

        if let Some(task) = first {
            tokio::spawn(drain(self.state.clone(), task));
        }

        return QueueOutcome { rx };
    }
}

/// Resolves with the value or error of one queued request.
pub struct QueueOutcome<T> {
    rx: oneshot::Receiver<Result<T, QueueError>>,
}

impl<T> Future for QueueOutcome<T> {
    type Output = Result<T, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        return match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(res)) => Poll::Ready(res),
            Poll::Ready(Err(_)) => Poll::Ready(Err(QueueError::Dropped)),
            Poll::Pending => Poll::Pending,
        };
    }
}
