use std::time::Duration;

use thiserror::Error;

/// Outcome of a task that went through the request queue without producing a
/// value. Only the task's own caller ever sees it.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Task(#[from] anyhow::Error),
    #[error("request was cancelled before it started")]
    Cancelled,
    #[error("request timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
    #[error("request was dropped before it settled")]
    Dropped,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("chat server answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("chat server returned no reply text")]
    EmptyReply,
    #[error("chat request failed: {0}")]
    Request(String),
    #[error(transparent)]
    Queue(QueueError),
}

impl From<QueueError> for TransportError {
    fn from(err: QueueError) -> TransportError {
        match err {
            QueueError::Task(inner) => match inner.downcast::<TransportError>() {
                Ok(transport_err) => return transport_err,
                Err(other) => return TransportError::Request(format!("{other:#}")),
            },
            other => return TransportError::Queue(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no {entity} found for id {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    #[error("session store io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session store serialization failed: {0}")]
    Serialization(#[from] serde_yaml::Error),
}
