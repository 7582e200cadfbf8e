//! Response Router
//!
//! Correlates inbound response envelopes with the callers waiting on them.
//! Each pending request owns a oneshot completion keyed by its identifier;
//! the entry is removed the moment a response arrives or the caller stops
//! waiting, so a request completes at most once.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::domain::{ClientError, RequestId, ResponseEnvelope};

type Completion = oneshot::Sender<Result<Value, ClientError>>;
type PendingMap = DashMap<RequestId, Completion>;

pub struct ResponseRouter {
    pending: Arc<PendingMap>,
    next_id: AtomicU64,
}

impl ResponseRouter {
    pub fn new() -> Self {
        ResponseRouter {
            pending: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh request identifier
    pub fn next_id(&self) -> RequestId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a pending request under `id`
    ///
    /// Returns `None` if `id` is already pending.
    pub fn register(&self, id: RequestId) -> Option<PendingResponse> {
        match self.pending.entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let (tx, rx) = oneshot::channel();
                slot.insert(tx);
                Some(PendingResponse {
                    id,
                    rx,
                    pending: Arc::clone(&self.pending),
                })
            }
        }
    }

    /// Register a pending request under a freshly allocated identifier
    pub fn register_next(&self) -> PendingResponse {
        loop {
            if let Some(pending) = self.register(self.next_id()) {
                return pending;
            }
        }
    }

    /// Complete the pending request matching `envelope`
    ///
    /// Returns false when no request was waiting for it.
    pub fn dispatch(&self, envelope: ResponseEnvelope) -> bool {
        let Some(id) = envelope.id() else {
            if let ResponseEnvelope::Error { error, .. } = &envelope {
                tracing::warn!("Relay reported error without request id: {}", error);
            }
            return false;
        };

        let Some((_, completion)) = self.pending.remove(&id) else {
            tracing::warn!("Dropping response {} with no pending request", id);
            return false;
        };

        let outcome = match envelope {
            ResponseEnvelope::Result { result, .. } => Ok(result),
            ResponseEnvelope::Error { error, .. } => Err(ClientError::Relay(error)),
        };

        if completion.send(outcome).is_err() {
            tracing::debug!("Caller for request {} stopped waiting", id);
        }
        true
    }

    /// Reject every pending request with `error`
    pub fn reject_all(&self, error: ClientError) -> usize {
        let ids: Vec<RequestId> = self.pending.iter().map(|entry| *entry.key()).collect();

        let mut rejected = 0;
        for id in ids {
            if let Some((_, completion)) = self.pending.remove(&id) {
                let _ = completion.send(Err(error.clone()));
                rejected += 1;
            }
        }
        rejected
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }
}

impl Default for ResponseRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle a caller suspends on until its response arrives
///
/// Dropping the handle abandons the wait and removes the pending entry.
#[derive(Debug)]
pub struct PendingResponse {
    id: RequestId,
    rx: oneshot::Receiver<Result<Value, ClientError>>,
    pending: Arc<PendingMap>,
}

impl PendingResponse {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wait for the response, optionally bounded by `timeout`
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<Value, ClientError> {
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(ClientError::Timeout {
                        id: self.id,
                        timeout: limit,
                    });
                }
            },
            None => (&mut self.rx).await,
        };

        outcome.unwrap_or(Err(ClientError::ConnectionClosed))
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        // Only remove our own entry: a completed id may have been registered again
        self.rx.close();
        self.pending
            .remove_if(&self.id, |_, completion| completion.is_closed());
    }
}
