//! Per-request interception state machine.
//!
//! ```text
//! Created -> Deciding -> ReadingCache -> Delivering -> Completed
//!                    \-> Forwarding  -/            \-> Failed
//!                    \-> Rejected
//! ```
//!
//! A cache hit is replayed in fixed-size chunks. A forwarded response is
//! fanned out: every network chunk goes to the client and, while the writer
//! lease is held and the size cap allows it, into a capture buffer that is
//! committed as one entry once the stream ends cleanly.

pub mod lease;
pub mod sink;

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;

use offcache_core::policy::{INTERCEPTED_HEADER, evaluate};
use offcache_core::{
    CacheEntry, CacheKey, CacheStore, Decision, Error, Headers, KeyRules, PolicySignal, RejectReason, Request,
    SchemeRegistry,
};

use crate::fetch::{Transport, TransportResponse};

pub use lease::{WriterLease, WriterLeases};
pub use sink::{ChannelSink, CollectingSink, DeliveryEvent, ResponseSink, SinkClosed, channel};

/// Size of the chunks a cached body is replayed in.
pub const REPLAY_CHUNK_SIZE: usize = 64 * 1024;

/// Lifecycle of a single intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Created,
    Deciding,
    ReadingCache,
    Forwarding,
    Delivering,
    Completed,
    Failed,
    Rejected,
}

/// Terminal result of [`RequestHandler::run`].
#[derive(Debug)]
pub enum Outcome {
    Completed { from_cache: bool },
    Failed(Error),
    /// Nothing was delivered; the host should use its normal handling.
    Rejected(RejectReason),
    /// The client went away before delivery finished.
    Cancelled,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }
}

/// Response accumulated for a later commit.
struct Capture {
    lease: WriterLease,
    url: String,
    status: u16,
    headers: Headers,
    body: Vec<u8>,
    limit: usize,
}

impl Capture {
    /// Append a chunk; `false` once the entry would exceed the limit.
    fn push(&mut self, chunk: &[u8]) -> bool {
        if self.body.len() + chunk.len() > self.limit {
            return false;
        }
        self.body.extend_from_slice(chunk);
        true
    }

    /// Persist the capture. The lease is held until the write returns.
    async fn commit(self, store: &dyn CacheStore) {
        let Capture { lease, url, status, headers, body, .. } = self;
        let entry = CacheEntry::new(lease.key().clone(), url, status, headers, body);
        match store.write(&entry).await {
            Ok(()) => tracing::debug!(key = %entry.key, bytes = entry.body.len(), "stored {}", entry.url),
            Err(e) => tracing::warn!(key = %entry.key, error = %e, "failed to store captured response"),
        }
    }
}

/// Drives one request from decision to a single terminal signal.
pub struct RequestHandler {
    registry: Arc<SchemeRegistry>,
    store: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    rules: KeyRules,
    leases: WriterLeases,
    max_capture_bytes: usize,
    state: HandlerState,
}

impl RequestHandler {
    pub fn new(
        registry: Arc<SchemeRegistry>, store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>, rules: KeyRules,
        leases: WriterLeases, max_capture_bytes: usize,
    ) -> Self {
        Self { registry, store, transport, rules, leases, max_capture_bytes, state: HandlerState::Created }
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    fn transition(&mut self, next: HandlerState) {
        tracing::trace!(from = ?self.state, to = ?next, "handler state");
        self.state = next;
    }

    /// Handle `request` under `policy`, reporting progress to `sink`.
    pub async fn run(&mut self, request: &Request, policy: PolicySignal, sink: &mut dyn ResponseSink) -> Outcome {
        self.transition(HandlerState::Deciding);
        let evaluation = evaluate(request, &self.registry, self.store.as_ref(), &self.rules, policy).await;

        match (evaluation.decision, evaluation.key) {
            (Decision::ServeFromCache, Some(key)) => self.serve_from_cache(request, &key, policy, sink).await,
            (Decision::Forward, Some(key)) => self.forward(request, &key, sink).await,
            (Decision::Reject(RejectReason::UnavailableOffline), _) => {
                tracing::debug!("offline with nothing cached for {}", request.url);
                self.fail(sink, Error::CacheUnavailableOffline(request.url.clone())).await
            }
            (Decision::Reject(reason), _) => {
                tracing::debug!(?reason, "not intercepting {}", request.url);
                self.transition(HandlerState::Rejected);
                Outcome::Rejected(reason)
            }
            (_, None) => {
                self.transition(HandlerState::Rejected);
                Outcome::Rejected(RejectReason::UnsupportedScheme)
            }
        }
    }

    async fn serve_from_cache(
        &mut self, request: &Request, key: &CacheKey, policy: PolicySignal, sink: &mut dyn ResponseSink,
    ) -> Outcome {
        self.transition(HandlerState::ReadingCache);
        let entry = match self.store.read(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!(key = %key, "entry vanished before read");
                return self.fall_through(request, key, policy, sink).await;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed");
                return self.fall_through(request, key, policy, sink).await;
            }
        };

        tracing::debug!(key = %key, bytes = entry.body.len(), "cache hit for {}", request.url);
        self.transition(HandlerState::Delivering);
        if sink.on_response_metadata(entry.status, &entry.headers).await.is_err() {
            return self.cancelled();
        }

        let body = Bytes::from(entry.body);
        let mut offset = 0;
        while offset < body.len() {
            let end = (offset + REPLAY_CHUNK_SIZE).min(body.len());
            if sink.on_body_chunk(body.slice(offset..end)).await.is_err() {
                return self.cancelled();
            }
            offset = end;
        }

        sink.on_complete().await;
        self.transition(HandlerState::Completed);
        Outcome::Completed { from_cache: true }
    }

    async fn fall_through(
        &mut self, request: &Request, key: &CacheKey, policy: PolicySignal, sink: &mut dyn ResponseSink,
    ) -> Outcome {
        if policy == PolicySignal::OfflineOnly {
            return self.fail(sink, Error::CacheUnavailableOffline(request.url.clone())).await;
        }
        self.forward(request, key, sink).await
    }

    async fn forward(&mut self, request: &Request, key: &CacheKey, sink: &mut dyn ResponseSink) -> Outcome {
        self.transition(HandlerState::Forwarding);

        let lease = self.leases.try_acquire(key);
        if lease.is_none() {
            tracing::debug!(key = %key, "capture already in progress; forwarding without capture");
        }

        let mut outgoing = request.clone();
        outgoing.headers.push((INTERCEPTED_HEADER.to_string(), "1".to_string()));

        let TransportResponse { url, status, headers, mut body } = match self.transport.perform(&outgoing).await {
            Ok(response) => response,
            Err(e) => return self.fail(sink, e).await,
        };

        let mut capture = match lease {
            Some(lease) if (200..300).contains(&status) => {
                Some(Capture { lease, url, status, headers: headers.clone(), body: Vec::new(), limit: self.max_capture_bytes })
            }
            Some(_) => {
                tracing::debug!(key = %key, status, "not capturing unsuccessful response");
                None
            }
            None => None,
        };

        self.transition(HandlerState::Delivering);
        if sink.on_response_metadata(status, &headers).await.is_err() {
            return self.cancelled();
        }

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return self.fail(sink, e).await,
            };
            if capture.as_mut().is_some_and(|c| !c.push(&chunk)) {
                tracing::debug!(key = %key, limit = self.max_capture_bytes, "response too large; abandoning capture");
                capture = None;
            }
            if sink.on_body_chunk(chunk).await.is_err() {
                return self.cancelled();
            }
        }
        drop(body);

        if let Some(capture) = capture {
            capture.commit(self.store.as_ref()).await;
        }

        sink.on_complete().await;
        self.transition(HandlerState::Completed);
        Outcome::Completed { from_cache: false }
    }

    async fn fail(&mut self, sink: &mut dyn ResponseSink, error: Error) -> Outcome {
        tracing::debug!(error = %error, "request failed");
        sink.on_failure(&error).await;
        self.transition(HandlerState::Failed);
        Outcome::Failed(error)
    }

    fn cancelled(&mut self) -> Outcome {
        tracing::debug!("client went away; abandoning request");
        self.transition(HandlerState::Failed);
        Outcome::Cancelled
    }
}
