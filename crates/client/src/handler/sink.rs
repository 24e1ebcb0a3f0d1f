//! Client delivery callbacks.
//!
//! Every request sees metadata, then zero or more body chunks, then exactly
//! one terminal signal. A sink reports [`SinkClosed`] once the client has
//! gone away; the handler then stops reading from the network.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use offcache_core::{Error, Headers};

/// The client abandoned the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("client stopped listening")]
pub struct SinkClosed;

/// Receiver of a single response.
#[async_trait]
pub trait ResponseSink: Send {
    async fn on_response_metadata(&mut self, status: u16, headers: &Headers) -> Result<(), SinkClosed>;

    async fn on_body_chunk(&mut self, chunk: Bytes) -> Result<(), SinkClosed>;

    async fn on_complete(&mut self);

    async fn on_failure(&mut self, error: &Error);
}

/// One delivery signal, as seen by a channel receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    Metadata { status: u16, headers: Headers },
    Chunk(Bytes),
    Complete,
    Failure(String),
}

/// Forwards deliveries into a bounded channel.
///
/// Dropping the receiver cancels the request.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<DeliveryEvent>,
}

/// Create a channel-backed sink and the receiver the client reads from.
pub fn channel(capacity: usize) -> (ChannelSink, mpsc::Receiver<DeliveryEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelSink { tx }, rx)
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn on_response_metadata(&mut self, status: u16, headers: &Headers) -> Result<(), SinkClosed> {
        self.tx
            .send(DeliveryEvent::Metadata { status, headers: headers.clone() })
            .await
            .map_err(|_| SinkClosed)
    }

    async fn on_body_chunk(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        self.tx
            .send(DeliveryEvent::Chunk(chunk))
            .await
            .map_err(|_| SinkClosed)
    }

    async fn on_complete(&mut self) {
        let _ = self.tx.send(DeliveryEvent::Complete).await;
    }

    async fn on_failure(&mut self, error: &Error) {
        let _ = self.tx.send(DeliveryEvent::Failure(error.to_string())).await;
    }
}

/// Buffers a whole response in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectingSink {
    pub status: Option<u16>,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub completed: bool,
    pub failure: Option<String>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseSink for CollectingSink {
    async fn on_response_metadata(&mut self, status: u16, headers: &Headers) -> Result<(), SinkClosed> {
        self.status = Some(status);
        self.headers = headers.clone();
        Ok(())
    }

    async fn on_body_chunk(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    async fn on_complete(&mut self) {
        self.completed = true;
    }

    async fn on_failure(&mut self, error: &Error) {
        self.failure = Some(error.to_string());
    }
}
