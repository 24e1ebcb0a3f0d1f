//! Request interception for offcache.
//!
//! This crate provides the network transport, the per-request handler that
//! decides between cache and network, and the [`Interceptor`] hosts route
//! matching requests through.

pub mod fetch;
pub mod handler;
pub mod interceptor;

pub use fetch::{BodyStream, FetchClient, FetchConfig, Transport, TransportResponse};
pub use handler::{
    ChannelSink, CollectingSink, DeliveryEvent, HandlerState, Outcome, RequestHandler, ResponseSink, SinkClosed,
    WriterLease, WriterLeases,
};
pub use interceptor::Interceptor;
