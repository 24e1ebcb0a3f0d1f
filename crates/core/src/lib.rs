//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Cache keys, entries and stores (SQLite and file-backed)
//! - The scheme registry and the cache-versus-network decision
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod policy;
pub mod request;
pub mod scheme;

pub use cache::{CacheDb, CacheEntry, CacheKey, CacheStore, FsCacheStore, KeyRules};
pub use config::{AppConfig, ConfigError, StoreKind};
pub use error::Error;
pub use policy::{Decision, PolicySignal, RejectReason};
pub use request::{Headers, Request};
pub use scheme::SchemeRegistry;
