//! Host-facing entry point of the interception layer.

use std::sync::Arc;

use offcache_core::policy::{evaluate, is_interceptable};
use offcache_core::{AppConfig, CacheStore, Decision, Error, KeyRules, PolicySignal, Request, SchemeRegistry};

use crate::fetch::Transport;
use crate::handler::{Outcome, RequestHandler, ResponseSink, WriterLeases};

/// Shared state for every intercepted request.
///
/// Cheap to clone; clones share the registry, store, transport and leases.
#[derive(Clone)]
pub struct Interceptor {
    registry: Arc<SchemeRegistry>,
    store: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    rules: KeyRules,
    leases: WriterLeases,
    max_capture_bytes: usize,
}

impl Interceptor {
    pub fn new(
        registry: Arc<SchemeRegistry>, store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>, rules: KeyRules,
        max_capture_bytes: usize,
    ) -> Self {
        Self { registry, store, transport, rules, leases: WriterLeases::new(), max_capture_bytes }
    }

    /// Build from loaded configuration.
    pub fn from_config(config: &AppConfig, store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>) -> Self {
        Self::new(
            Arc::new(config.scheme_registry()),
            store,
            transport,
            config.key_rules(),
            config.max_capture_bytes,
        )
    }

    pub fn registry(&self) -> &Arc<SchemeRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn rules(&self) -> &KeyRules {
        &self.rules
    }

    /// Whether the host should route `request` through [`Interceptor::handle`].
    pub fn can_handle(&self, request: &Request) -> bool {
        is_interceptable(request, &self.registry)
    }

    /// A fresh handler for one request.
    pub fn handler(&self) -> RequestHandler {
        RequestHandler::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
            self.rules.clone(),
            self.leases.clone(),
            self.max_capture_bytes,
        )
    }

    pub async fn handle(&self, request: &Request, policy: PolicySignal, sink: &mut dyn ResponseSink) -> Outcome {
        self.handler().run(request, policy, sink).await
    }

    /// Whether `request` would be answered from the cache right now. No side effects.
    pub async fn use_cache(&self, request: &Request, policy: PolicySignal) -> bool {
        let evaluation = evaluate(request, &self.registry, self.store.as_ref(), &self.rules, policy).await;
        evaluation.decision == Decision::ServeFromCache
    }

    /// Store locator the entry for `request` lives (or would live) at.
    pub fn cache_path_for_request(&self, request: &Request) -> Result<String, Error> {
        let key = offcache_core::cache::derive_key(request, &self.rules)?;
        Ok(self.store.locator(&key))
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("schemes", &self.registry.supported_schemes())
            .field("rules", &self.rules)
            .field("max_capture_bytes", &self.max_capture_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::TransportResponse;
    use crate::handler::{CollectingSink, DeliveryEvent, HandlerState, channel};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use offcache_core::policy::INTERCEPTED_HEADER;
    use offcache_core::{CacheDb, CacheEntry, FsCacheStore, RejectReason};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted transport that counts invocations.
    struct MockTransport {
        calls: AtomicUsize,
        status: u16,
        chunks: Vec<Result<&'static [u8], &'static str>>,
        connect_error: Option<&'static str>,
        seen: Mutex<Vec<Request>>,
    }

    impl MockTransport {
        fn ok(status: u16, chunks: &[&'static [u8]]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status,
                chunks: chunks.iter().map(|c| Ok(*c)).collect(),
                connect_error: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn with_chunks(status: u16, chunks: Vec<Result<&'static [u8], &'static str>>) -> Self {
            Self { chunks, ..Self::ok(status, &[]) }
        }

        fn unreachable() -> Self {
            Self { connect_error: Some("connection refused"), ..Self::ok(200, &[]) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn perform(&self, request: &Request) -> Result<TransportResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            tokio::task::yield_now().await;
            if let Some(message) = self.connect_error {
                return Err(Error::Transport(message.to_string()));
            }
            let chunks: Vec<Result<Bytes, Error>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(bytes) => Ok(Bytes::from_static(*bytes)),
                    Err(message) => Err(Error::Transport(message.to_string())),
                })
                .collect();
            Ok(TransportResponse {
                url: request.url.clone(),
                status: self.status,
                headers: vec![("content-type".into(), "text/plain".into())],
                body: futures_util::stream::iter(chunks).boxed(),
            })
        }
    }

    struct Fixture {
        interceptor: Interceptor,
        store: Arc<CacheDb>,
        transport: Arc<MockTransport>,
    }

    async fn fixture(transport: MockTransport) -> Fixture {
        fixture_with_limit(transport, 1024).await
    }

    async fn fixture_with_limit(transport: MockTransport, limit: usize) -> Fixture {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let transport = Arc::new(transport);
        let interceptor = Interceptor::new(
            Arc::new(SchemeRegistry::new(["http", "https"])),
            store.clone(),
            transport.clone(),
            KeyRules::default(),
            limit,
        );
        Fixture { interceptor, store, transport }
    }

    fn key_for(request: &Request) -> offcache_core::CacheKey {
        offcache_core::cache::derive_key(request, &KeyRules::default()).unwrap()
    }

    async fn seed(store: &dyn CacheStore, request: &Request, body: &[u8]) {
        let entry = CacheEntry::new(key_for(request), &request.url, 200, vec![], body.to_vec());
        store.write(&entry).await.unwrap();
    }

    /// Wraps a real store and fails the selected operations.
    #[derive(Default)]
    struct FailingStore {
        inner: Option<Arc<CacheDb>>,
        fail_exists: bool,
        fail_read: bool,
        fail_write: bool,
        writes: AtomicUsize,
    }

    impl FailingStore {
        fn storage_error(op: &str) -> Error {
            Error::Storage(format!("disk unavailable during {op}"))
        }
    }

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn exists(&self, key: &offcache_core::CacheKey) -> Result<bool, Error> {
            match &self.inner {
                _ if self.fail_exists => Err(Self::storage_error("exists")),
                Some(inner) => inner.exists(key).await,
                None => Ok(false),
            }
        }

        async fn read(&self, key: &offcache_core::CacheKey) -> Result<Option<CacheEntry>, Error> {
            match &self.inner {
                _ if self.fail_read => Err(Self::storage_error("read")),
                Some(inner) => inner.read(key).await,
                None => Ok(None),
            }
        }

        async fn write(&self, entry: &CacheEntry) -> Result<(), Error> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            match &self.inner {
                _ if self.fail_write => Err(Self::storage_error("write")),
                Some(inner) => inner.write(entry).await,
                None => Ok(()),
            }
        }

        async fn delete(&self, _key: &offcache_core::CacheKey) -> Result<bool, Error> {
            Err(Self::storage_error("delete"))
        }

        fn locator(&self, key: &offcache_core::CacheKey) -> String {
            format!("failing://{key}")
        }
    }

    fn failing_interceptor(
        store: FailingStore, transport: MockTransport,
    ) -> (Interceptor, Arc<FailingStore>, Arc<MockTransport>) {
        let store = Arc::new(store);
        let transport = Arc::new(transport);
        let interceptor = Interceptor::new(
            Arc::new(SchemeRegistry::new(["https"])),
            store.clone(),
            transport.clone(),
            KeyRules::default(),
            1024,
        );
        (interceptor, store, transport)
    }

    /// An in-memory store already holding `body` for `request`.
    async fn seeded_db(request: &Request, body: &[u8]) -> Arc<CacheDb> {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        seed(db.as_ref(), request, body).await;
        db
    }

    #[tokio::test]
    async fn test_forward_populates_cache() {
        let f = fixture(MockTransport::ok(200, &[b"X"])).await;
        let request = Request::get("https://example.com/a");
        let (mut sink, mut rx) = channel(8);

        let outcome = f.interceptor.handle(&request, PolicySignal::PreferNetwork, &mut sink).await;
        assert!(matches!(outcome, Outcome::Completed { from_cache: false }));

        assert!(matches!(rx.recv().await, Some(DeliveryEvent::Metadata { status: 200, .. })));
        assert_eq!(rx.recv().await, Some(DeliveryEvent::Chunk(Bytes::from_static(b"X"))));
        assert_eq!(rx.recv().await, Some(DeliveryEvent::Complete));

        let entry = f.store.read(&key_for(&request)).await.unwrap().unwrap();
        assert_eq!(entry.body, b"X");
        assert_eq!(entry.status, 200);
        assert_eq!(entry.content_type(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_offline_serves_cache_without_network() {
        let f = fixture(MockTransport::ok(200, &[b"network"])).await;
        let request = Request::get("https://example.com/a");
        seed(f.store.as_ref(), &request, b"Y").await;

        let mut sink = CollectingSink::new();
        let outcome = f.interceptor.handle(&request, PolicySignal::OfflineOnly, &mut sink).await;

        assert!(matches!(outcome, Outcome::Completed { from_cache: true }));
        assert_eq!(sink.body, b"Y");
        assert!(sink.completed);
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_offline_miss_fails_without_network() {
        let f = fixture(MockTransport::ok(200, &[b"network"])).await;
        let request = Request::get("https://example.com/a");

        let mut sink = CollectingSink::new();
        let outcome = f.interceptor.handle(&request, PolicySignal::OfflineOnly, &mut sink).await;

        assert!(matches!(outcome, Outcome::Failed(Error::CacheUnavailableOffline(_))));
        assert!(sink.failure.unwrap().starts_with("CACHE_UNAVAILABLE_OFFLINE"));
        assert_eq!(sink.status, None);
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_forwards_leave_one_complete_entry() {
        let f = fixture(MockTransport::ok(200, &[b"first ", b"second"])).await;
        let request = Request::get("https://example.com/a");

        let (mut a, mut b) = (CollectingSink::new(), CollectingSink::new());
        let (first, second) = tokio::join!(
            f.interceptor.handle(&request, PolicySignal::PreferNetwork, &mut a),
            f.interceptor.handle(&request, PolicySignal::PreferNetwork, &mut b),
        );

        assert!(first.is_completed() && second.is_completed());
        assert_eq!(a.body, b"first second");
        assert_eq!(b.body, b"first second");
        assert_eq!(f.transport.calls(), 2);

        let key = key_for(&request);
        assert!(f.store.exists(&key).await.unwrap());
        assert_eq!(f.store.read(&key).await.unwrap().unwrap().body, b"first second");
    }

    #[tokio::test]
    async fn test_prefer_cache_hit_and_miss() {
        let f = fixture(MockTransport::ok(200, &[b"fresh"])).await;
        let cached = Request::get("https://example.com/cached");
        let missing = Request::get("https://example.com/missing");
        seed(f.store.as_ref(), &cached, b"old").await;

        let mut sink = CollectingSink::new();
        let outcome = f.interceptor.handle(&cached, PolicySignal::PreferCache, &mut sink).await;
        assert!(matches!(outcome, Outcome::Completed { from_cache: true }));
        assert_eq!(sink.body, b"old");
        assert_eq!(f.transport.calls(), 0);

        let mut sink = CollectingSink::new();
        let outcome = f.interceptor.handle(&missing, PolicySignal::PreferCache, &mut sink).await;
        assert!(matches!(outcome, Outcome::Completed { from_cache: false }));
        assert_eq!(sink.body, b"fresh");
        assert_eq!(f.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_prefer_network_refreshes_entry() {
        let f = fixture(MockTransport::ok(200, &[b"new"])).await;
        let request = Request::get("https://example.com/a");
        seed(f.store.as_ref(), &request, b"old").await;

        let mut sink = CollectingSink::new();
        f.interceptor.handle(&request, PolicySignal::PreferNetwork, &mut sink).await;

        assert_eq!(f.store.read(&key_for(&request)).await.unwrap().unwrap().body, b"new");
    }

    #[tokio::test]
    async fn test_forwarded_request_carries_marker() {
        let f = fixture(MockTransport::ok(200, &[b"X"])).await;
        let request = Request::get("https://example.com/a");

        f.interceptor.handle(&request, PolicySignal::PreferNetwork, &mut CollectingSink::new()).await;

        let seen = f.transport.seen.lock().unwrap();
        assert_eq!(seen[0].header(INTERCEPTED_HEADER), Some("1"));
        assert!(!f.interceptor.can_handle(&seen[0]));
        assert!(request.header(INTERCEPTED_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_rejected_requests_deliver_nothing() {
        let f = fixture(MockTransport::ok(200, &[b"X"])).await;
        let cases = [
            (Request::get("ftp://example.com/a"), RejectReason::UnsupportedScheme),
            (Request::new("POST", "https://example.com/a"), RejectReason::UncacheableMethod),
            (Request::get("https://example.com/a").with_header(INTERCEPTED_HEADER, "1"), RejectReason::AlreadyIntercepted),
        ];

        for (request, reason) in cases {
            let mut sink = CollectingSink::new();
            let mut handler = f.interceptor.handler();
            let outcome = handler.run(&request, PolicySignal::PreferNetwork, &mut sink).await;
            assert!(matches!(outcome, Outcome::Rejected(r) if r == reason));
            assert_eq!(handler.state(), HandlerState::Rejected);
            assert_eq!(sink, CollectingSink::default());
        }
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_at_connect() {
        let f = fixture(MockTransport::unreachable()).await;
        let request = Request::get("https://example.com/a");

        let mut sink = CollectingSink::new();
        let mut handler = f.interceptor.handler();
        let outcome = handler.run(&request, PolicySignal::PreferNetwork, &mut sink).await;

        assert!(matches!(outcome, Outcome::Failed(Error::Transport(_))));
        assert_eq!(handler.state(), HandlerState::Failed);
        assert!(sink.failure.is_some());
        assert!(!f.store.exists(&key_for(&request)).await.unwrap());
    }

    #[tokio::test]
    async fn test_transport_failure_mid_stream_discards_capture() {
        let transport = MockTransport::with_chunks(200, vec![Ok(&b"partial"[..]), Err("connection reset")]);
        let f = fixture(transport).await;
        let request = Request::get("https://example.com/a");

        let mut sink = CollectingSink::new();
        let outcome = f.interceptor.handle(&request, PolicySignal::PreferNetwork, &mut sink).await;

        assert!(matches!(outcome, Outcome::Failed(Error::Transport(_))));
        assert_eq!(sink.body, b"partial");
        assert!(!sink.completed);
        assert!(!f.store.exists(&key_for(&request)).await.unwrap());
        assert!(f.interceptor.leases.is_empty());
    }

    #[tokio::test]
    async fn test_unsuccessful_response_not_captured() {
        let f = fixture(MockTransport::ok(404, &[b"not found"])).await;
        let request = Request::get("https://example.com/a");

        let mut sink = CollectingSink::new();
        let outcome = f.interceptor.handle(&request, PolicySignal::PreferNetwork, &mut sink).await;

        assert!(matches!(outcome, Outcome::Completed { from_cache: false }));
        assert_eq!(sink.status, Some(404));
        assert_eq!(sink.body, b"not found");
        assert!(!f.store.exists(&key_for(&request)).await.unwrap());
    }

    #[tokio::test]
    async fn test_oversize_response_delivered_but_not_captured() {
        let f = fixture_with_limit(MockTransport::ok(200, &[b"0123", b"4567"]), 6).await;
        let request = Request::get("https://example.com/a");

        let mut sink = CollectingSink::new();
        let outcome = f.interceptor.handle(&request, PolicySignal::PreferNetwork, &mut sink).await;

        assert!(outcome.is_completed());
        assert_eq!(sink.body, b"01234567");
        assert!(!f.store.exists(&key_for(&request)).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_client_discards_capture() {
        let f = fixture(MockTransport::ok(200, &[b"a", b"b"])).await;
        let request = Request::get("https://example.com/a");
        let (mut sink, rx) = channel(1);
        drop(rx);

        let outcome = f.interceptor.handle(&request, PolicySignal::PreferNetwork, &mut sink).await;

        assert!(matches!(outcome, Outcome::Cancelled));
        assert!(!f.store.exists(&key_for(&request)).await.unwrap());
        assert!(f.interceptor.leases.is_empty());
    }

    #[tokio::test]
    async fn test_cache_replay_is_chunked() {
        let f = fixture(MockTransport::ok(200, &[])).await;
        let request = Request::get("https://example.com/big");
        let body = vec![7u8; crate::handler::REPLAY_CHUNK_SIZE + 10];
        seed(f.store.as_ref(), &request, &body).await;

        let (mut sink, mut rx) = channel(8);
        let handle = tokio::spawn({
            let interceptor = f.interceptor.clone();
            async move { interceptor.handle(&request, PolicySignal::OfflineOnly, &mut sink).await }
        });

        let mut chunks = Vec::new();
        while let Some(event) = rx.recv().await {
            if let DeliveryEvent::Chunk(chunk) = event {
                chunks.push(chunk.len());
            }
        }
        assert!(handle.await.unwrap().is_completed());
        assert_eq!(chunks, vec![crate::handler::REPLAY_CHUNK_SIZE, 10]);
    }

    #[tokio::test]
    async fn test_use_cache_has_no_side_effects() {
        let f = fixture(MockTransport::ok(200, &[b"X"])).await;
        let request = Request::get("https://example.com/a");

        assert!(!f.interceptor.use_cache(&request, PolicySignal::PreferCache).await);
        seed(f.store.as_ref(), &request, b"Y").await;
        assert!(f.interceptor.use_cache(&request, PolicySignal::PreferCache).await);
        assert!(!f.interceptor.use_cache(&request, PolicySignal::PreferNetwork).await);
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_can_handle_follows_registry_updates() {
        let f = fixture(MockTransport::ok(200, &[])).await;
        let request = Request::get("https://example.com/a");

        assert!(f.interceptor.can_handle(&request));
        f.interceptor.registry().set_supported_schemes(["http"]);
        assert!(!f.interceptor.can_handle(&request));
        f.interceptor.registry().set_supported_schemes(Vec::<String>::new());
        assert!(!f.interceptor.can_handle(&Request::get("http://example.com/")));
    }

    #[tokio::test]
    async fn test_cache_path_for_request() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsCacheStore::open(dir.path()).await.unwrap());
        let interceptor = Interceptor::new(
            Arc::new(SchemeRegistry::new(["https"])),
            store.clone(),
            Arc::new(MockTransport::ok(200, &[])),
            KeyRules::default(),
            1024,
        );
        let request = Request::get("https://example.com/a");

        let path = interceptor.cache_path_for_request(&request).unwrap();
        assert_eq!(path, store.entry_path(&key_for(&request)).display().to_string());
        assert!(matches!(
            interceptor.cache_path_for_request(&Request::get("not a url")),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_store_round_trip_through_interceptor() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn CacheStore> = Arc::new(FsCacheStore::open(dir.path()).await.unwrap());
        let transport = Arc::new(MockTransport::ok(200, &[b"on ", b"disk"]));
        let interceptor =
            Interceptor::new(Arc::new(SchemeRegistry::new(["https"])), store, transport.clone(), KeyRules::default(), 1024);
        let request = Request::get("https://example.com/a");

        interceptor.handle(&request, PolicySignal::PreferNetwork, &mut CollectingSink::new()).await;
        let mut sink = CollectingSink::new();
        let outcome = interceptor.handle(&request, PolicySignal::OfflineOnly, &mut sink).await;

        assert!(matches!(outcome, Outcome::Completed { from_cache: true }));
        assert_eq!(sink.body, b"on disk");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_still_delivers_response() {
        let store = FailingStore { fail_write: true, ..Default::default() };
        let (interceptor, store, transport) = failing_interceptor(store, MockTransport::ok(200, &[b"full ", b"body"]));
        let request = Request::get("https://example.com/a");

        let mut sink = CollectingSink::new();
        let outcome = interceptor.handle(&request, PolicySignal::PreferNetwork, &mut sink).await;

        assert!(matches!(outcome, Outcome::Completed { from_cache: false }));
        assert_eq!(sink.status, Some(200));
        assert_eq!(sink.body, b"full body");
        assert!(sink.completed);
        assert!(sink.failure.is_none());
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls(), 1);
        assert!(interceptor.leases.is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_falls_through_to_network() {
        let request = Request::get("https://example.com/a");
        let inner = seeded_db(&request, b"cached").await;
        let store = FailingStore { inner: Some(inner), fail_read: true, ..Default::default() };
        let (interceptor, _store, transport) = failing_interceptor(store, MockTransport::ok(200, &[b"network"]));

        assert!(interceptor.use_cache(&request, PolicySignal::PreferCache).await);

        let mut sink = CollectingSink::new();
        let outcome = interceptor.handle(&request, PolicySignal::PreferCache, &mut sink).await;

        assert!(matches!(outcome, Outcome::Completed { from_cache: false }));
        assert_eq!(sink.body, b"network");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_read_failure_offline_is_unavailable() {
        let request = Request::get("https://example.com/a");
        let inner = seeded_db(&request, b"cached").await;
        let store = FailingStore { inner: Some(inner), fail_read: true, ..Default::default() };
        let (interceptor, _store, transport) = failing_interceptor(store, MockTransport::ok(200, &[b"network"]));

        let mut sink = CollectingSink::new();
        let outcome = interceptor.handle(&request, PolicySignal::OfflineOnly, &mut sink).await;

        assert!(matches!(outcome, Outcome::Failed(Error::CacheUnavailableOffline(_))));
        assert!(sink.failure.unwrap().starts_with("CACHE_UNAVAILABLE_OFFLINE"));
        assert!(sink.body.is_empty());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_exists_failure_offline_is_unavailable() {
        let request = Request::get("https://example.com/a");
        let inner = seeded_db(&request, b"cached").await;
        let store = FailingStore { inner: Some(inner), fail_exists: true, ..Default::default() };
        let (interceptor, _store, transport) = failing_interceptor(store, MockTransport::ok(200, &[b"network"]));

        assert!(!interceptor.use_cache(&request, PolicySignal::OfflineOnly).await);

        let mut sink = CollectingSink::new();
        let outcome = interceptor.handle(&request, PolicySignal::OfflineOnly, &mut sink).await;

        assert!(matches!(outcome, Outcome::Failed(Error::CacheUnavailableOffline(_))));
        assert_eq!(sink.status, None);
        assert_eq!(transport.calls(), 0);
    }
}
