#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use burrow_cache::{CacheError, CacheKey, CachedResponse, MokaResponseCache, ResponseCache};
use burrow_core::config::{ProjectId, Secret, SettingsOverride};
use burrow_core::{
    ConfigResolver, EndpointMode, GatewayConfig, Identifier, IdentifierCodec, Settings,
};
use burrow_storage::{Commit, InMemoryObjectStore, ObjectStore, StorageError, StoreTarget};
use burrow_gateway::{App, AppState};
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use tower::ServiceExt;

pub const HOST: &str = "paste.example";
pub const OTHER_HOST: &str = "other.example";

/// Response cache that counts operations and can be switched to fail.
#[derive(Default)]
pub struct CountingCache {
    inner: MokaResponseCache,
    gets: AtomicUsize,
    puts: AtomicUsize,
    failing: AtomicBool,
}

impl CountingCache {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResponseCache for CountingCache {
    async fn get(&self, key: &CacheKey) -> burrow_cache::Result<Option<CachedResponse>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("test".into()));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &CacheKey, response: &CachedResponse) -> burrow_cache::Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("test".into()));
        }
        self.inner.put(key, response).await
    }
}

/// Object store whose reads fail at the transport level while an outage
/// lasts, then reach the wrapped in-memory store.
pub struct FlakyStore {
    inner: Arc<InMemoryObjectStore>,
    outages: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryObjectStore>) -> Self {
        Self {
            inner,
            outages: AtomicUsize::new(0),
        }
    }

    /// Makes the next `reads` reads fail as if the store were unreachable.
    pub fn disconnect_for(&self, reads: usize) {
        self.outages.store(reads, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn read_raw(&self, target: &StoreTarget, path: &str) -> burrow_storage::Result<Bytes> {
        let down = self
            .outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if down {
            return Err(StorageError::Unavailable("connection refused".into()));
        }
        self.inner.read_raw(target, path).await
    }

    async fn commit(
        &self,
        target: &StoreTarget,
        commit: &Commit,
    ) -> burrow_storage::Result<StatusCode> {
        self.inner.commit(target, commit).await
    }
}

pub fn settings() -> Settings {
    Settings {
        secret: Secret::new(b"test-secret".to_vec()),
        project: ProjectId::new("1"),
        token: "token".to_string(),
        upload_keys: HashMap::from([
            ("t".to_string(), EndpointMode::Plain),
            ("b".to_string(), EndpointMode::Base64),
            ("img".to_string(), EndpointMode::Plain),
            ("s".to_string(), EndpointMode::Shortener),
        ]),
        ..Settings::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryObjectStore>,
    pub flaky: Arc<FlakyStore>,
    pub cache: Arc<CountingCache>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(GatewayConfig {
            defaults: settings(),
            overrides: HashMap::new(),
        })
    }

    pub fn with_overrides(overrides: HashMap<String, SettingsOverride>) -> Self {
        Self::with_config(GatewayConfig {
            defaults: settings(),
            overrides,
        })
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        let resolver = ConfigResolver::new(config).expect("valid test config");
        let store = Arc::new(InMemoryObjectStore::new());
        let flaky = Arc::new(FlakyStore::new(store.clone()));
        let cache = Arc::new(CountingCache::default());
        let state = AppState::builder()
            .resolver(Arc::new(resolver))
            .store(flaky.clone())
            .cache(cache.clone())
            .build();

        Self {
            router: App::router(state.clone()),
            state,
            store,
            flaky,
            cache,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Waits until every detached cache write has finished.
    pub async fn settle(&self) {
        self.state.tasks.close();
        self.state.tasks.wait().await;
        self.state.tasks.reopen();
    }

    /// Stores `content` under a fresh identifier valid for `settings`.
    pub fn seed(&self, settings: &Settings, content: &'static [u8]) -> Identifier {
        let id = IdentifierCodec::new(settings).unwrap().generate().unwrap();
        self.store.insert(
            &StoreTarget::from(settings),
            &burrow_core::path::storage_path(&id),
            content,
        );
        id
    }
}

pub fn get(host: &str, path: &str) -> Request<Body> {
    Request::get(path)
        .header("host", host)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub const BOUNDARY: &str = "burrow-test-boundary";

pub enum Part<'a> {
    Text { name: &'a str, value: &'a str },
    File { name: &'a str, filename: &'a str, content: &'a [u8] },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_post(host: &str, path: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::post(path)
        .header("host", host)
        .header("cf-connecting-ip", "203.0.113.7")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}
