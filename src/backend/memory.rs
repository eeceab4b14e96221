use crate::backend::{ClientWindow, Decision, RateLimitSpec};
use actix_web::rt::task::JoinHandle;
use actix_web::rt::time::Instant;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// A sliding window rate limiter backend that keeps one [ClientWindow] per client identity in a
/// [DashMap].
///
/// Cloning is cheap and every clone shares the same counters, so a single backend should be
/// created outside of the `HttpServer::new` factory and cloned into each worker.
#[derive(Clone)]
pub struct InMemoryBackend {
    spec: RateLimitSpec,
    map: Arc<DashMap<String, ClientWindow>>,
    _gc_handle: Option<Arc<GcHandle>>,
}

impl InMemoryBackend {
    pub fn builder(spec: RateLimitSpec) -> InMemoryBackendBuilder {
        InMemoryBackendBuilder {
            spec,
            gc_interval: None,
        }
    }

    pub fn spec(&self) -> &RateLimitSpec {
        &self.spec
    }

    /// Run the admission check for `key`, recording the request if it is allowed.
    ///
    /// The window for a previously unseen key is created whatever the outcome.
    pub fn request(&self, key: &str) -> Decision {
        let now = Instant::now();
        // The entry guard holds the shard lock until the decision has been recorded.
        let mut window = self.map.entry(key.to_owned()).or_default();
        window.admit(now, &self.spec)
    }

    /// Number of requests `key` may still make within the current window.
    pub fn remaining(&self, key: &str) -> u64 {
        match self.map.get(key) {
            Some(window) => window.remaining(Instant::now(), &self.spec),
            None => self.spec.max_requests(),
        }
    }

    /// Removes the window for a given client identity.
    pub fn remove_key(&self, key: &str) {
        self.map.remove(key);
    }

    /// Number of client identities currently tracked.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn garbage_collector(
        map: Arc<DashMap<String, ClientWindow>>,
        window: Duration,
        interval: Duration,
    ) -> JoinHandle<()> {
        assert!(!interval.is_zero(), "GC interval must be non-zero");
        actix_web::rt::spawn(async move {
            loop {
                let now = Instant::now();
                let before = map.len();
                map.retain(|_k, v| !v.is_stale(now, window));
                log::debug!(
                    "Rate limiter garbage collector removed {} stale clients",
                    before.saturating_sub(map.len())
                );
                actix_web::rt::time::sleep_until(now + interval).await;
            }
        })
    }
}

struct GcHandle(JoinHandle<()>);

impl Drop for GcHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct InMemoryBackendBuilder {
    spec: RateLimitSpec,
    gc_interval: Option<Duration>,
}

impl InMemoryBackendBuilder {
    /// Enable the garbage collector.
    ///
    /// The garbage collector periodically scans the internal map, removing clients whose
    /// requests have all left the window. It is spawned on the actix runtime, so `build()` must
    /// then be called from within one.
    ///
    /// Default is None (disabled), in which case the map keeps every client it has seen.
    pub fn with_gc_interval(mut self, interval: Option<Duration>) -> Self {
        self.gc_interval = interval;
        self
    }

    pub fn build(self) -> InMemoryBackend {
        let map = Arc::new(DashMap::<String, ClientWindow>::new());
        let gc_handle = self.gc_interval.map(|gc_interval| {
            Arc::new(GcHandle(InMemoryBackend::garbage_collector(
                map.clone(),
                self.spec.window(),
                gc_interval,
            )))
        });
        InMemoryBackend {
            spec: self.spec,
            map,
            _gc_handle: gc_handle,
        }
    }
}
