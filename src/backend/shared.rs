use crate::backend::{ClientWindow, Decision, RateLimitSpec};
use actix_web::rt::time::Instant;
use parking_lot::Mutex;
use std::sync::Arc;

/// A single, unkeyed sliding window shared by every request that goes through it.
///
/// Clones share the same window.
#[derive(Clone)]
pub struct SharedWindowBackend {
    spec: RateLimitSpec,
    window: Arc<Mutex<ClientWindow>>,
}

impl SharedWindowBackend {
    pub fn new(spec: RateLimitSpec) -> Self {
        Self {
            spec,
            window: Arc::new(Mutex::new(ClientWindow::new())),
        }
    }

    pub fn spec(&self) -> &RateLimitSpec {
        &self.spec
    }

    /// Run the admission check, recording the request if it is allowed.
    pub fn request(&self) -> Decision {
        let now = Instant::now();
        self.window.lock().admit(now, &self.spec)
    }

    pub fn remaining(&self) -> u64 {
        self.window.lock().remaining(Instant::now(), &self.spec)
    }
}
