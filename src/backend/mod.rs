mod memory;
mod shared;
mod window;

pub use memory::{InMemoryBackend, InMemoryBackendBuilder};
pub use shared::SharedWindowBackend;
pub use window::ClientWindow;

use std::time::Duration;
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            Self::Allowed
        } else {
            Self::Denied
        }
    }

    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn is_denied(self) -> bool {
        matches!(self, Self::Denied)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum SpecError {
    #[error("Rate limit window must be greater than zero")]
    ZeroWindow,
}

/// The limit applied by a sliding window counter.
///
/// Created once when a backend is built and never changed afterwards.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSpec"))]
pub struct RateLimitSpec {
    max_requests: u64,
    window: Duration,
}

impl RateLimitSpec {
    /// # Arguments
    ///
    /// * `max_requests`: The total requests to be allowed within the window. Zero denies
    ///   every request.
    /// * `window`: The duration over which requests are counted, must be non-zero.
    pub fn new(max_requests: u64, window: Duration) -> Result<Self, SpecError> {
        if window.is_zero() {
            return Err(SpecError::ZeroWindow);
        }
        Ok(Self {
            max_requests,
            window,
        })
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawSpec {
    max_requests: u64,
    window: Duration,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSpec> for RateLimitSpec {
    type Error = SpecError;

    fn try_from(raw: RawSpec) -> Result<Self, Self::Error> {
        RateLimitSpec::new(raw.max_requests, raw.window)
    }
}
