//! Lookup services: provider call, validation and caching.

use common::errors::AppError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::cache::{CacheStore, MemoryCache};
use crate::clock::{Clock, SystemClock};

pub mod suggestions;
pub mod weather;

pub use suggestions::SuggestionsService;
pub use weather::WeatherService;

/// Default bound on a single provider call made on behalf of a request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Collaborators shared by every lookup service.
///
/// There is no coalescing of concurrent misses: two requests racing on a
/// cold key both call the provider and the later write wins.
#[derive(Clone)]
pub struct LookupContext {
    pub cache: Arc<dyn CacheStore>,
    pub clock: Arc<dyn Clock>,
    pub request_timeout: Duration,
}

impl LookupContext {
    pub fn new(cache: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, request_timeout: Duration) -> Self {
        Self {
            cache,
            clock,
            request_timeout,
        }
    }

    /// In-process cache driven by the wall clock.
    pub fn in_memory(request_timeout: Duration) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::new(
            Arc::new(MemoryCache::new(clock.clone())),
            clock,
            request_timeout,
        )
    }

    /// Run a provider call under the request timeout.
    pub(crate) async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        timeout(self.request_timeout, call).await.map_err(|_| {
            warn!(
                call = what,
                timeout_ms = self.request_timeout.as_millis(),
                "Provider call timed out"
            );
            AppError::timeout(format!(
                "{} timed out after {}ms",
                what,
                self.request_timeout.as_millis()
            ))
        })?
    }
}
