pub mod cache;
mod config;
mod error;
mod identity;
mod request;
mod transport;


use cache::SettlementGuard;
pub use cache::{CacheEntry, CacheStats, InFlightCache, SharedInFlightCache, SharedOperation};
pub use config::{ClientConfig, DEFAULT_CACHE_TTL_MS};
pub use error::{Result, TransportError, TransportErrorKind};
use futures::FutureExt;
pub use identity::{build_identity, ParamValue, Params};
use lazy_static::lazy_static;
pub use request::{RequestDescriptor, RequestOptions};
use serde::de::DeserializeOwned;
use std::sync::Arc;
pub use transport::{SurfTransport, Transport};

lazy_static! {
    static ref DEFAULT_CLIENT: RequestClient = RequestClient::new();
}

/// Process-wide client over the surf transport, for callers that don't
/// need their own de-duplication domain.
pub fn default_client() -> &'static RequestClient {
    &DEFAULT_CLIENT
}

#[derive(Clone)]
pub struct RequestClient {
    transport: Arc<dyn Transport>,
    cache: SharedInFlightCache,
    config: ClientConfig,
}

impl Default for RequestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestClient {
    /// Issue a GET, sharing the request already in flight for the same
    /// identity when `descriptor` has caching enabled.
    ///
    /// The returned operation is driven on the current Tokio runtime, so it
    /// settles (and releases its cache slot) even if nobody awaits it.
    /// Outside a runtime it runs when first polled.
    pub fn get(&self, descriptor: &RequestDescriptor) -> SharedOperation {
        let identity = descriptor.identity();
        let options = RequestOptions::for_request(
            &self.config.default_headers,
            descriptor.headers().as_ref(),
        );

        if !descriptor.cache_enabled() {
            return self.issue(identity, options);
        }

        let (operation, issued) = self
            .cache
            .pending_or_store(&identity, || self.issue(identity.clone(), options));
        if !issued {
            log::debug!("Returning in-flight request for: {}", identity);
        }
        operation
    }

    /// [`RequestClient::get`] and deserialize the decoded body into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Result<T> {
        let value = self.get(descriptor).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn issue(&self, identity: String, options: Option<RequestOptions>) -> SharedOperation {
        log::debug!("Executing new request for: {}", identity);

        let transport = self.transport.clone();
        let guard = SettlementGuard::new(&self.cache, identity.clone());
        let task = async move {
            let _guard = guard;
            let result = transport.execute(&identity, options.as_ref()).await;
            if let Err(err) = &result {
                log::warn!("Request for {} failed: {}", identity, err);
            }
            result
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let handle = runtime.spawn(task);
                async move {
                    handle
                        .await
                        .unwrap_or_else(|err| Err(TransportError::aborted(err.to_string())))
                }
                .boxed()
                .shared()
            }
            Err(_) => task.boxed().shared(),
        }
    }

    /// Forget every in-flight request. Operations already handed out still
    /// settle for their holders; new calls issue fresh requests.
    pub fn reset_cache(&self) {
        self.cache.reset();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &SharedInFlightCache {
        &self.cache
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a new RequestClient over surf with default settings
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_parts(
            Arc::new(SurfTransport::new()),
            Arc::new(InFlightCache::new()),
            config,
        )
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self::with_parts(transport, Arc::new(InFlightCache::new()), ClientConfig::default())
    }

    /// Clients built over the same `cache` share in-flight requests
    pub fn with_parts(
        transport: Arc<dyn Transport>,
        cache: SharedInFlightCache,
        config: ClientConfig,
    ) -> Self {
        Self {
            transport,
            cache,
            config,
        }
    }
}
