use std::collections::HashMap;

/// Milliseconds in a minute, the time to live a request carries unless it sets its own
pub const DEFAULT_CACHE_TTL_MS: i64 = 60_000;

/// Configuration shared by every request issued through one client
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    /// Headers sent with every request, overridden by per-request headers
    pub default_headers: HashMap<String, String>,
}

impl ClientConfig {
    pub fn new(default_headers: HashMap<String, String>) -> Self {
        Self { default_headers }
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}
