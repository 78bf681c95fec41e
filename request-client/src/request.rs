use crate::config::DEFAULT_CACHE_TTL_MS;
use crate::identity::{build_identity, ParamValue, Params};
use chrono::Duration;
use getset::{CopyGetters, Getters};
use std::collections::HashMap;

/// Description of a single GET request.
///
/// Only `url` and `params` take part in the request identity; headers and
/// cache settings never do.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct RequestDescriptor {
    #[get = "pub"]
    url: String,
    #[get = "pub"]
    params: Option<Params>,
    #[get = "pub"]
    headers: Option<HashMap<String, String>>,
    /// Whether concurrent identical requests share one in-flight operation
    #[get_copy = "pub"]
    cache_enabled: bool,
    /// Accepted for compatibility; in-flight entries are cleared on
    /// settlement, never by age.
    #[get_copy = "pub"]
    cache_ttl: Duration,
}

impl RequestDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: None,
            headers: None,
            cache_enabled: false,
            cache_ttl: Duration::milliseconds(DEFAULT_CACHE_TTL_MS),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        let target = self.params.get_or_insert_with(Params::new);
        for (key, value) in params {
            target.insert(key.into(), value.into());
        }
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn cached(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Canonical identity of this request
    pub fn identity(&self) -> String {
        build_identity(&self.url, self.params.as_ref())
    }
}

/// Options handed to the transport with a request.
///
/// Header names are stored lowercased so that later headers override
/// earlier ones regardless of spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct RequestOptions {
    #[get = "pub"]
    headers: HashMap<String, String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `headers` into the option's header set, overriding existing
    /// names. `None` leaves the options untouched.
    pub fn with_headers(mut self, headers: Option<&HashMap<String, String>>) -> Self {
        if let Some(headers) = headers {
            for (name, value) in headers {
                self.headers.insert(name.to_ascii_lowercase(), value.clone());
            }
        }
        self
    }

    /// Options for a request: `base` headers overridden by the request's
    /// own. Returns `None` when neither is present.
    pub fn for_request(
        base: &HashMap<String, String>,
        headers: Option<&HashMap<String, String>>,
    ) -> Option<Self> {
        if base.is_empty() && headers.is_none() {
            return None;
        }
        Some(Self::new().with_headers(Some(base)).with_headers(headers))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}
