use crate::error::{Result, TransportError};
use crate::request::RequestOptions;
use ::utils::surf_logging::SurfLogging;
use async_trait::async_trait;
use serde_json::Value;
use std::str::FromStr;
use surf::http::headers::{HeaderName, LOCATION};
use surf::{Client, Config, Url};

/// A single GET round trip.
///
/// Every call to [`Transport::execute`] issues exactly one request, plus one
/// per redirect hop; nothing here retries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `identity` and decode the body as JSON.
    ///
    /// Non-success statuses fail with the status description, bodies that
    /// are not JSON fail with the decoding error.
    async fn execute(&self, identity: &str, options: Option<&RequestOptions>) -> Result<Value>;
}

/// Redirect hops followed before a 3xx response is reported as a failure
const MAX_REDIRECTS: usize = 3;

/// [`Transport`] backed by a surf client with request logging.
#[derive(Clone)]
pub struct SurfTransport {
    http: Client,
    base_url: Option<Url>,
}

impl Default for SurfTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfTransport {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Resolve relative identities such as `/posts?page=2` against `base_url`
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|err| TransportError::request(err.to_string()))?;
        let http: Client = Config::new()
            .set_base_url(base_url.clone())
            .try_into()
            .map_err(|err| TransportError::request(format!("{}", err)))?;
        Ok(Self {
            base_url: Some(base_url),
            ..Self::with_client(http)
        })
    }

    pub fn with_client(http: Client) -> Self {
        Self {
            http: http.with(SurfLogging),
            base_url: None,
        }
    }

    fn resolve(&self, identity: &str) -> Result<Url> {
        let url = match &self.base_url {
            Some(base_url) => base_url.join(identity),
            None => Url::parse(identity),
        };
        url.map_err(|err| TransportError::request(format!("invalid url {}: {}", identity, err)))
    }
}

#[async_trait]
impl Transport for SurfTransport {
    async fn execute(&self, identity: &str, options: Option<&RequestOptions>) -> Result<Value> {
        let mut headers = Vec::new();
        if let Some(options) = options {
            for (name, value) in options.headers() {
                let name = HeaderName::from_str(name).map_err(|err| {
                    TransportError::request(format!("invalid header {}: {}", name, err))
                })?;
                headers.push((name, value.as_str()));
            }
        }

        let mut url = self.resolve(identity)?;
        let mut redirects = 0;
        let mut response = loop {
            let mut request = self.http.get(url.as_str());
            for (name, value) in &headers {
                request = request.header(name.clone(), *value);
            }
            let response = request
                .await
                .map_err(|err| TransportError::network(err.to_string()))?;

            if !response.status().is_redirection() || redirects == MAX_REDIRECTS {
                break response;
            }
            let location = match response.header(LOCATION) {
                Some(location) => location.last().as_str().to_string(),
                None => break response,
            };
            url = url.join(&location).map_err(|err| {
                TransportError::request(format!("invalid redirect {}: {}", location, err))
            })?;
            redirects += 1;
            log::debug!("GET {} redirected to {}", identity, url);
        };

        let status = response.status();
        if !status.is_success() {
            log::debug!("GET {} answered {}", identity, status);
            return Err(TransportError::status(status.canonical_reason()));
        }

        response
            .body_json::<Value>()
            .await
            .map_err(|err| TransportError::decode(err.to_string()))
    }
}
