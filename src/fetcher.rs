//! An HTTP client that fetches toggle definitions from the server.
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ETAG, IF_NONE_MATCH, USER_AGENT},
    StatusCode, Url,
};

use crate::{Error, Result, ToggleSnapshot};

/// Result of a single fetch attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server reported that nothing changed since the previous fetch.
    Unchanged,
    /// The server sent a new set of toggles.
    Changed(ToggleSnapshot),
    /// The fetch failed. The caller decides whether and when to retry.
    Failed(Error),
}

/// Something that can retrieve toggle snapshots. [`ToggleFetcher`] is the HTTP implementation.
pub trait Fetch: Send {
    /// Perform one retrieval attempt. Must not panic on transport failures.
    fn fetch(&mut self) -> FetchOutcome;
}

/// Configuration for [`ToggleFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub endpoint: Url,
    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,
    /// Maximum time to wait for the whole response once connected.
    pub read_timeout: Duration,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl FetcherConfig {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(endpoint: Url) -> FetcherConfig {
        FetcherConfig {
            endpoint,
            connect_timeout: FetcherConfig::DEFAULT_CONNECT_TIMEOUT,
            read_timeout: FetcherConfig::DEFAULT_READ_TIMEOUT,
            headers: Vec::new(),
        }
    }
}

/// A client that fetches toggles from the server using conditional requests.
///
/// The fetcher remembers the entity tag of the last successful response and sends it back in
/// `If-None-Match`, so the server can answer `304 Not Modified` when nothing changed.
pub struct ToggleFetcher {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
    endpoint: Url,
    /// Opaque token from the last `Changed` response. Only updated on `Changed`.
    change_token: Option<String>,
}

impl ToggleFetcher {
    pub fn new(config: FetcherConfig) -> Result<ToggleFetcher> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("unleash-rust/", env!("CARGO_PKG_VERSION"))),
        );
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            let value =
                HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .default_headers(headers)
            .build()?;

        Ok(ToggleFetcher {
            client,
            endpoint: config.endpoint,
            change_token: None,
        })
    }

    /// The change token that will be sent with the next request, if any.
    pub fn change_token(&self) -> Option<&str> {
        self.change_token.as_deref()
    }

    /// Returns `Ok(None)` if the server reported no change.
    fn fetch_snapshot(&mut self) -> Result<Option<ToggleSnapshot>> {
        let mut request = self.client.get(self.endpoint.clone());
        if let Some(token) = &self.change_token {
            request = request.header(IF_NONE_MATCH, token.as_str());
        }

        log::debug!(target: "unleash", change_token:? = self.change_token; "fetching toggles");
        let response = request.send()?;

        match response.status() {
            StatusCode::NOT_MODIFIED => {
                log::debug!(target: "unleash", "toggles not modified");
                return Ok(None);
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                log::warn!(target: "unleash", "client is not authorized. Check your request headers");
                return Err(Error::Unauthorized);
            }
            status if !status.is_success() => {
                log::warn!(target: "unleash", "received non-success response while fetching toggles: {:?}", status);
                return Err(Error::UnexpectedStatus(status));
            }
            _ => {}
        }

        let token = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = response.bytes()?;
        let snapshot = ToggleSnapshot::from_json(&body)?;

        log::debug!(target: "unleash", toggles = snapshot.len(), change_token:? = token; "successfully fetched toggles");
        self.change_token = token;

        Ok(Some(snapshot))
    }
}

impl Fetch for ToggleFetcher {
    fn fetch(&mut self) -> FetchOutcome {
        match self.fetch_snapshot() {
            Ok(Some(snapshot)) => FetchOutcome::Changed(snapshot),
            Ok(None) => FetchOutcome::Unchanged,
            Err(err) => FetchOutcome::Failed(err),
        }
    }
}
