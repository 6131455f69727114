//! Builder for [`Client`] configuration.
use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::{
    fetcher::FetcherConfig, scheduler::SchedulerConfig, BackupStore, Client, Result, Strategy,
};

/// Configuration for [`Client`].
///
/// # Examples
/// ```no_run
/// # use unleash::{ClientConfig, FnStrategy, Parameters};
/// let client = ClientConfig::new("https://unleash.example.com/api/client/features")
///     .poll_interval_secs(15)
///     .header("Authorization", "client-token")
///     .strategy(FnStrategy::new("alwaysOff", |_: &Parameters| false))
///     .to_client()
///     .unwrap();
/// ```
pub struct ClientConfig {
    pub(crate) endpoint: String,
    pub(crate) poll_interval: Duration,
    pub(crate) poll_jitter: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) backup_path: PathBuf,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) strategies: Vec<Arc<dyn Strategy>>,
}

impl ClientConfig {
    /// Create a default configuration fetching toggles from `endpoint`.
    ///
    /// ```
    /// # use unleash::ClientConfig;
    /// ClientConfig::new("http://localhost:4242/api/client/features");
    /// ```
    pub fn new(endpoint: impl Into<String>) -> Self {
        ClientConfig {
            endpoint: endpoint.into(),
            poll_interval: SchedulerConfig::DEFAULT_POLL_INTERVAL,
            poll_jitter: Duration::ZERO,
            connect_timeout: FetcherConfig::DEFAULT_CONNECT_TIMEOUT,
            read_timeout: FetcherConfig::DEFAULT_READ_TIMEOUT,
            backup_path: BackupStore::default_path(),
            headers: Vec::new(),
            strategies: Vec::new(),
        }
    }

    /// Interval between toggle refreshes. Must be greater than zero.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Interval between toggle refreshes, in seconds.
    pub fn poll_interval_secs(self, seconds: u64) -> Self {
        self.poll_interval(Duration::from_secs(seconds))
    }

    /// Shorten each wait between refreshes by a random duration up to `jitter`.
    pub fn poll_jitter(mut self, jitter: Duration) -> Self {
        self.poll_jitter = jitter;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Override the backup file location. Defaults to [`BackupStore::default_path`].
    pub fn backup_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_path = path.into();
        self
    }

    /// Send an extra header with every request (e.g., an API token).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Register a custom strategy. A strategy registered later replaces an earlier one (or a
    /// built-in) with the same name.
    pub fn strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    /// Create a new [`Client`] using this configuration and start refreshing toggles.
    pub fn to_client(self) -> Result<Client> {
        Client::new(self)
    }
}
