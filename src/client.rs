//! The feature toggle client tying the fetcher, backup, cache and evaluator together.
use std::{collections::HashSet, sync::Arc};

use crate::{
    fetcher::{FetcherConfig, ToggleFetcher},
    scheduler::{Scheduler, SchedulerConfig},
    BackupStore, ClientConfig, Error, Evaluator, Result, StrategyRegistry, Toggle, ToggleCache,
    ToggleSnapshot,
};

/// A feature toggle client.
///
/// In order to create a client instance, first create [`ClientConfig`].
///
/// On construction, the client loads the last known toggles from the backup file and starts a
/// background thread that keeps them up to date. [`Client::is_enabled`] only reads in-memory
/// state, so it is cheap to call from any number of threads.
///
/// # Examples
/// ```no_run
/// # use unleash::ClientConfig;
/// let client = ClientConfig::new("http://localhost:4242/api/client/features")
///     .to_client()
///     .unwrap();
///
/// if client.is_enabled("new-checkout") {
///     // ...
/// }
/// ```
pub struct Client {
    cache: Arc<ToggleCache>,
    evaluator: Evaluator,
    scheduler: Scheduler,
}

impl Client {
    /// Create a new `Client` using the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns an error in the following cases:
    /// - [`Error::InvalidEndpoint`] if the endpoint is not a valid URL.
    /// - [`Error::InvalidPollInterval`] if the poll interval is zero.
    /// - [`Error::InvalidHeader`] if a configured header is invalid.
    /// - [`Error::ReservedStrategyName`] if a custom strategy is named `"unknown"`.
    /// - [`Error::Network`] if the HTTP client cannot be initialized.
    /// - [`Error::Io`] if the scheduler thread cannot be started.
    pub fn new(config: ClientConfig) -> Result<Client> {
        let endpoint = url::Url::parse(&config.endpoint).map_err(Error::InvalidEndpoint)?;
        if config.poll_interval.is_zero() {
            return Err(Error::InvalidPollInterval(config.poll_interval));
        }
        let strategies = Arc::new(StrategyRegistry::new(config.strategies)?);

        let fetcher = ToggleFetcher::new(FetcherConfig {
            endpoint,
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            headers: config.headers,
        })?;

        let backup = BackupStore::new(config.backup_path);
        let cache = Arc::new(ToggleCache::new(backup.load()));

        let scheduler = Scheduler::start(
            fetcher,
            cache.clone(),
            backup,
            SchedulerConfig::new()
                .with_interval(config.poll_interval)
                .with_jitter(config.poll_jitter),
        )?;

        Ok(Client {
            evaluator: Evaluator::new(cache.clone(), strategies),
            cache,
            scheduler,
        })
    }

    /// Returns `true` if toggle `name` is on. Unknown toggles are off.
    ///
    /// Never fails and never blocks on I/O.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.evaluator.is_enabled(name)
    }

    /// Returns `true` if toggle `name` is on. Unknown toggles evaluate to `default_value`, as does
    /// any unexpected failure during evaluation.
    pub fn is_enabled_or(&self, name: &str, default_value: bool) -> bool {
        self.evaluator.is_enabled_or(name, default_value)
    }

    /// Get the definition of toggle `name` from the current snapshot.
    pub fn get_toggle(&self, name: &str) -> Option<Arc<Toggle>> {
        self.cache.get(name)
    }

    /// Names of all toggles in the current snapshot.
    pub fn toggle_names(&self) -> HashSet<String> {
        self.cache.snapshot().toggle_names()
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<ToggleSnapshot> {
        self.cache.snapshot()
    }

    /// An evaluator sharing this client's toggles and strategies. It stays usable after the
    /// client is shut down, serving the last published toggles.
    pub fn evaluator(&self) -> Evaluator {
        self.evaluator.clone()
    }

    /// Block until the first refresh has finished. Until then, the client serves toggles loaded
    /// from the backup file.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::wait_for_first_fetch`].
    pub fn wait_for_first_fetch(&self) -> Result<()> {
        self.scheduler.wait_for_first_fetch()
    }

    /// Stop refreshing toggles and wait for the background thread to exit.
    pub fn shutdown(self) -> Result<()> {
        self.scheduler.shutdown()
    }
}
