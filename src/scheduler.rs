//! A background thread that periodically fetches toggles, persists them to the backup file, and
//! publishes them in the toggle cache.
use std::{
    sync::{mpsc::RecvTimeoutError, Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};

use rand::{thread_rng, Rng};

use crate::{
    fetcher::{Fetch, FetchOutcome},
    BackupStore, Error, Result, ToggleCache,
};

/// Configuration for [`Scheduler`].
// Not implementing `Copy` as we may add non-copyable fields in the future.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval to wait between fetches.
    ///
    /// Defaults to [`SchedulerConfig::DEFAULT_POLL_INTERVAL`].
    pub interval: Duration,
    /// Jitter shortens each wait by a random duration up to this value. This helps to avoid
    /// multiple clients synchronizing and producing spiky load on the server.
    ///
    /// Defaults to zero (a fixed interval).
    pub jitter: Duration,
}

impl SchedulerConfig {
    /// Default value for [`SchedulerConfig::interval`].
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

    /// Lower bound on the wait between two fetches, whatever `interval` and `jitter` are.
    pub const MIN_WAIT: Duration = Duration::from_millis(1);

    pub fn new() -> SchedulerConfig {
        SchedulerConfig::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> SchedulerConfig {
        self.interval = interval;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> SchedulerConfig {
        self.jitter = jitter;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> SchedulerConfig {
        SchedulerConfig {
            interval: SchedulerConfig::DEFAULT_POLL_INTERVAL,
            jitter: Duration::ZERO,
        }
    }
}

/// The work done on every tick.
pub(crate) struct Refresh<F> {
    fetcher: F,
    cache: Arc<ToggleCache>,
    backup: BackupStore,
}

impl<F: Fetch> Refresh<F> {
    pub(crate) fn new(fetcher: F, cache: Arc<ToggleCache>, backup: BackupStore) -> Refresh<F> {
        Refresh {
            fetcher,
            cache,
            backup,
        }
    }

    /// Run one refresh. The backup is written before the new snapshot is published.
    pub(crate) fn tick(&mut self) -> Result<()> {
        match self.fetcher.fetch() {
            FetchOutcome::Changed(snapshot) => {
                self.backup.save(&snapshot);
                log::info!(target: "unleash", toggles = snapshot.len(), created_at:% = snapshot.created_at(); "publishing new toggles");
                self.cache.replace(Arc::new(snapshot));
                Ok(())
            }
            FetchOutcome::Unchanged => Ok(()),
            FetchOutcome::Failed(err) => {
                log::warn!(target: "unleash", "error while fetching toggles, keeping previous ones: {}", err);
                Err(err)
            }
        }
    }
}

/// A toggle refresh thread.
///
/// The thread runs the first refresh right away, then one refresh per interval. Refreshes never
/// overlap, and a failed refresh does not affect subsequent ones.
pub struct Scheduler {
    join_handle: std::thread::JoinHandle<()>,

    /// Used to send a stop command to the scheduler thread.
    stop_sender: std::sync::mpsc::SyncSender<()>,

    /// Holds `None` until the first refresh has finished, then the result of the most recent
    /// refresh.
    result: Arc<(Mutex<Option<Result<()>>>, Condvar)>,
}

impl Scheduler {
    /// Starts the scheduler thread.
    ///
    /// # Errors
    ///
    /// This method can return the following errors:
    /// - IO Error if the thread failed to start.
    pub fn start<F: Fetch + 'static>(
        fetcher: F,
        cache: Arc<ToggleCache>,
        backup: BackupStore,
        config: SchedulerConfig,
    ) -> std::io::Result<Scheduler> {
        // Using `sync_channel` here as it makes `stop_sender` `Sync` (shareable between
        // threads). Buffer size of 1 is enough as we can simply `try_send()` and ignore if the
        // buffer is full (another thread has sent a stop command already).
        let (stop_sender, stop_receiver) = std::sync::mpsc::sync_channel::<()>(1);

        let result = Arc::new((Mutex::new(None), Condvar::new()));

        let join_handle = {
            let result = Arc::clone(&result);
            let update_result = move |value| {
                *result.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
                result.1.notify_all();
            };

            let mut refresh = Refresh::new(fetcher, cache, backup);

            std::thread::Builder::new()
                .name("unleash-scheduler".to_owned())
                .spawn(move || loop {
                    log::debug!(target: "unleash", "refreshing toggles");
                    let outcome =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| refresh.tick()));
                    match outcome {
                        Ok(result) => update_result(result),
                        Err(_) => {
                            log::warn!(target: "unleash", "toggle refresh panicked, keeping previous toggles");
                            update_result(Err(Error::SchedulerPanicked));
                        }
                    }

                    let timeout = jitter(config.interval, config.jitter)
                        .max(SchedulerConfig::MIN_WAIT);
                    match stop_receiver.recv_timeout(timeout) {
                        Err(RecvTimeoutError::Timeout) => {
                            // Timed out. Loop back to refresh.
                        }
                        Ok(()) => {
                            log::debug!(target: "unleash", "scheduler thread received stop command");
                            return;
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            // The owner is gone, nobody can read the toggles anymore.
                            log::debug!(target: "unleash", "scheduler thread received disconnected");
                            return;
                        }
                    }
                })?
        };

        Ok(Scheduler {
            join_handle,
            stop_sender,
            result,
        })
    }

    /// Blocks until the first refresh has finished.
    ///
    /// Returns the result of the most recent refresh: `Ok(())` if toggles were fetched (or
    /// reported unchanged), or the error of a failed fetch. A refresh that panicked is reported
    /// as [`Error::SchedulerPanicked`]; later refreshes still run.
    ///
    /// # Errors
    ///
    /// - Any fetch error ([`Error::Network`], [`Error::Unauthorized`], ...).
    /// - [`Error::SchedulerPanicked`] if the most recent refresh panicked.
    pub fn wait_for_first_fetch(&self) -> Result<()> {
        let lock = self
            .result
            .0
            .lock()
            .map_err(|_| Error::SchedulerPanicked)?;
        let lock = self
            .result
            .1
            .wait_while(lock, |result| result.is_none())
            .map_err(|_| Error::SchedulerPanicked)?;

        lock.clone().unwrap_or(Err(Error::SchedulerPanicked))
    }

    /// Stop the scheduler thread.
    ///
    /// This function does not wait for the thread to actually stop. A refresh that is already
    /// running is allowed to finish.
    pub fn stop(&self) {
        // Error means that the receiver was dropped (thread exited) or the buffer is full
        // (another stop command is pending). Either way the thread stops.
        let _ = self.stop_sender.try_send(());
    }

    /// Stop the scheduler thread and block waiting for it to exit.
    ///
    /// # Errors
    ///
    /// - [`Error::SchedulerPanicked`] if the thread has panicked.
    pub fn shutdown(self) -> Result<()> {
        self.stop();

        self.join_handle
            .join()
            .map_err(|_| Error::SchedulerPanicked)?;

        Ok(())
    }
}

/// Apply randomized `jitter` to `interval`.
fn jitter(interval: Duration, jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return interval;
    }
    Duration::saturating_sub(interval, thread_rng().gen_range(Duration::ZERO..=jitter))
}
