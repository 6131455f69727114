//! A client-side feature toggle library.
//!
//! # Overview
//!
//! The library revolves around a [`Client`] that answers one question: is toggle `name` on? It
//! keeps an in-memory [`ToggleSnapshot`] of all toggle definitions and refreshes it from a
//! remote endpoint in the background.
//!
//! [`ToggleSnapshot`] is an immutable mapping from toggle names to [`Toggle`]s. Whenever toggles
//! change, the snapshot is replaced completely.
//!
//! [`ToggleCache`] is a thread-safe holder for the current snapshot. Readers never block and
//! always observe either the old or the new snapshot in full.
//!
//! [`ToggleFetcher`] is an HTTP client that retrieves toggles using conditional requests
//! (`ETag`/`If-None-Match`), so unchanged toggles cost a `304 Not Modified`.
//!
//! [`BackupStore`] persists the last known snapshot to a local file, so a client can start with
//! sensible toggles even when the server is unreachable.
//!
//! [`Scheduler`] runs a background thread that periodically fetches toggles, saves them to the
//! backup, and publishes them in the cache.
//!
//! [`StrategyRegistry`] maps strategy names to [`Strategy`] implementations. A toggle is on if it
//! is enabled *and* its strategy says so. Unknown strategies are always off.
//!
//! [`Evaluator`] combines the cache and the registry; [`Client`] wires everything together.
//!
//! # Error Handling
//!
//! Toggle evaluation never fails: missing toggles, unknown strategies, and even panicking custom
//! strategies all degrade to the caller's default. Errors (the [`Error`] enum) are only reported
//! when constructing a client or when asking about the state of background refreshes.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate with the `unleash`
//! target. Consider integrating a `log`-compatible logger implementation for better visibility
//! into refreshes and failures.

#![warn(rustdoc::missing_crate_level_docs)]

pub mod fetcher;
pub mod scheduler;
pub mod strategy;

mod backup;
mod client;
mod config;
mod error;
mod evaluator;
mod toggle;
mod toggle_cache;

pub use backup::BackupStore;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use evaluator::Evaluator;
pub use fetcher::{Fetch, FetchOutcome, FetcherConfig, ToggleFetcher};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use strategy::{DefaultStrategy, FnStrategy, Strategy, StrategyRegistry, UnknownStrategy};
pub use toggle::{Parameters, Toggle, ToggleSnapshot};
pub use toggle_cache::ToggleCache;
