//! Error type shared by the whole crate.
use std::sync::Arc;

use reqwest::StatusCode;

/// Represents a result type for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur while constructing a client or refreshing
/// toggles.
///
/// Note that toggle evaluation itself never fails: [`Client::is_enabled`](crate::Client::is_enabled)
/// falls back to the caller's default instead.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Invalid toggles endpoint.
    #[error("invalid toggles endpoint")]
    InvalidEndpoint(#[source] url::ParseError),

    /// A configured request header has an invalid name or value.
    #[error("invalid request header {0:?}")]
    InvalidHeader(String),

    /// The server rejected our credentials.
    #[error("unauthorized, check the request headers")]
    Unauthorized,

    /// The server responded with a status that is neither success nor "not modified".
    #[error("unexpected response status: {0}")]
    UnexpectedStatus(StatusCode),

    /// Network error (connection failure, timeout, etc.).
    #[error(transparent)]
    Network(Arc<reqwest::Error>),

    /// Toggles payload could not be encoded or decoded.
    #[error("malformed toggles payload")]
    Serialization(#[source] Arc<serde_json::Error>),

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// The poll interval must be greater than zero.
    #[error("invalid poll interval {0:?}, must be greater than zero")]
    InvalidPollInterval(std::time::Duration),

    /// A custom strategy tried to use a name reserved for the built-in fallback.
    #[error("strategy name {0:?} is reserved")]
    ReservedStrategyName(String),

    /// A toggle refresh panicked (e.g., inside a custom fetcher). The scheduler keeps running.
    #[error("scheduler panicked")]
    SchedulerPanicked,
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Serialization(Arc::new(value))
    }
}
