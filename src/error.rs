//! Error types for reddit-top
//!
//! This module provides the error handling for the library:
//! - [`Error`], the crate-wide error returned by listing, persistence and configuration code
//! - [`DatabaseError`] for the SQLite persistence layer
//! - [`ImageError`] and [`FetchError`], the cloneable errors fanned out to every
//!   subscriber of an in-flight thumbnail request

use thiserror::Error;

/// Result type alias for reddit-top operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for reddit-top
///
/// Each variant includes enough context to diagnose the failure without
/// having to reproduce it.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "reddit.page_limit")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Network error reported by the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status code
    #[error("HTTP {status} from {url}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
        /// Wait the server asked for before trying again (`Retry-After`)
        retry_after: Option<std::time::Duration>,
    },

    /// Serialization error (malformed listing JSON, bad config JSON)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Thumbnail loading failed
    #[error("image error: {0}")]
    Image(#[from] ImageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a config key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Errors reported by a [`Fetcher`](crate::images::Fetcher)
///
/// Cloneable so a single failure can be delivered to every subscriber waiting
/// on the same resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying client error, rendered
        reason: String,
    },

    /// The server answered with a non-success status code
    #[error("HTTP {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The request did not finish within the configured timeout
    #[error("request to {url} timed out")]
    Timeout {
        /// Requested URL
        url: String,
    },

    /// The fetch ended without ever delivering a result
    #[error("fetch of {url} was abandoned")]
    Abandoned {
        /// Requested URL
        url: String,
    },
}

/// Errors delivered to image subscribers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// Fetched bytes could not be decoded as an image
    #[error("failed to decode image from {key}: {reason}")]
    Decode {
        /// Resource key of the image
        key: String,
        /// Decoder message
        reason: String,
    },

    /// The fetch primitive reported an error, passed through unchanged
    #[error(transparent)]
    Transport(#[from] FetchError),

    /// The resource key was empty
    #[error("image key must not be empty")]
    InvalidKey,
}
