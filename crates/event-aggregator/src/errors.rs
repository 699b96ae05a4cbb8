//! # Error Types
//!
//! Dead subscribers and messages nobody handles are not errors; the only
//! failures a publisher sees come from subscriber code or a closed marshal.

use thiserror::Error;

/// Errors surfaced by `publish`.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A subscriber's handler returned an error. Remaining deliveries of the
    /// same pass were skipped.
    #[error("Handler {subscriber} failed on {message}: {source}")]
    Handler {
        /// Type name of the failing subscriber.
        subscriber: &'static str,
        /// Type name the handler was registered for.
        message: &'static str,
        /// The error returned by the handler, untouched.
        #[source]
        source: anyhow::Error,
    },

    /// The marshal could not hand the delivery to its execution context.
    #[error("Marshal closed: delivery could not be scheduled")]
    MarshalClosed,
}

impl PublishError {
    /// The error returned by subscriber code, if this is a handler failure.
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Handler { source, .. } => Some(source),
            Self::MarshalClosed => None,
        }
    }
}

/// Errors from reading aggregator configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}
