//! Error types for request building and dispatch.
//!
//! [`NodeError`] is what the resolver, the injector, and the credential port
//! report. [`DispatchError`] is the shape every HTTP adapter maps its failures
//! into, and [`DispatchError::retry_policy`] tells the host whether a failed
//! call is worth another attempt. Nothing in this crate retries on its own.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::FieldName;

/// Host guidance attached to a failed step.
///
/// Only upstream trouble qualifies for a retry: timeouts, HTTP 429, and 5xx
/// responses. A bad field value or a missing credential fails the same way
/// every time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// Try again, no sooner than `after` when the server named a delay.
    Retryable { after: Option<Duration> },
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Node-level errors
// ---------------------------------------------------------------------------

/// Errors produced while building a request for a declarative node.
///
/// None of these are retryable: each one requires the workflow author (or the
/// node author, for [`NodeError::ConfigurationError`]) to change something.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeError {
    /// The node's schema or catalog is inconsistent.
    ///
    /// Produced by: catalog lookup for an unknown resource/operation pair and
    /// by [`crate::ResourceCatalog::validate`]. Unreachable for a valid catalog.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// A required field has no value at request-build time.
    ///
    /// Surfaced to the workflow author as a validation failure before any
    /// request is dispatched.
    #[error("Missing value for required field '{field}'")]
    MissingValue {
        /// The field that has no value.
        field: FieldName,
    },

    /// A field holds a value its transform cannot interpret
    /// (e.g. a date field containing `"next tuesday"`).
    #[error("Invalid value for field '{field}': {message}")]
    InvalidValue {
        /// The offending field.
        field: FieldName,
        /// What was wrong with it.
        message: String,
    },

    /// The host could not supply the credential this node requires.
    #[error("Credential unavailable: {message}")]
    CredentialUnavailable {
        /// Description of the failure. Never contains the secret itself.
        message: String,
    },
}

impl NodeError {
    /// Builds the error returned when the catalog has no template for a pair.
    pub fn unknown_operation(resource: &str, operation: &str) -> Self {
        Self::ConfigurationError {
            message: format!("no request template for resource '{resource}', operation '{operation}'"),
        }
    }

    /// Every node error is final; the host should not retry the step.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::NonRetryable
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

/// Errors reported by a [`crate::RequestDispatcher`] implementation.
///
/// The core never produces these itself; it only defines the shape so that
/// every adapter classifies failures the same way.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    /// The descriptor could not be turned into a request (bad URL, bad header).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The request never produced a response (connect failure, timeout).
    #[error("Transport failure: {message}")]
    Transport { message: String, timed_out: bool },

    /// The remote API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
        /// Parsed `Retry-After` delay, when the response carried one.
        retry_after: Option<Duration>,
    },

    /// The response body was not valid JSON.
    #[error("Invalid response body: {message}")]
    InvalidBody { message: String },
}

impl DispatchError {
    /// Classifies the failure for the host's retry logic.
    ///
    /// Rate limiting (429) and server errors (5xx) are retryable, as are
    /// transport timeouts. Everything else, including 401/403 credential
    /// rejections, is final.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { timed_out: true, .. } => RetryPolicy::Retryable { after: None },
            Self::Status {
                status,
                retry_after,
                ..
            } if *status == 429 || (500..600).contains(status) => RetryPolicy::Retryable {
                after: *retry_after,
            },
            _ => RetryPolicy::NonRetryable,
        }
    }
}
