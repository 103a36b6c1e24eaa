//! Errors surfaced by the reactive engine.

use crate::subscription::SubscriptionId;
use alloc::string::String;
use core::fmt;
use liveq_core::Error;

/// Result type alias for engine operations.
pub type LiveQueryResult<T> = core::result::Result<T, LiveQueryError>;

/// Errors delivered to `on_error` callbacks or returned by the registry.
#[derive(Clone, Debug, PartialEq)]
pub enum LiveQueryError {
    /// The query itself failed.
    QueryExecution(Error),
    /// The recorded dependencies did not cover a declared table.
    DependencyTracking { table: String, message: String },
    /// The subscription is unknown or already finished.
    SubscriptionState { id: SubscriptionId },
}

impl fmt::Display for LiveQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveQueryError::QueryExecution(e) => write!(f, "Query execution failed: {}", e),
            LiveQueryError::DependencyTracking { table, message } => {
                write!(f, "Dependency tracking on {}: {}", table, message)
            }
            LiveQueryError::SubscriptionState { id } => {
                write!(f, "Subscription {} is not active", id)
            }
        }
    }
}

impl From<Error> for LiveQueryError {
    fn from(e: Error) -> Self {
        LiveQueryError::QueryExecution(e)
    }
}

impl LiveQueryError {
    /// Creates a dependency tracking error.
    pub fn dependency_tracking(table: impl Into<String>, message: impl Into<String>) -> Self {
        LiveQueryError::DependencyTracking {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates a subscription state error.
    pub fn subscription_state(id: SubscriptionId) -> Self {
        LiveQueryError::SubscriptionState { id }
    }

    /// Returns the underlying store error, if any.
    pub fn as_query_error(&self) -> Option<&Error> {
        match self {
            LiveQueryError::QueryExecution(e) => Some(e),
            _ => None,
        }
    }
}
