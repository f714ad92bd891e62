#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cancellable statistic fetching for the dashboard families.
//!
//! Each statistic family (crime, fundamental, primary) owns one
//! [`FetchController`]. A controller holds the family's current filter,
//! the last good data and a monotonically increasing request id. Only the
//! response whose request id is still live when it resolves is ever
//! applied, which gives "last request wins" regardless of the order in
//! which the network answers.
//!
//! The network itself sits behind the [`StatsSource`] trait; [`http`]
//! provides the `reqwest` implementation used by the live dashboard.

pub mod controller;
#[cfg(any(test, feature = "testing"))]
pub mod fake;
pub mod family;
pub mod http;
pub mod retry;
pub mod source;
pub mod wire;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

pub use controller::{Cancellable, FetchController, FetchState, FetchStatus, RequestId, Resolution};
pub use family::{CrimeData, CrimeFamily, Family, FundamentalFamily, PrimaryFamily};
pub use source::StatsSource;

/// Errors produced while fetching statistic rows.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The response body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response body was JSON but not in a usable shape.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what was wrong with the body.
        message: String,
    },

    /// The request was aborted before it completed. Never surfaced to the
    /// presentation layer.
    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Classifies this error into the taxonomy exposed through
    /// [`FetchState`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::Status { .. } => ErrorKind::Network,
            Self::Json(_) | Self::Parse { .. } => ErrorKind::Parse,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether this error only reports a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error taxonomy visible to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Non-success status or transport failure.
    Network,
    /// Response body not in the expected shape.
    Parse,
    /// Internal only; swallowed by the controller.
    Cancelled,
}

/// A failed fetch as exposed in [`FetchState`]: cloneable, display-ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFailure {
    /// Error class.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl From<&FetchError> for FetchFailure {
    fn from(error: &FetchError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy() {
        let status = FetchError::Status {
            status: 502,
            url: "http://localhost/crime_type_by_years".to_string(),
        };
        assert_eq!(status.kind(), ErrorKind::Network);

        let json = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        assert_eq!(FetchError::from(json).kind(), ErrorKind::Parse);

        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!status.is_cancelled());
    }

    #[test]
    fn failure_carries_message() {
        let failure = FetchFailure::from(&FetchError::Parse {
            message: "rows missing".to_string(),
        });
        assert_eq!(failure.kind, ErrorKind::Parse);
        assert_eq!(failure.message, "Parse error: rows missing");
    }
}
