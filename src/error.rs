//! Error types and result handling for pgsql-interface.
//!
//! This module defines the main error type [`Error`], a convenience
//! [`Result`] type alias used throughout the crate, and the [`Status`]
//! mapping a host uses to turn relation conditions into an operator-facing
//! status line.
//!
//! # Example
//!
//! ```rust
//! use pgsql_interface::{BlockedReason, Error, StatusKind};
//!
//! let err = Error::Blocked {
//!     reason: BlockedReason::MissingRelation,
//!     relation: "db".to_string(),
//! };
//!
//! let status = err.status().unwrap();
//! assert_eq!(status.kind, StatusKind::Blocked);
//! assert_eq!(status.message, "missing relation: db");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The main error type for pgsql-interface operations.
///
/// `MissingField` and `InvalidField` come from a malformed connection
/// string. `Waiting` and `Blocked` come from the relation itself not being
/// ready, and map onto a unit status through [`Error::status`].
#[derive(Error, Debug)]
pub enum Error {
    /// A connection property was requested but is not in the connection string.
    #[error("missing connection field: {field}")]
    MissingField {
        /// The property key that was looked up (e.g. `dbname`)
        field: String,
    },

    /// A connection property is present but cannot be interpreted.
    #[error("invalid connection field {field}: {value:?}")]
    InvalidField {
        /// The property key
        field: String,
        /// The raw value found in the connection string
        value: String,
    },

    /// The relation exists but the remote side has not published data yet.
    #[error("{message}: {relation}")]
    Waiting {
        /// Human readable description of what is pending
        message: String,
        /// Name of the relation endpoint
        relation: String,
    },

    /// The relation is structurally misconfigured and needs an operator.
    #[error("{reason}: {relation}")]
    Blocked {
        /// Which misconfiguration was detected
        reason: BlockedReason,
        /// Name of the relation endpoint
        relation: String,
    },

    /// The host relation registry failed to answer a query.
    #[error("Host error: {0}")]
    Host(String),

    /// Configuration error, typically from an invalid file or environment variable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error for state files and notifications.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, typically from state file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a relation is blocked.
///
/// The two cases need different operator action: add a relation, or
/// remove the extra ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedReason {
    /// No relation is established on the endpoint.
    MissingRelation,
    /// More than one application is related; only a single peer is supported.
    TooManyRelations,
}

impl BlockedReason {
    pub fn message(&self) -> &'static str {
        match self {
            BlockedReason::MissingRelation => "missing relation",
            BlockedReason::TooManyRelations => "too many related applications",
        }
    }
}

impl fmt::Display for BlockedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Kind of unit status a relation condition maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Waiting,
    Blocked,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::Waiting => f.write_str("waiting"),
            StatusKind::Blocked => f.write_str("blocked"),
        }
    }
}

/// Operator-facing status derived from a relation condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub kind: StatusKind,
    /// `"<message>: <relation>"`, e.g. `"missing relation: db"`
    pub message: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error {
    /// Maps a relation condition onto the status the unit should report.
    ///
    /// Returns `None` for errors that are not relation conditions.
    pub fn status(&self) -> Option<Status> {
        let kind = match self {
            Error::Waiting { .. } => StatusKind::Waiting,
            Error::Blocked { .. } => StatusKind::Blocked,
            _ => return None,
        };
        Some(Status {
            kind,
            message: self.to_string(),
        })
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, Error::Waiting { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Error::Blocked { .. })
    }
}

/// A convenient Result type alias for pgsql-interface operations.
///
/// This is equivalent to `std::result::Result<T, pgsql_interface::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
