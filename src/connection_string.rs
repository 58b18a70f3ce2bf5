//! libpq `key=value` connection strings.
//!
//! The PostgreSQL charm publishes its master as a libpq keyword/value
//! string such as `dbname=app host=10.0.0.5 password=secret port=5432 user=app`.
//! Parsing is lenient: anything that is not a `key=value` token is skipped,
//! and the first occurrence of a repeated key wins.
//!
//! # Example
//!
//! ```rust
//! use pgsql_interface::ConnectionString;
//!
//! let conn = ConnectionString::new("host=10.11.12.13 user=myuser");
//! assert_eq!(conn.host().unwrap(), "10.11.12.13");
//! assert_eq!(conn.user().unwrap(), "myuser");
//! assert!(conn.password().is_err());
//! ```

use crate::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

// A value is the longest run of non-whitespace, so it always ends at
// whitespace or end of input.
static KEY_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s*=\s*(\S*)").expect("valid key=value regex")
});

const REDACTED: &str = "********";

/// A parsed libpq connection string.
///
/// Immutable once built; two instances are equal when their raw text is.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    raw: String,
    properties: BTreeMap<String, String>,
}

impl ConnectionString {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut properties = BTreeMap::new();

        for caps in KEY_VALUE_RE.captures_iter(&raw) {
            let key = &caps[1];
            if properties.contains_key(key) {
                debug!(key, "Ignoring duplicate connection property");
                continue;
            }
            properties.insert(key.to_string(), caps[2].to_string());
        }

        Self { raw, properties }
    }

    /// The raw text this was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| Error::MissingField {
            field: key.to_string(),
        })
    }

    pub fn host(&self) -> Result<&str> {
        self.require("host")
    }

    /// The database name, stored under the libpq `dbname` key.
    pub fn database(&self) -> Result<&str> {
        self.require("dbname")
    }

    pub fn port(&self) -> Result<&str> {
        self.require("port")
    }

    /// The port parsed as a TCP port number.
    pub fn port_number(&self) -> Result<u16> {
        let port = self.port()?;
        port.parse().map_err(|_| Error::InvalidField {
            field: "port".to_string(),
            value: port.to_string(),
        })
    }

    pub fn user(&self) -> Result<&str> {
        self.require("user")
    }

    pub fn password(&self) -> Result<&str> {
        self.require("password")
    }

    /// Properties with the password masked, safe to log or print.
    pub fn redacted_properties(&self) -> BTreeMap<String, String> {
        let mut props = self.properties.clone();
        if let Some(password) = props.get_mut("password") {
            *password = REDACTED.to_string();
        }
        props
    }
}

impl FromStr for ConnectionString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// The raw text carries the password, so Debug only shows redacted properties.
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("properties", &self.redacted_properties())
            .finish()
    }
}
