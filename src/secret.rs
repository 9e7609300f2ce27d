//! [`SecretString`] -- a wrapper for the bot token.
//!
//! Keeps the token out of logs and Debug output. The actual value is only
//! reachable through [`expose()`](SecretString::expose), which is called
//! at the two places that genuinely need it: the Gateway Identify/Resume
//! payloads and the REST Authorization header.

use std::fmt;

use serde::{Deserialize, Deserializer};

/// A string that must not leak through `Debug`, `Display`, or logging.
///
/// Deserializes from a plain JSON string so existing `config.json` files
/// keep working unchanged.
#[derive(Clone, Default)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The actual secret. Use only where the wire protocol requires it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the wrapped value is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "\"\"")
        } else {
            write!(f, "\"[REDACTED]\"")
        }
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, "[REDACTED]")
        }
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        SecretString(s.to_string())
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString(s)
    }
}
