//! Configuration loading.
//!
//! Reads a JSON config file (`config.json` by default). The key names of
//! the original deployment are accepted via serde aliases, including the
//! `AdminID` role gate, which may be a JSON number or string.

use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ConfigError;
use crate::secret::SecretString;

/// Bot configuration, deserialized from JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bot token. May be left empty when `token_env` is set.
    pub token: SecretString,

    /// Environment variable to read the token from when `token` is empty.
    #[serde(alias = "tokenEnv")]
    pub token_env: Option<String>,

    /// Role ID required to use `/embed`. Unset means everyone may.
    #[serde(
        alias = "AdminID",
        alias = "adminRoleId",
        deserialize_with = "id_string_or_number"
    )]
    pub admin_role_id: Option<String>,

    /// Application ID, needed for explicit command registration. The
    /// gateway run path learns it from READY instead.
    #[serde(alias = "applicationId")]
    pub application_id: Option<String>,

    /// Guild to scope command registration to (instant availability
    /// while developing). Unset registers globally.
    #[serde(alias = "guildId", deserialize_with = "id_string_or_number")]
    pub guild_id: Option<String>,

    /// Gateway WebSocket URL.
    #[serde(alias = "gatewayUrl")]
    pub gateway_url: String,

    /// Gateway intents bitmask. Interactions are delivered regardless of
    /// intents, so the default is 0.
    pub intents: u32,
}

fn default_gateway_url() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: SecretString::default(),
            token_env: None,
            admin_role_id: None,
            application_id: None,
            guild_id: None,
            gateway_url: default_gateway_url(),
            intents: 0,
        }
    }
}

/// Accept a snowflake as either a JSON string or number; empty strings
/// and `null` mean unset.
fn id_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}

impl Config {
    /// Load from a JSON file and resolve the token env fallback.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&raw)?;
        config.resolve_token_with(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse from a JSON string (no env resolution). Used by tests.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Fill an empty `token` from the environment variable named by
    /// `token_env`, using the supplied lookup.
    pub fn resolve_token_with(&mut self, env: impl Fn(&str) -> Option<String>) {
        if self.token.is_empty()
            && let Some(ref name) = self.token_env
            && let Some(value) = env(name)
        {
            self.token = SecretString::new(value);
        }
    }

    /// The token, or [`ConfigError::MissingToken`] when none is set.
    pub fn require_token(&self) -> Result<&SecretString, ConfigError> {
        if self.token.is_empty() {
            Err(ConfigError::MissingToken)
        } else {
            Ok(&self.token)
        }
    }
}
