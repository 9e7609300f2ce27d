//! Error types for embedsmith.
//!
//! Three layers:
//!
//! - [`ConfigError`] -- loading and validating `config.json`
//! - [`PlatformError`] -- Discord REST / Gateway transport failures
//! - [`CommandError`] -- per-invocation failures that end as an ephemeral
//!   reply to the invoking user (never the whole channel, never a crash)

use thiserror::Error;

/// Failures while loading configuration at process start.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file does not exist at the given path.
    #[error("config file not found: {0}")]
    NotFound(String),

    /// Reading the config file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON or has the wrong shape.
    #[error("invalid config: {0}")]
    Invalid(#[from] serde_json::Error),

    /// No token in the config and the `token_env` variable is unset.
    #[error("no bot token configured (set `token` or `token_env`)")]
    MissingToken,
}

/// Transport-level failures talking to Discord.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PlatformError {
    /// Could not establish the Gateway WebSocket connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Discord rejected the token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A REST request could not be sent or its response not read.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The REST API answered with a non-success status.
    #[error("discord api returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by Discord.
        body: String,
    },
}

/// Per-invocation failures.
///
/// Every variant maps to a human-readable ephemeral message via
/// [`user_message`](CommandError::user_message); the `Display` impl stays
/// terse for logs.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CommandError {
    /// The color option is neither a known name nor a 3/6-digit hex code.
    #[error("invalid color format: {0:?}")]
    InvalidColorFormat(String),

    /// The thumbnail option does not start with `http://` or `https://`.
    #[error("invalid thumbnail url: {0:?}")]
    InvalidThumbnailUrl(String),

    /// The invoking user does not hold the configured admin role.
    #[error("unauthorized")]
    Unauthorized,

    /// A required command option was absent or not a string.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// A button referenced a pending card that no longer exists.
    #[error("confirmation session expired or unknown")]
    SessionExpired,

    /// The interaction payload lacked a field the flow depends on.
    #[error("malformed interaction: {0}")]
    MalformedInteraction(&'static str),

    /// A REST call made on behalf of the invocation failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl CommandError {
    /// The message shown (ephemerally) to the invoking user.
    pub fn user_message(&self) -> String {
        match self {
            CommandError::InvalidColorFormat(_) => {
                "Invalid color format. Please use a hex code (e.g., #FF0000) \
                 or a valid color name."
                    .into()
            }
            CommandError::InvalidThumbnailUrl(_) => {
                "Invalid thumbnail URL. Please provide a valid http or https URL.".into()
            }
            CommandError::Unauthorized => {
                "You are not authorized to use this command.".into()
            }
            CommandError::MissingArgument(name) => {
                format!("Missing required argument: `{name}`.")
            }
            CommandError::SessionExpired => {
                "These controls have expired. Run /embed again to compose a new embed.".into()
            }
            CommandError::MalformedInteraction(_) | CommandError::Platform(_) => {
                "Something went wrong while processing the command.".into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::NotFound("config.json".into());
        assert_eq!(err.to_string(), "config file not found: config.json");
        assert_eq!(
            ConfigError::MissingToken.to_string(),
            "no bot token configured (set `token` or `token_env`)"
        );
    }

    #[test]
    fn config_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ConfigError = io.into();
        assert!(matches!(err, ConfigError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn platform_error_display() {
        let err = PlatformError::Api {
            status: 403,
            body: "Missing Access".into(),
        };
        assert_eq!(err.to_string(), "discord api returned 403: Missing Access");
    }

    #[test]
    fn command_error_user_messages() {
        assert!(
            CommandError::InvalidColorFormat("zzz".into())
                .user_message()
                .contains("hex code")
        );
        assert!(
            CommandError::InvalidThumbnailUrl("ftp://x".into())
                .user_message()
                .contains("http or https")
        );
        assert_eq!(
            CommandError::Unauthorized.user_message(),
            "You are not authorized to use this command."
        );
        assert!(
            CommandError::MissingArgument("title")
                .user_message()
                .contains("`title`")
        );
        assert!(
            CommandError::SessionExpired
                .user_message()
                .contains("expired")
        );
    }

    #[test]
    fn platform_error_maps_to_generic_user_message() {
        let err: CommandError = PlatformError::RequestFailed("timeout".into()).into();
        assert_eq!(
            err.user_message(),
            "Something went wrong while processing the command."
        );
        // The log-facing Display keeps the detail.
        assert!(err.to_string().contains("timeout"));
    }
}
