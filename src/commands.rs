//! The `/embed` command definition and its typed option boundary.
//!
//! [`EmbedRequest`] is the validated-at-the-boundary form of the raw
//! interaction options; the card builder never sees untyped JSON.

use serde_json::{Value, json};

use crate::error::CommandError;
use crate::gateway::events::CommandOption;

/// Name of the single registered slash command.
pub const COMMAND_NAME: &str = "embed";

/// Discord application command option type for strings.
const OPTION_STRING: u8 = 3;

/// The `/embed` command definition, as sent to the registration endpoint.
pub fn embed_command() -> Value {
    json!({
        "name": COMMAND_NAME,
        "description": "Create a custom embed",
        "options": [
            {
                "type": OPTION_STRING,
                "name": "title",
                "description": "The title of the embed (can include a link using [Text](URL) format)",
                "required": true,
            },
            {
                "type": OPTION_STRING,
                "name": "description",
                "description": "The main content of the embed (use \\n for new lines)",
                "required": true,
            },
            {
                "type": OPTION_STRING,
                "name": "color",
                "description": "The color of the embed (hex code or color name)",
                "required": true,
            },
            {
                "type": OPTION_STRING,
                "name": "thumbnail",
                "description": "URL of the thumbnail image",
                "required": true,
            },
            {
                "type": OPTION_STRING,
                "name": "footer",
                "description": "Footer text (optional)",
                "required": false,
            },
            {
                "type": OPTION_STRING,
                "name": "image",
                "description": "URL of the main image (optional)",
                "required": false,
            },
        ],
    })
}

/// Raw `/embed` inputs, lifted out of the interaction options.
///
/// All fields are strings from the platform's perspective; validation and
/// normalization happen in [`CardSpec::from_request`](crate::card::CardSpec::from_request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedRequest {
    pub title: String,
    pub description: String,
    pub color: String,
    pub thumbnail: String,
    pub footer: Option<String>,
    pub image: Option<String>,
}

impl EmbedRequest {
    /// Parse the command options, failing on any absent required option.
    ///
    /// Discord enforces `required` itself, so a miss here means a
    /// malformed or hand-crafted payload; it still gets a clean error.
    pub fn from_options(options: &[CommandOption]) -> Result<Self, CommandError> {
        let get = |name: &str| {
            options
                .iter()
                .find(|opt| opt.name == name)
                .and_then(|opt| opt.value.as_ref())
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let require = |name: &'static str| get(name).ok_or(CommandError::MissingArgument(name));

        Ok(Self {
            title: require("title")?,
            description: require("description")?,
            color: require("color")?,
            thumbnail: require("thumbnail")?,
            footer: get("footer"),
            image: get("image"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(name: &str, value: &str) -> CommandOption {
        CommandOption {
            name: name.into(),
            value: Some(json!(value)),
        }
    }

    #[test]
    fn parses_required_options() {
        let options = vec![
            opt("title", "Hello"),
            opt("description", "World"),
            opt("color", "red"),
            opt("thumbnail", "https://example.com/t.png"),
        ];
        let req = EmbedRequest::from_options(&options).unwrap();
        assert_eq!(req.title, "Hello");
        assert_eq!(req.description, "World");
        assert_eq!(req.color, "red");
        assert_eq!(req.thumbnail, "https://example.com/t.png");
        assert!(req.footer.is_none());
        assert!(req.image.is_none());
    }

    #[test]
    fn parses_optional_options() {
        let options = vec![
            opt("title", "T"),
            opt("description", "D"),
            opt("color", "#fff"),
            opt("thumbnail", "http://e.com/t.png"),
            opt("footer", "foot"),
            opt("image", "https://e.com/i.png"),
        ];
        let req = EmbedRequest::from_options(&options).unwrap();
        assert_eq!(req.footer.as_deref(), Some("foot"));
        assert_eq!(req.image.as_deref(), Some("https://e.com/i.png"));
    }

    #[test]
    fn missing_required_option_errors() {
        let options = vec![opt("title", "T"), opt("description", "D"), opt("color", "red")];
        match EmbedRequest::from_options(&options) {
            Err(CommandError::MissingArgument(name)) => assert_eq!(name, "thumbnail"),
            other => panic!("expected MissingArgument, got {other:?}"),
        }
    }

    #[test]
    fn non_string_value_counts_as_missing() {
        let mut options = vec![
            opt("description", "D"),
            opt("color", "red"),
            opt("thumbnail", "https://e.com/t.png"),
        ];
        options.push(CommandOption {
            name: "title".into(),
            value: Some(json!(42)),
        });
        assert!(matches!(
            EmbedRequest::from_options(&options),
            Err(CommandError::MissingArgument("title"))
        ));
    }

    #[test]
    fn command_definition_shape() {
        let def = embed_command();
        assert_eq!(def["name"], "embed");
        let options = def["options"].as_array().unwrap();
        assert_eq!(options.len(), 6);
        let required: Vec<&str> = options
            .iter()
            .filter(|o| o["required"] == true)
            .map(|o| o["name"].as_str().unwrap())
            .collect();
        assert_eq!(required, ["title", "description", "color", "thumbnail"]);
        assert!(options.iter().all(|o| o["type"] == 3));
    }
}
