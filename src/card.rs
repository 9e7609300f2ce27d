//! [`CardSpec`] -- the validated, immutable embed card.
//!
//! Built once from an [`EmbedRequest`](crate::commands::EmbedRequest) and
//! then only read: previewed, published, or dropped on cancel.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::color;
use crate::commands::EmbedRequest;
use crate::error::CommandError;

/// Discord's per-field limits for embeds.
pub const TITLE_MAX_CHARS: usize = 256;
pub const DESCRIPTION_MAX_CHARS: usize = 4096;
pub const FOOTER_MAX_CHARS: usize = 2048;

/// Matches a `[display text](url)` hyperlink at the start of the title.
static TITLE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(.+?)\]\((.+?)\)").expect("title link pattern"));

/// A validated embed card, immutable once constructed.
///
/// Lives only for the duration of one `/embed` invocation: from the
/// initial command until Send, Cancel, or session expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSpec {
    /// Display text of the title (hyperlink syntax already stripped).
    pub title: String,
    /// Link target when the title used `[text](url)` syntax.
    pub title_url: Option<String>,
    /// Body text with literal `\n` sequences converted to newlines.
    pub description: String,
    /// 24-bit accent color.
    pub color: u32,
    /// Thumbnail URL (http or https).
    pub thumbnail_url: String,
    /// Optional footer text.
    pub footer: Option<String>,
    /// Optional full-width image URL.
    pub image_url: Option<String>,
}

impl CardSpec {
    /// Validate and normalize a request into a card.
    ///
    /// Fails with [`CommandError::InvalidColorFormat`] or
    /// [`CommandError::InvalidThumbnailUrl`]; over-long fields are
    /// silently truncated rather than rejected.
    pub fn from_request(request: &EmbedRequest) -> Result<Self, CommandError> {
        let color = color::resolve(&request.color)?;

        if !request.thumbnail.starts_with("http://")
            && !request.thumbnail.starts_with("https://")
        {
            return Err(CommandError::InvalidThumbnailUrl(request.thumbnail.clone()));
        }

        let (title, title_url) = split_title_link(&request.title);
        let description = request.description.replace("\\n", "\n");

        Ok(Self {
            title: clamp_chars(title, TITLE_MAX_CHARS),
            title_url,
            description: clamp_chars(&description, DESCRIPTION_MAX_CHARS),
            color,
            thumbnail_url: request.thumbnail.clone(),
            footer: request
                .footer
                .as_deref()
                .map(|f| clamp_chars(f, FOOTER_MAX_CHARS)),
            image_url: request.image.clone(),
        })
    }

    /// Render the card as a Discord embed object for REST bodies.
    pub fn to_embed(&self) -> Value {
        let mut embed = json!({
            "title": self.title,
            "description": self.description,
            "color": self.color,
            "thumbnail": { "url": self.thumbnail_url },
        });
        if let Some(ref url) = self.title_url {
            embed["url"] = json!(url);
        }
        if let Some(ref footer) = self.footer {
            embed["footer"] = json!({ "text": footer });
        }
        if let Some(ref image) = self.image_url {
            embed["image"] = json!({ "url": image });
        }
        embed
    }
}

/// Split a leading `[text](url)` hyperlink out of the title.
///
/// Anything after the closing parenthesis is discarded; a title without
/// the pattern is plain display text with no link.
fn split_title_link(title: &str) -> (&str, Option<String>) {
    match TITLE_LINK.captures(title) {
        Some(caps) => {
            let text = caps.get(1).map_or("", |m| m.as_str());
            let url = caps.get(2).map(|m| m.as_str().to_string());
            (text, url)
        }
        None => (title, None),
    }
}

/// Truncate to at most `max_chars` characters (not bytes).
fn clamp_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        value.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EmbedRequest {
        EmbedRequest {
            title: "Plain Title".into(),
            description: "Hello".into(),
            color: "red".into(),
            thumbnail: "https://example.com/thumb.png".into(),
            footer: None,
            image: None,
        }
    }

    #[test]
    fn plain_title_has_no_link() {
        let card = CardSpec::from_request(&request()).unwrap();
        assert_eq!(card.title, "Plain Title");
        assert!(card.title_url.is_none());
    }

    #[test]
    fn linked_title_splits() {
        let mut req = request();
        req.title = "[Docs](https://example.com)".into();
        let card = CardSpec::from_request(&req).unwrap();
        assert_eq!(card.title, "Docs");
        assert_eq!(card.title_url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn link_must_lead_the_title() {
        let mut req = request();
        req.title = "see [Docs](https://example.com)".into();
        let card = CardSpec::from_request(&req).unwrap();
        assert_eq!(card.title, "see [Docs](https://example.com)");
        assert!(card.title_url.is_none());
    }

    #[test]
    fn description_unescapes_literal_newlines() {
        let mut req = request();
        req.description = "Line1\\nLine2".into();
        let card = CardSpec::from_request(&req).unwrap();
        assert_eq!(card.description, "Line1\nLine2");
    }

    #[test]
    fn long_fields_truncate_silently() {
        let mut req = request();
        req.title = "t".repeat(300);
        req.description = "d".repeat(5000);
        req.footer = Some("f".repeat(3000));
        let card = CardSpec::from_request(&req).unwrap();
        assert_eq!(card.title.chars().count(), 256);
        assert_eq!(card.description.chars().count(), 4096);
        assert_eq!(card.footer.as_ref().unwrap().chars().count(), 2048);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let mut req = request();
        req.title = "é".repeat(300);
        let card = CardSpec::from_request(&req).unwrap();
        assert_eq!(card.title.chars().count(), 256);
    }

    #[test]
    fn thumbnail_requires_http_scheme() {
        for bad in ["ftp://example.com/x.png", "example.com/x.png", "", "httpx://y"] {
            let mut req = request();
            req.thumbnail = bad.into();
            match CardSpec::from_request(&req) {
                Err(CommandError::InvalidThumbnailUrl(url)) => assert_eq!(url, bad),
                other => panic!("expected InvalidThumbnailUrl for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn thumbnail_accepts_both_schemes() {
        for good in ["http://example.com/a.png", "https://example.com/a.png"] {
            let mut req = request();
            req.thumbnail = good.into();
            assert!(CardSpec::from_request(&req).is_ok(), "url: {good}");
        }
    }

    #[test]
    fn invalid_color_propagates() {
        let mut req = request();
        req.color = "not-a-color".into();
        assert!(matches!(
            CardSpec::from_request(&req),
            Err(CommandError::InvalidColorFormat(_))
        ));
    }

    #[test]
    fn embed_json_minimal() {
        let card = CardSpec::from_request(&request()).unwrap();
        let embed = card.to_embed();
        assert_eq!(embed["title"], "Plain Title");
        assert_eq!(embed["description"], "Hello");
        assert_eq!(embed["color"], 0xED4245);
        assert_eq!(embed["thumbnail"]["url"], "https://example.com/thumb.png");
        assert!(embed.get("url").is_none());
        assert!(embed.get("footer").is_none());
        assert!(embed.get("image").is_none());
    }

    #[test]
    fn embed_json_full() {
        let mut req = request();
        req.title = "[Docs](https://docs.example.com)".into();
        req.footer = Some("fine print".into());
        req.image = Some("https://example.com/banner.png".into());
        let embed = CardSpec::from_request(&req).unwrap().to_embed();
        assert_eq!(embed["url"], "https://docs.example.com");
        assert_eq!(embed["footer"]["text"], "fine print");
        assert_eq!(embed["image"]["url"], "https://example.com/banner.png");
    }
}
