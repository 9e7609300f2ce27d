//! The confirmation flow: from a validated card to Preview / Send / Cancel.
//!
//! [`App`] is the application context constructed once in `main` and
//! shared by every interaction handler. Each `/embed` invocation stores
//! its card in the [`SessionStore`] under a fresh UUID; the three buttons
//! carry `"<action>:<uuid>"` custom IDs, so a press is an explicit lookup
//! instead of a closure capture. Authorization is re-checked on every
//! action because role membership can change between the command and a
//! later button press.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::DiscordApi;
use crate::card::CardSpec;
use crate::commands::{self, COMMAND_NAME, EmbedRequest};
use crate::config::Config;
use crate::error::{CommandError, PlatformError};
use crate::gateway::events::{
    FLAG_EPHEMERAL, INTERACTION_APPLICATION_COMMAND, INTERACTION_MESSAGE_COMPONENT, Interaction,
    RESPONSE_CHANNEL_MESSAGE,
};

/// How long a pending card stays actionable. Discord invalidates the
/// interaction token after 15 minutes, so keeping cards longer only
/// leaks memory.
const SESSION_TTL_MINUTES: i64 = 15;

// Discord button styles.
const STYLE_PRIMARY: u8 = 1;
const STYLE_SUCCESS: u8 = 3;
const STYLE_DANGER: u8 = 4;

/// The three follow-up actions offered on a pending card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    /// Show the card to the author privately; repeatable.
    Preview,
    /// Publish the card to the channel; terminal.
    Send,
    /// Drop the card; terminal.
    Cancel,
}

impl CardAction {
    fn as_str(self) -> &'static str {
        match self {
            CardAction::Preview => "preview",
            CardAction::Send => "send",
            CardAction::Cancel => "cancel",
        }
    }

    /// The component `custom_id` for this action on the given session.
    pub fn custom_id(self, key: Uuid) -> String {
        format!("{}:{key}", self.as_str())
    }

    /// Parse an `"<action>:<uuid>"` custom ID back into its parts.
    ///
    /// Returns `None` for components that are not ours.
    pub fn parse_custom_id(custom_id: &str) -> Option<(CardAction, Uuid)> {
        let (action, key) = custom_id.split_once(':')?;
        let action = match action {
            "preview" => CardAction::Preview,
            "send" => CardAction::Send,
            "cancel" => CardAction::Cancel,
            _ => return None,
        };
        Some((action, Uuid::parse_str(key).ok()?))
    }
}

/// A built card waiting for its author's decision.
#[derive(Debug, Clone)]
pub struct PendingCard {
    /// The validated card.
    pub card: CardSpec,
    /// User who ran `/embed`; the only one allowed to press the buttons.
    pub author_id: String,
    /// Channel the card will be published to on Send.
    pub channel_id: String,
    /// When the card was built, for TTL pruning.
    pub created_at: DateTime<Utc>,
}

impl PendingCard {
    fn is_expired(&self) -> bool {
        Utc::now() - self.created_at > Duration::minutes(SESSION_TTL_MINUTES)
    }
}

/// Pending cards keyed by session UUID.
///
/// Nothing here is shared across invocations except the map itself;
/// entries are independent and die with their invocation.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<Uuid, PendingCard>>,
}

impl SessionStore {
    /// Store a pending card under a fresh key, pruning expired entries.
    pub async fn insert(&self, pending: PendingCard) -> Uuid {
        let mut inner = self.inner.write().await;
        inner.retain(|_, p| !p.is_expired());
        let key = Uuid::new_v4();
        inner.insert(key, pending);
        key
    }

    /// Look up a live pending card without removing it.
    pub async fn get(&self, key: &Uuid) -> Option<PendingCard> {
        self.inner
            .read()
            .await
            .get(key)
            .filter(|p| !p.is_expired())
            .cloned()
    }

    /// Remove and return a live pending card.
    ///
    /// Terminal actions claim the session first so racing presses act at
    /// most once.
    pub async fn claim(&self, key: &Uuid) -> Option<PendingCard> {
        self.inner
            .write()
            .await
            .remove(key)
            .filter(|p| !p.is_expired())
    }

    /// Put a claimed card back (authorization failed after the claim, or
    /// publishing failed and the card should stay retryable).
    pub async fn restore(&self, key: Uuid, pending: PendingCard) {
        self.inner.write().await.insert(key, pending);
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

/// Application context: config, REST client, and pending sessions.
///
/// Constructed once and shared as `Arc<App>` by the gateway dispatcher;
/// handlers take `&self` and interaction data, nothing global.
pub struct App {
    config: Config,
    api: Arc<dyn DiscordApi>,
    sessions: SessionStore,
}

impl App {
    /// Build the context from loaded config and a REST client.
    pub fn new(config: Config, api: Arc<dyn DiscordApi>) -> Self {
        Self {
            config,
            api,
            sessions: SessionStore::default(),
        }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether this interaction's user may use the command right now.
    ///
    /// No configured role means everyone may. Otherwise the interaction
    /// must come from a guild member currently holding the role; this is
    /// evaluated fresh on every command and every button press.
    pub fn is_authorized(&self, interaction: &Interaction) -> bool {
        match self.config.admin_role_id.as_deref() {
            None => true,
            Some(role) => interaction
                .member
                .as_ref()
                .is_some_and(|m| m.roles.iter().any(|r| r == role)),
        }
    }

    /// Register the `/embed` command for the given application, scoped to
    /// the configured guild when one is set.
    pub async fn register_commands(&self, application_id: &str) -> Result<(), PlatformError> {
        self.api
            .register_commands(
                application_id,
                self.config.guild_id.as_deref(),
                json!([commands::embed_command()]),
            )
            .await
    }

    /// Single entry point for every interaction.
    ///
    /// All per-invocation errors stop here: they are logged and turned
    /// into an ephemeral reply to the invoking user. Nothing escapes to
    /// the gateway loop.
    pub async fn handle_interaction(&self, interaction: Interaction) {
        let result = match interaction.kind {
            INTERACTION_APPLICATION_COMMAND => self.handle_command(&interaction).await,
            INTERACTION_MESSAGE_COMPONENT => self.handle_component(&interaction).await,
            kind => {
                debug!(kind, "ignoring interaction type");
                return;
            }
        };

        if let Err(err) = result {
            warn!(error = %err, interaction_id = %interaction.id, "interaction failed");
            let reply = ephemeral_text(&err.user_message());
            if let Err(e) = self
                .api
                .interaction_response(&interaction.id, &interaction.token, reply)
                .await
            {
                error!(error = %e, "failed to deliver error reply");
            }
        }
    }

    /// Handle a `/embed` invocation: authorize, validate, build the card,
    /// and offer the three actions ephemerally.
    async fn handle_command(&self, interaction: &Interaction) -> Result<(), CommandError> {
        let data = interaction
            .data
            .as_ref()
            .ok_or(CommandError::MalformedInteraction("missing command data"))?;
        if data.name.as_deref() != Some(COMMAND_NAME) {
            debug!(name = ?data.name, "ignoring unknown command");
            return Ok(());
        }

        if !self.is_authorized(interaction) {
            return Err(CommandError::Unauthorized);
        }

        let request = EmbedRequest::from_options(&data.options)?;
        let card = CardSpec::from_request(&request)?;

        let author = interaction
            .invoker()
            .ok_or(CommandError::MalformedInteraction("missing invoking user"))?;
        let channel_id = interaction
            .channel_id
            .clone()
            .ok_or(CommandError::MalformedInteraction("missing channel id"))?;

        let key = self
            .sessions
            .insert(PendingCard {
                card,
                author_id: author.id.clone(),
                channel_id,
                created_at: Utc::now(),
            })
            .await;

        info!(author = %author.username, session = %key, "card built, awaiting confirmation");

        self.api
            .interaction_response(&interaction.id, &interaction.token, confirmation_prompt(key))
            .await?;
        Ok(())
    }

    /// Handle a button press on a pending card.
    async fn handle_component(&self, interaction: &Interaction) -> Result<(), CommandError> {
        let custom_id = interaction
            .data
            .as_ref()
            .and_then(|d| d.custom_id.as_deref())
            .ok_or(CommandError::MalformedInteraction("missing custom_id"))?;

        let Some((action, key)) = CardAction::parse_custom_id(custom_id) else {
            debug!(custom_id, "ignoring unrelated component");
            return Ok(());
        };

        if !self.is_authorized(interaction) {
            return Err(CommandError::Unauthorized);
        }
        let presser = interaction
            .invoker()
            .ok_or(CommandError::MalformedInteraction("missing invoking user"))?;

        match action {
            CardAction::Preview => {
                let pending = self
                    .sessions
                    .get(&key)
                    .await
                    .ok_or(CommandError::SessionExpired)?;
                if pending.author_id != presser.id {
                    return Err(CommandError::Unauthorized);
                }
                debug!(session = %key, "card previewed");
                self.api
                    .interaction_response(
                        &interaction.id,
                        &interaction.token,
                        ephemeral_embed(pending.card.to_embed()),
                    )
                    .await?;
            }
            CardAction::Send => {
                let pending = self
                    .sessions
                    .claim(&key)
                    .await
                    .ok_or(CommandError::SessionExpired)?;
                if pending.author_id != presser.id {
                    self.sessions.restore(key, pending).await;
                    return Err(CommandError::Unauthorized);
                }

                let payload = json!({ "embeds": [pending.card.to_embed()] });
                let message_id = match self.api.create_message(&pending.channel_id, payload).await
                {
                    Ok(id) => id,
                    Err(e) => {
                        // Keep the card around so Send can be retried.
                        self.sessions.restore(key, pending).await;
                        return Err(e.into());
                    }
                };

                info!(
                    session = %key,
                    message_id,
                    channel_id = %pending.channel_id,
                    "embed published"
                );
                self.api
                    .interaction_response(
                        &interaction.id,
                        &interaction.token,
                        ephemeral_text("Embed sent successfully!"),
                    )
                    .await?;
            }
            CardAction::Cancel => {
                let pending = self
                    .sessions
                    .claim(&key)
                    .await
                    .ok_or(CommandError::SessionExpired)?;
                if pending.author_id != presser.id {
                    self.sessions.restore(key, pending).await;
                    return Err(CommandError::Unauthorized);
                }

                info!(session = %key, "embed creation cancelled");
                self.api
                    .interaction_response(
                        &interaction.id,
                        &interaction.token,
                        ephemeral_text("Embed creation cancelled."),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

/// An ephemeral plain-text interaction response.
fn ephemeral_text(text: &str) -> Value {
    json!({
        "type": RESPONSE_CHANNEL_MESSAGE,
        "data": { "content": text, "flags": FLAG_EPHEMERAL },
    })
}

/// An ephemeral interaction response carrying one embed.
fn ephemeral_embed(embed: Value) -> Value {
    json!({
        "type": RESPONSE_CHANNEL_MESSAGE,
        "data": { "embeds": [embed], "flags": FLAG_EPHEMERAL },
    })
}

/// The initial ephemeral response: prompt plus the three action buttons.
fn confirmation_prompt(key: Uuid) -> Value {
    json!({
        "type": RESPONSE_CHANNEL_MESSAGE,
        "data": {
            "content": "Embed ready. Preview it, send it to the channel, or cancel.",
            "flags": FLAG_EPHEMERAL,
            "components": [{
                "type": 1,
                "components": [
                    {
                        "type": 2,
                        "style": STYLE_PRIMARY,
                        "label": "Preview",
                        "custom_id": CardAction::Preview.custom_id(key),
                    },
                    {
                        "type": 2,
                        "style": STYLE_SUCCESS,
                        "label": "Send",
                        "custom_id": CardAction::Send.custom_id(key),
                    },
                    {
                        "type": 2,
                        "style": STYLE_DANGER,
                        "label": "Cancel",
                        "custom_id": CardAction::Cancel.custom_id(key),
                    },
                ],
            }],
        },
    })
}
