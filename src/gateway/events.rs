//! Discord Gateway v10 payload types and opcodes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Gateway opcodes ─────────────────────────────────────────────────────

/// Opcode 0: Dispatch -- an event was dispatched.
pub const OP_DISPATCH: u8 = 0;

/// Opcode 1: Heartbeat -- keep-alive, sent on the interval from Hello.
pub const OP_HEARTBEAT: u8 = 1;

/// Opcode 2: Identify -- start a new session.
pub const OP_IDENTIFY: u8 = 2;

/// Opcode 6: Resume -- continue a previous session after a drop.
pub const OP_RESUME: u8 = 6;

/// Opcode 7: Reconnect -- the server wants the client to reconnect.
pub const OP_RECONNECT: u8 = 7;

/// Opcode 9: Invalid Session -- the session is gone; `d` says whether a
/// resume is still possible.
pub const OP_INVALID_SESSION: u8 = 9;

/// Opcode 10: Hello -- first payload on connect, carries the heartbeat
/// interval.
pub const OP_HELLO: u8 = 10;

/// Opcode 11: Heartbeat ACK.
pub const OP_HEARTBEAT_ACK: u8 = 11;

// ── Interaction constants ───────────────────────────────────────────────

/// Interaction type 2: a slash command invocation.
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

/// Interaction type 3: a component (button) press.
pub const INTERACTION_MESSAGE_COMPONENT: u8 = 3;

/// Interaction response type 4: reply with a message.
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;

/// Message flag marking a response as ephemeral (invoker-only).
pub const FLAG_EPHEMERAL: u64 = 1 << 6;

// ── Payload envelope ────────────────────────────────────────────────────

/// The envelope every Gateway payload travels in, both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayload {
    /// Opcode.
    pub op: u8,

    /// Event data; `null` for bare heartbeats.
    pub d: Option<Value>,

    /// Sequence number (Dispatch only), echoed in heartbeats and Resume.
    pub s: Option<u64>,

    /// Event name (Dispatch only), e.g. `"INTERACTION_CREATE"`.
    pub t: Option<String>,
}

/// `d` field of Hello (opcode 10).
#[derive(Debug, Clone, Deserialize)]
pub struct HelloData {
    /// Milliseconds between heartbeats.
    pub heartbeat_interval: u64,
}

/// `d` field of Identify (opcode 2).
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyPayload {
    /// Bot token.
    pub token: String,

    /// Gateway intents bitmask. Interactions arrive regardless of the
    /// subscribed intents, so `0` is a workable default here.
    pub intents: u32,

    /// Connection properties (OS, library name).
    pub properties: ConnectionProperties,
}

/// Connection properties inside Identify.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionProperties {
    /// Operating system.
    pub os: String,

    /// Library name reported as "browser".
    pub browser: String,

    /// Library name reported as device.
    pub device: String,
}

/// `d` field of Resume (opcode 6).
#[derive(Debug, Clone, Serialize)]
pub struct ResumePayload {
    /// Bot token.
    pub token: String,

    /// Session ID from the READY event.
    pub session_id: String,

    /// Last sequence number seen.
    pub seq: u64,
}

/// `d` field of the READY dispatch event.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyEvent {
    /// Gateway version.
    pub v: u32,

    /// The bot's own user.
    pub user: User,

    /// Session ID, needed to resume.
    pub session_id: String,

    /// Preferred gateway URL for resuming.
    #[serde(default)]
    pub resume_gateway_url: Option<String>,

    /// The application this bot belongs to; its id is what command
    /// registration needs.
    #[serde(default)]
    pub application: Option<ReadyApplication>,
}

/// Application stub inside READY.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyApplication {
    /// Application ID (snowflake).
    pub id: String,
}

// ── INTERACTION_CREATE ──────────────────────────────────────────────────

/// An INTERACTION_CREATE dispatch payload: one slash command invocation
/// or one button press.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    /// Interaction ID, used in the response callback URL.
    pub id: String,

    /// Interaction type (see the `INTERACTION_*` constants).
    #[serde(rename = "type")]
    pub kind: u8,

    /// One-shot token for responding to this interaction.
    pub token: String,

    /// Command or component data.
    #[serde(default)]
    pub data: Option<InteractionData>,

    /// Guild member who invoked, when in a guild. Carries role IDs.
    #[serde(default)]
    pub member: Option<GuildMember>,

    /// Invoking user, when outside a guild (DMs).
    #[serde(default)]
    pub user: Option<User>,

    /// Channel the interaction happened in.
    #[serde(default)]
    pub channel_id: Option<String>,

    /// Guild the interaction happened in, if any.
    #[serde(default)]
    pub guild_id: Option<String>,
}

impl Interaction {
    /// The user behind this interaction, wherever Discord put them.
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }
}

/// The `data` field of an interaction.
///
/// Slash commands populate `name`/`options`; component presses populate
/// `custom_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionData {
    /// Command name (slash commands).
    #[serde(default)]
    pub name: Option<String>,

    /// Command options (slash commands).
    #[serde(default)]
    pub options: Vec<CommandOption>,

    /// Component identifier (button presses).
    #[serde(default)]
    pub custom_id: Option<String>,
}

/// A single option value supplied with a slash command.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    /// Option name.
    pub name: String,

    /// Option value; string-typed for every `/embed` option.
    #[serde(default)]
    pub value: Option<Value>,
}

/// A guild member, as attached to guild interactions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuildMember {
    /// The member's user record.
    #[serde(default)]
    pub user: Option<User>,

    /// Role IDs the member currently holds.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A Discord user.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// User ID (snowflake).
    pub id: String,

    /// Username.
    pub username: String,

    /// Whether the user is a bot.
    #[serde(default)]
    pub bot: bool,
}
