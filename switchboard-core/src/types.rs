//! Platform-facing data model: ids, permissions, activation events and
//! response messages.

use bitflags::bitflags;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SNOWFLAKE
// ============================================================================

/// Milliseconds between the Unix epoch and the platform epoch (2015-01-01).
pub const PLATFORM_EPOCH_MS: u64 = 1_420_070_400_000;

/// Platform-assigned 64-bit identifier.
///
/// Serialized as a decimal string; deserializes from either a string or a
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(u64);

impl Snowflake {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Creation time encoded in the upper 42 bits.
    pub fn timestamp(self) -> DateTime<Utc> {
        let millis = (self.0 >> 22) + PLATFORM_EPOCH_MS;
        Utc.timestamp_millis_opt(millis as i64)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error when parsing an invalid snowflake string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnowflakeParseError(pub String);

impl fmt::Display for SnowflakeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid snowflake: {}", self.0)
    }
}

impl std::error::Error for SnowflakeParseError {}

impl FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| SnowflakeParseError(s.to_string()))
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Number(value) => Ok(Self(value)),
        }
    }
}

// ============================================================================
// PERMISSIONS
// ============================================================================

bitflags! {
    /// Channel permissions relevant to interactive components.
    ///
    /// Bit positions match the platform's permission integer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        const CREATE_INSTANT_INVITE = 1 << 0;
        const KICK_MEMBERS = 1 << 1;
        const BAN_MEMBERS = 1 << 2;
        const ADMINISTRATOR = 1 << 3;
        const MANAGE_CHANNELS = 1 << 4;
        const MANAGE_GUILD = 1 << 5;
        const ADD_REACTIONS = 1 << 6;
        const VIEW_CHANNEL = 1 << 10;
        const SEND_MESSAGES = 1 << 11;
        const MANAGE_MESSAGES = 1 << 13;
        const EMBED_LINKS = 1 << 14;
        const ATTACH_FILES = 1 << 15;
        const READ_MESSAGE_HISTORY = 1 << 16;
        const USE_EXTERNAL_EMOJIS = 1 << 18;
        const MANAGE_ROLES = 1 << 28;
        const MANAGE_WEBHOOKS = 1 << 29;
        const SEND_MESSAGES_IN_THREADS = 1 << 38;
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::empty()
    }
}

impl Permissions {
    /// Human-readable names of the set flags, e.g. `"Send Messages"`.
    pub fn display_names(&self) -> Vec<String> {
        self.iter_names()
            .map(|(name, _)| {
                name.split('_')
                    .map(|word| {
                        let lower = word.to_lowercase();
                        let mut chars = lower.chars();
                        match chars.next() {
                            Some(first) => first.to_uppercase().chain(chars).collect(),
                            None => String::new(),
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

// ============================================================================
// COMPONENT CLASSIFICATION
// ============================================================================

/// Kind of interactive control that produced an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    Button,
    SelectMenu,
}

/// Who can see a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Only the activating user.
    #[default]
    Ephemeral,
    /// Everyone in the channel.
    Public,
}

/// Closed set of reusable callback kinds.
///
/// A callback may only be used by a component of the matching control type
/// and visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackKind {
    EphemeralButton,
    PublicButton,
    EphemeralSelectMenu,
    PublicSelectMenu,
}

impl CallbackKind {
    /// The kind a component of this shape expects.
    pub fn for_component(control: ControlType, visibility: Visibility) -> Self {
        match (control, visibility) {
            (ControlType::Button, Visibility::Ephemeral) => CallbackKind::EphemeralButton,
            (ControlType::Button, Visibility::Public) => CallbackKind::PublicButton,
            (ControlType::SelectMenu, Visibility::Ephemeral) => CallbackKind::EphemeralSelectMenu,
            (ControlType::SelectMenu, Visibility::Public) => CallbackKind::PublicSelectMenu,
        }
    }

    pub fn control(&self) -> ControlType {
        match self {
            CallbackKind::EphemeralButton | CallbackKind::PublicButton => ControlType::Button,
            CallbackKind::EphemeralSelectMenu | CallbackKind::PublicSelectMenu => {
                ControlType::SelectMenu
            }
        }
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            CallbackKind::EphemeralButton | CallbackKind::EphemeralSelectMenu => {
                Visibility::Ephemeral
            }
            CallbackKind::PublicButton | CallbackKind::PublicSelectMenu => Visibility::Public,
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackKind::EphemeralButton => "ephemeral button",
            CallbackKind::PublicButton => "public button",
            CallbackKind::EphemeralSelectMenu => "ephemeral select menu",
            CallbackKind::PublicSelectMenu => "public select menu",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ACTIVATION EVENT
// ============================================================================

/// The user who triggered an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
}

impl User {
    pub fn new(id: impl Into<Snowflake>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// A single user-triggered firing of an interactive control.
#[derive(Clone)]
pub struct ActivationEvent {
    /// Id of the originating interaction.
    pub interaction_id: Snowflake,
    /// Continuation token used to respond to the interaction.
    pub token: String,
    pub user: User,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    /// Raw custom-data string attached to the control.
    pub custom_id: String,
    pub control: ControlType,
    /// Selected option values. Always empty for buttons.
    pub values: Vec<String>,
    /// The bot's effective permissions in the channel.
    pub app_permissions: Permissions,
    pub received_at: DateTime<Utc>,
}

impl ActivationEvent {
    pub fn new(
        interaction_id: impl Into<Snowflake>,
        token: impl Into<String>,
        user: User,
        channel_id: impl Into<Snowflake>,
        custom_id: impl Into<String>,
        control: ControlType,
    ) -> Self {
        Self {
            interaction_id: interaction_id.into(),
            token: token.into(),
            user,
            channel_id: channel_id.into(),
            guild_id: None,
            custom_id: custom_id.into(),
            control,
            values: Vec::new(),
            app_permissions: Permissions::empty(),
            received_at: Utc::now(),
        }
    }

    pub fn with_guild(mut self, guild_id: impl Into<Snowflake>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_app_permissions(mut self, permissions: Permissions) -> Self {
        self.app_permissions = permissions;
        self
    }

    /// Whether the activation happened in a direct message.
    pub fn is_direct_message(&self) -> bool {
        self.guild_id.is_none()
    }
}

impl fmt::Debug for ActivationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationEvent")
            .field("interaction_id", &self.interaction_id)
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .field("channel_id", &self.channel_id)
            .field("guild_id", &self.guild_id)
            .field("custom_id", &self.custom_id)
            .field("control", &self.control)
            .field("values", &self.values)
            .field("app_permissions", &self.app_permissions)
            .finish()
    }
}

// ============================================================================
// RESPONSE MESSAGE
// ============================================================================

/// A rendered response handed to the platform layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub content: String,
    pub visibility: Visibility,
}

impl ResponseMessage {
    pub fn new(content: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            content: content.into(),
            visibility,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::new(content, Visibility::Ephemeral)
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self::new(content, Visibility::Public)
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================
