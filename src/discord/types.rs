//! Discord API object types.
//!
//! Only the fields the provider maps into attributes are modelled. Missing
//! fields fall back to their zero value, the way Discord clients treat them.

use serde::{Deserialize, Serialize};

/// Bitfields Discord sends as decimal strings.
pub(crate) mod bitfield {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(bits: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&bits.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(0),
            Some(Raw::Number(n)) => Ok(n),
            Some(Raw::Text(s)) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A guild, as returned by `GET /guilds/{id}?with_counts=true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Guild {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub splash: Option<String>,
    pub discovery_splash: Option<String>,
    pub owner: bool,
    pub owner_id: String,
    pub region: Option<String>,
    pub afk_channel_id: Option<String>,
    pub afk_timeout: i64,
    pub widget_enabled: bool,
    pub widget_channel_id: Option<String>,
    pub verification_level: i64,
    pub default_message_notifications: i64,
    pub explicit_content_filter: i64,
    pub features: Vec<String>,
    pub mfa_level: i64,
    pub application_id: Option<String>,
    pub system_channel_id: Option<String>,
    pub system_channel_flags: u64,
    pub rules_channel_id: Option<String>,
    pub max_presences: Option<i64>,
    pub max_members: Option<i64>,
    pub vanity_url_code: Option<String>,
    pub description: Option<String>,
    pub banner: Option<String>,
    pub premium_tier: i64,
    pub premium_subscription_count: Option<i64>,
    pub preferred_locale: String,
    pub public_updates_channel_id: Option<String>,
    pub max_video_channel_users: Option<i64>,
    pub max_stage_video_channel_users: Option<i64>,
    pub approximate_member_count: Option<i64>,
    pub approximate_presence_count: Option<i64>,
    pub nsfw_level: i64,
    pub premium_progress_bar_enabled: bool,
    pub safety_alerts_channel_id: Option<String>,
    #[serde(with = "bitfield")]
    pub permissions: u64,
}

/// The partial guild listed by `GET /users/@me/guilds`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserGuild {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: i64,
    pub guild_id: Option<String>,
    pub position: i64,
    pub permission_overwrites: Vec<PermissionOverwrite>,
    pub name: String,
    pub topic: Option<String>,
    pub nsfw: bool,
    pub last_message_id: Option<String>,
    pub bitrate: i64,
    pub user_limit: i64,
    pub rate_limit_per_user: i64,
    pub icon: Option<String>,
    pub owner_id: Option<String>,
    pub application_id: Option<String>,
    pub parent_id: Option<String>,
    pub last_pin_timestamp: Option<String>,
    pub flags: u64,
    pub applied_tags: Vec<String>,
    pub default_thread_rate_limit_per_user: i64,
    pub default_sort_order: Option<i64>,
    pub default_forum_layout: i64,
}

/// A role or member override on a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionOverwrite {
    pub id: String,
    /// 0 for a role, 1 for a member.
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(with = "bitfield")]
    pub allow: u64,
    #[serde(with = "bitfield")]
    pub deny: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub color: i64,
    pub hoist: bool,
    pub icon: Option<String>,
    pub unicode_emoji: Option<String>,
    pub position: i64,
    #[serde(with = "bitfield")]
    pub permissions: u64,
    pub managed: bool,
    pub mentionable: bool,
    pub flags: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub bot: bool,
    pub system: bool,
    pub mfa_enabled: bool,
    pub banner: Option<String>,
    pub accent_color: Option<i64>,
    pub locale: Option<String>,
    pub verified: bool,
    pub email: Option<String>,
    pub flags: u64,
    pub premium_type: i64,
    pub public_flags: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Member {
    pub user: User,
    pub nick: Option<String>,
    pub avatar: Option<String>,
    pub roles: Vec<String>,
    pub joined_at: Option<String>,
    pub premium_since: Option<String>,
    pub deaf: bool,
    pub mute: bool,
    pub flags: u64,
    pub pending: bool,
    #[serde(with = "bitfield")]
    pub permissions: u64,
    pub communication_disabled_until: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Webhook {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: i64,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub token: Option<String>,
    pub application_id: Option<String>,
}

/// Body of `POST /guilds/{id}/channels`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelCreate {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: i64,
}

/// Body of `PATCH /channels/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelEdit {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// Body of role create and edit requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoleParams {
    pub name: String,
    #[serde(with = "bitfield")]
    pub permissions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentionable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unicode_emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Body of `PUT /channels/{id}/permissions/{overwrite}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverwriteParams {
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(with = "bitfield")]
    pub allow: u64,
    #[serde(with = "bitfield")]
    pub deny: u64,
}

/// Body of `POST /channels/{id}/webhooks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Body of `PATCH /webhooks/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}
