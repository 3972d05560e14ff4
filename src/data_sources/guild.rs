//! `discord_guild`: look a guild up by ID or by name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::discord::enums::{
    self, EXPLICIT_CONTENT_FILTERS, GUILD_NSFW_LEVELS, MESSAGE_NOTIFICATIONS, MFA_LEVELS,
    PREMIUM_TIERS, SYSTEM_CHANNEL_FLAGS, VERIFICATION_LEVELS,
};
use crate::discord::lookup;
use crate::discord::types::Guild;
use crate::error::ProviderResult;
use crate::handler::{text, Context, DataSourceHandler};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::value::Attr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildModel {
    pub id: Attr<String>,
    pub name: Attr<String>,
    pub icon: Attr<String>,
    pub splash: Attr<String>,
    pub discovery_splash: Attr<String>,
    pub owner: Attr<bool>,
    pub owner_id: Attr<String>,
    pub region: Attr<String>,
    pub afk_channel_id: Attr<String>,
    pub afk_timeout: Attr<i64>,
    pub widget_enabled: Attr<bool>,
    pub widget_channel_id: Attr<String>,
    pub verification_level: Attr<String>,
    pub default_message_notifications: Attr<String>,
    pub explicit_content_filter: Attr<String>,
    pub features: Attr<Vec<String>>,
    pub mfa_level: Attr<String>,
    pub application_id: Attr<String>,
    pub system_channel_id: Attr<String>,
    pub system_channel_flags: Attr<Vec<String>>,
    pub rules_channel_id: Attr<String>,
    pub max_presences: Attr<i64>,
    pub max_members: Attr<i64>,
    pub vanity_url_code: Attr<String>,
    pub description: Attr<String>,
    pub banner: Attr<String>,
    pub premium_tier: Attr<String>,
    pub premium_subscription_count: Attr<i64>,
    pub preferred_locale: Attr<String>,
    pub public_updates_channel_id: Attr<String>,
    pub max_video_channel_users: Attr<i64>,
    pub max_stage_video_channel_users: Attr<i64>,
    pub approximate_member_count: Attr<i64>,
    pub approximate_presence_count: Attr<i64>,
    pub nsfw_level: Attr<String>,
    pub premium_progress_bar_enabled: Attr<bool>,
    pub safety_alerts_channel_id: Attr<String>,
    pub permissions: Attr<i64>,
}

impl From<Guild> for GuildModel {
    fn from(g: Guild) -> Self {
        let count = |n: Option<i64>| Attr::Known(n.unwrap_or_default());
        Self {
            id: Attr::Known(g.id),
            name: Attr::Known(g.name),
            icon: text(g.icon.as_deref()),
            splash: text(g.splash.as_deref()),
            discovery_splash: text(g.discovery_splash.as_deref()),
            owner: Attr::Known(g.owner),
            owner_id: Attr::Known(g.owner_id),
            region: text(g.region.as_deref()),
            afk_channel_id: text(g.afk_channel_id.as_deref()),
            afk_timeout: Attr::Known(g.afk_timeout),
            widget_enabled: Attr::Known(g.widget_enabled),
            widget_channel_id: text(g.widget_channel_id.as_deref()),
            verification_level: Attr::Known(enums::stringify(
                g.verification_level,
                &VERIFICATION_LEVELS,
            )),
            default_message_notifications: Attr::Known(enums::stringify(
                g.default_message_notifications,
                &MESSAGE_NOTIFICATIONS,
            )),
            explicit_content_filter: Attr::Known(enums::stringify(
                g.explicit_content_filter,
                &EXPLICIT_CONTENT_FILTERS,
            )),
            features: Attr::Known(g.features),
            mfa_level: Attr::Known(enums::stringify(g.mfa_level, &MFA_LEVELS)),
            application_id: text(g.application_id.as_deref()),
            system_channel_id: text(g.system_channel_id.as_deref()),
            system_channel_flags: Attr::Known(enums::list_stringify(
                g.system_channel_flags,
                &SYSTEM_CHANNEL_FLAGS,
            )),
            rules_channel_id: text(g.rules_channel_id.as_deref()),
            max_presences: count(g.max_presences),
            max_members: count(g.max_members),
            vanity_url_code: text(g.vanity_url_code.as_deref()),
            description: text(g.description.as_deref()),
            banner: text(g.banner.as_deref()),
            premium_tier: Attr::Known(enums::stringify(g.premium_tier, &PREMIUM_TIERS)),
            premium_subscription_count: count(g.premium_subscription_count),
            preferred_locale: Attr::Known(g.preferred_locale),
            public_updates_channel_id: text(g.public_updates_channel_id.as_deref()),
            max_video_channel_users: count(g.max_video_channel_users),
            max_stage_video_channel_users: count(g.max_stage_video_channel_users),
            approximate_member_count: count(g.approximate_member_count),
            approximate_presence_count: count(g.approximate_presence_count),
            nsfw_level: Attr::Known(enums::stringify(g.nsfw_level, &GUILD_NSFW_LEVELS)),
            premium_progress_bar_enabled: Attr::Known(g.premium_progress_bar_enabled),
            safety_alerts_channel_id: text(g.safety_alerts_channel_id.as_deref()),
            // Permission bits fit in 51 bits.
            permissions: Attr::Known(g.permissions as i64),
        }
    }
}

pub struct GuildDataSource;

#[async_trait]
impl DataSourceHandler for GuildDataSource {
    type Model = GuildModel;

    const NAME: &'static str = "discord_guild";
    const ENTITY: &'static str = "guild";

    fn schema() -> Schema {
        let string = Attribute::computed_string;
        let int = || Attribute::computed(AttributeType::Int64);
        let flag = || Attribute::computed(AttributeType::Bool);

        Schema::v0()
            .with_description("Look up a guild the bot is a member of.")
            .with_attribute(
                "id",
                Attribute::optional_computed(AttributeType::String).with_description("ID of the guild."),
            )
            .with_attribute(
                "name",
                Attribute::optional_computed(AttributeType::String)
                    .with_description("Name of the guild. The first guild with this name wins."),
            )
            .with_attribute("icon", string())
            .with_attribute("splash", string())
            .with_attribute("discovery_splash", string())
            .with_attribute("owner", flag())
            .with_attribute("owner_id", string())
            .with_attribute("region", string())
            .with_attribute("afk_channel_id", string())
            .with_attribute("afk_timeout", int())
            .with_attribute("widget_enabled", flag())
            .with_attribute("widget_channel_id", string())
            .with_attribute("verification_level", string())
            .with_attribute("default_message_notifications", string())
            .with_attribute("explicit_content_filter", string())
            .with_attribute("features", Attribute::computed(AttributeType::string_list()))
            .with_attribute("mfa_level", string().with_description("Required MFA level for the guild."))
            .with_attribute("application_id", string())
            .with_attribute("system_channel_id", string())
            .with_attribute(
                "system_channel_flags",
                Attribute::computed(AttributeType::string_list()),
            )
            .with_attribute("rules_channel_id", string())
            .with_attribute("max_presences", int())
            .with_attribute("max_members", int())
            .with_attribute("vanity_url_code", string())
            .with_attribute("description", string())
            .with_attribute("banner", string())
            .with_attribute("premium_tier", string())
            .with_attribute("premium_subscription_count", int())
            .with_attribute("preferred_locale", string())
            .with_attribute("public_updates_channel_id", string())
            .with_attribute("max_video_channel_users", int())
            .with_attribute("max_stage_video_channel_users", int())
            .with_attribute("approximate_member_count", int())
            .with_attribute("approximate_presence_count", int())
            .with_attribute("nsfw_level", string())
            .with_attribute("premium_progress_bar_enabled", flag())
            .with_attribute("safety_alerts_channel_id", string())
            .with_attribute(
                "permissions",
                int().with_description("Permission bits of the bot user in the guild."),
            )
    }

    fn required(model: &GuildModel) -> Vec<(&'static str, &Attr<String>)> {
        vec![("id?", &model.id), ("name?", &model.name)]
    }

    async fn read(cx: &Context<'_>, config: GuildModel) -> ProviderResult<GuildModel> {
        let key = cx.key("guild", ("id", &config.id), ("name", &config.name))?;
        let guild = lookup::guild(cx.api, key).await?;
        Ok(guild.into())
    }
}
