//! `discord_member`: a guild member and the user behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::discord::enums::{self, MEMBER_FLAGS, PERMISSIONS, PREMIUM_TYPES, USER_FLAGS};
use crate::discord::types::User;
use crate::discord::{format, lookup};
use crate::error::{ProviderError, ProviderResult};
use crate::handler::{text, Context, DataSourceHandler};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::value::Attr;

/// The nested `user` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserModel {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    pub global_name: String,
    pub bot: bool,
    pub system: bool,
    pub mfa_enabled: bool,
    pub banner: String,
    pub accent_color: String,
    pub locale: String,
    pub verified: bool,
    pub email: String,
    pub flags: Vec<String>,
    pub premium_type: String,
    pub public_flags: Vec<String>,
    pub avatar: String,
}

impl From<User> for UserModel {
    fn from(user: User) -> Self {
        Self {
            accent_color: format::hex_color(user.accent_color.unwrap_or_default()),
            flags: enums::list_stringify(user.flags, &USER_FLAGS),
            public_flags: enums::list_stringify(user.public_flags, &USER_FLAGS),
            premium_type: enums::stringify(user.premium_type, &PREMIUM_TYPES),
            global_name: user.global_name.unwrap_or_default(),
            banner: user.banner.unwrap_or_default(),
            locale: user.locale.unwrap_or_default(),
            email: user.email.unwrap_or_default(),
            avatar: user.avatar.unwrap_or_default(),
            id: user.id,
            username: user.username,
            discriminator: user.discriminator,
            bot: user.bot,
            system: user.system,
            mfa_enabled: user.mfa_enabled,
            verified: user.verified,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberModel {
    pub guild_id: Attr<String>,
    pub id: Attr<String>,
    pub username: Attr<String>,
    pub discriminator: Attr<String>,
    pub user: Attr<UserModel>,
    pub nick: Attr<String>,
    pub avatar: Attr<String>,
    pub roles: Attr<Vec<String>>,
    pub joined_at: Attr<String>,
    pub premium_since: Attr<String>,
    pub deaf: Attr<bool>,
    pub mute: Attr<bool>,
    pub flags: Attr<Vec<String>>,
    pub pending: Attr<bool>,
    pub permissions: Attr<Vec<String>>,
    pub communication_disabled_until: Attr<String>,
}

fn user_type() -> AttributeType {
    use AttributeType::{Bool, String};

    AttributeType::object([
        ("id", String),
        ("username", String),
        ("discriminator", String),
        ("global_name", String),
        ("bot", Bool),
        ("system", Bool),
        ("mfa_enabled", Bool),
        ("banner", String),
        ("accent_color", String),
        ("locale", String),
        ("verified", Bool),
        ("email", String),
        ("flags", AttributeType::string_list()),
        ("premium_type", String),
        ("public_flags", AttributeType::string_list()),
        ("avatar", String),
    ])
}

pub struct MemberDataSource;

#[async_trait]
impl DataSourceHandler for MemberDataSource {
    type Model = MemberModel;

    const NAME: &'static str = "discord_member";
    const ENTITY: &'static str = "member";

    fn schema() -> Schema {
        let lookup = || Attribute::optional_computed(AttributeType::String);
        let string = Attribute::computed_string;
        let flag = || Attribute::computed(AttributeType::Bool);
        let names = || Attribute::computed(AttributeType::string_list());

        Schema::v0()
            .with_description("Look up a guild member by ID or username.")
            .with_attribute(
                "guild_id",
                Attribute::required_string().with_description("ID of the guild."),
            )
            .with_attribute("id", lookup().with_description("ID of the member."))
            .with_attribute(
                "username",
                lookup().with_description("Username of the member. Not unique across Discord."),
            )
            .with_attribute("discriminator", lookup())
            .with_attribute("user", Attribute::computed(user_type()))
            .with_attribute("nick", string().with_description("Guild nickname, if set."))
            .with_attribute("avatar", string().with_description("Guild avatar hash."))
            .with_attribute(
                "roles",
                names().with_description("Role names, lowest position first."),
            )
            .with_attribute("joined_at", string())
            .with_attribute("premium_since", string())
            .with_attribute("deaf", flag())
            .with_attribute("mute", flag())
            .with_attribute("flags", names())
            .with_attribute("pending", flag())
            .with_attribute("permissions", names())
            .with_attribute(
                "communication_disabled_until",
                string().with_description("When the member's timeout expires."),
            )
    }

    fn required(model: &MemberModel) -> Vec<(&'static str, &Attr<String>)> {
        vec![
            ("guild_id", &model.guild_id),
            ("username?", &model.username),
            ("id?", &model.id),
        ]
    }

    async fn read(cx: &Context<'_>, config: MemberModel) -> ProviderResult<MemberModel> {
        let guild_id = config.guild_id.value_str();
        let key = cx.key("member", ("id", &config.id), ("username", &config.username))?;
        let member = lookup::member(cx.api, guild_id, key).await?;
        let roles = lookup::role_names_by_position(cx.api, guild_id, &member.roles)
            .await
            .map_err(|e| ProviderError::from(e).in_operation("get roles for", "member"))?;

        Ok(MemberModel {
            guild_id: config.guild_id.clone(),
            id: Attr::Known(member.user.id.clone()),
            username: Attr::Known(member.user.username.clone()),
            discriminator: Attr::Known(member.user.discriminator.clone()),
            nick: text(member.nick.as_deref()),
            avatar: text(member.avatar.as_deref()),
            roles: Attr::Known(roles),
            joined_at: Attr::Known(format::timestamp(member.joined_at.as_deref())),
            premium_since: Attr::Known(format::timestamp(member.premium_since.as_deref())),
            deaf: Attr::Known(member.deaf),
            mute: Attr::Known(member.mute),
            flags: Attr::Known(enums::list_stringify(member.flags, &MEMBER_FLAGS)),
            pending: Attr::Known(member.pending),
            permissions: Attr::Known(enums::list_stringify(member.permissions, &PERMISSIONS)),
            communication_disabled_until: Attr::Known(format::timestamp(
                member.communication_disabled_until.as_deref(),
            )),
            user: Attr::Known(member.user.into()),
        })
    }
}
