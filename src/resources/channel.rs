//! `discord_channel`: guild channels and categories.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::discord::enums::{
    self, CHANNEL_FLAGS, CHANNEL_TYPES, CHANNEL_TYPE_GUILD_TEXT, FORUM_LAYOUTS, FORUM_SORT_ORDERS,
};
use crate::discord::types::{Channel, ChannelCreate, ChannelEdit};
use crate::discord::{format, lookup, DiscordError, Key};
use crate::error::{ProviderError, ProviderResult};
use crate::handler::{self, Context, Operation, ResourceHandler};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::value::Attr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelModel {
    pub guild_id: Attr<String>,
    pub id: Attr<String>,
    #[serde(rename = "type")]
    pub kind: Attr<String>,
    pub position: Attr<i64>,
    pub name: Attr<String>,
    pub topic: Attr<String>,
    pub parent_id: Attr<String>,
    pub last_updated: Attr<String>,
    pub nsfw: Attr<bool>,
    pub last_message_id: Attr<String>,
    pub bitrate: Attr<i64>,
    pub user_limit: Attr<i64>,
    pub rate_limit_per_user: Attr<i64>,
    pub icon: Attr<String>,
    pub owner_id: Attr<String>,
    pub application_id: Attr<String>,
    pub children: Attr<Vec<String>>,
    pub last_pin_timestamp: Attr<String>,
    pub flags: Attr<Vec<String>>,
    pub applied_tags: Attr<Vec<String>>,
    pub default_thread_rate_limit_per_user: Attr<i64>,
    pub default_sort_order: Attr<String>,
    pub default_forum_layout: Attr<String>,
}

pub struct ChannelResource;

fn edit_params(model: &ChannelModel) -> ChannelEdit {
    ChannelEdit {
        name: model.name.value_str().to_string(),
        parent_id: handler::non_empty(&model.parent_id),
        topic: handler::non_empty(&model.topic),
    }
}

/// The channel ID, looked up by name when only the name is known.
async fn resolve_id(cx: &Context<'_>, model: &ChannelModel) -> ProviderResult<String> {
    match cx.key("channel", ("id", &model.id), ("name", &model.name))? {
        Key::Id(id) => Ok(id.to_string()),
        key @ Key::Name(_) => Ok(lookup::channel(cx.api, model.guild_id.value_str(), key).await?.id),
    }
}

#[async_trait]
impl ResourceHandler for ChannelResource {
    type Model = ChannelModel;
    type Remote = Channel;

    const NAME: &'static str = "discord_channel";
    const ENTITY: &'static str = "channel";

    fn schema() -> Schema {
        let string = || Attribute::computed(AttributeType::String);
        let int = || Attribute::computed(AttributeType::Int64);
        let input = Attribute::optional_computed;

        Schema::v0()
            .with_description("A channel or category in a Discord guild.")
            .with_attribute(
                "guild_id",
                Attribute::required_string().with_description("ID of the guild the channel belongs to."),
            )
            .with_attribute("id", input(AttributeType::String).with_description("ID of the channel."))
            .with_attribute(
                "type",
                input(AttributeType::String)
                    .with_description("Channel type, e.g. GUILD_TEXT or GUILD_CATEGORY. Defaults to GUILD_TEXT.")
                    .with_force_new(),
            )
            .with_attribute(
                "position",
                input(AttributeType::Int64).with_description("Sorting position of the channel."),
            )
            .with_attribute("name", input(AttributeType::String).with_description("Name of the channel."))
            .with_attribute("topic", input(AttributeType::String).with_description("Channel topic."))
            .with_attribute(
                "parent_id",
                input(AttributeType::String).with_description("ID of the parent category or thread parent."),
            )
            .with_attribute(
                "last_updated",
                string().with_description("When the provider last changed the channel."),
            )
            .with_attribute("nsfw", Attribute::computed(AttributeType::Bool))
            .with_attribute("last_message_id", string())
            .with_attribute("bitrate", int().with_description("Voice bitrate in bits."))
            .with_attribute("user_limit", int())
            .with_attribute(
                "rate_limit_per_user",
                int().with_description("Slowmode delay in seconds."),
            )
            .with_attribute("icon", string())
            .with_attribute("owner_id", string())
            .with_attribute("application_id", string())
            .with_attribute(
                "children",
                Attribute::computed(AttributeType::string_list())
                    .with_description("Sorted names of the channels parented to this one."),
            )
            .with_attribute("last_pin_timestamp", string())
            .with_attribute("flags", Attribute::computed(AttributeType::string_list()))
            .with_attribute("applied_tags", Attribute::computed(AttributeType::string_list()))
            .with_attribute("default_thread_rate_limit_per_user", int())
            .with_attribute("default_sort_order", string())
            .with_attribute("default_forum_layout", string())
    }

    fn required(op: Operation, model: &ChannelModel) -> Vec<(&'static str, &Attr<String>)> {
        match op {
            Operation::Create => vec![("guild_id", &model.guild_id), ("name", &model.name)],
            _ => vec![
                ("guild_id", &model.guild_id),
                ("name?", &model.name),
                ("id?", &model.id),
            ],
        }
    }

    async fn create(cx: &Context<'_>, model: &ChannelModel) -> ProviderResult<Channel> {
        let type_name = match model.kind.known().filter(|t| !t.is_empty()) {
            Some(t) => t.clone(),
            None => enums::stringify(CHANNEL_TYPE_GUILD_TEXT, &CHANNEL_TYPES),
        };
        let kind = enums::value_of(&type_name, &CHANNEL_TYPES)
            .ok_or(DiscordError::InvalidChannelType(type_name))?;

        let created = cx
            .api
            .create_channel(
                model.guild_id.value_str(),
                &ChannelCreate {
                    name: model.name.value_str().to_string(),
                    kind,
                },
            )
            .await?;
        // Creation only takes name and type, the rest is an edit.
        Ok(cx.api.edit_channel(&created.id, &edit_params(model)).await?)
    }

    async fn read(cx: &Context<'_>, model: &ChannelModel) -> ProviderResult<Channel> {
        let key = cx.key("channel", ("id", &model.id), ("name", &model.name))?;
        Ok(lookup::channel(cx.api, model.guild_id.value_str(), key).await?)
    }

    async fn update(
        cx: &Context<'_>,
        _prior: &ChannelModel,
        planned: &ChannelModel,
    ) -> ProviderResult<Channel> {
        let id = resolve_id(cx, planned).await?;
        Ok(cx.api.edit_channel(&id, &edit_params(planned)).await?)
    }

    async fn delete(cx: &Context<'_>, model: &ChannelModel) -> ProviderResult<()> {
        let id = resolve_id(cx, model).await?;
        Ok(cx.api.delete_channel(&id).await?)
    }

    async fn import(_cx: &Context<'_>, id: &str) -> ProviderResult<ChannelModel> {
        let (guild_id, key) = handler::guild_scoped_import(id)?;
        let mut model = ChannelModel {
            guild_id: Attr::Known(guild_id),
            ..Default::default()
        };
        match key {
            Key::Id(id) => model.id = Attr::Known(id.to_string()),
            Key::Name(name) => model.name = Attr::Known(name.to_string()),
        }
        Ok(model)
    }

    fn reconcile(channel: &Channel, target: &mut ChannelModel, prior: Option<&ChannelModel>) {
        target.id = Attr::Known(channel.id.clone());
        target.kind = Attr::Known(enums::stringify(channel.kind, &CHANNEL_TYPES));
        target.position = Attr::Known(channel.position);
        target.name = Attr::Known(channel.name.clone());
        target.topic = handler::text(channel.topic.as_deref());
        target.nsfw = Attr::Known(channel.nsfw);
        target.last_message_id = handler::text(channel.last_message_id.as_deref());
        target.bitrate = Attr::Known(channel.bitrate);
        target.user_limit = Attr::Known(channel.user_limit);
        target.rate_limit_per_user = Attr::Known(channel.rate_limit_per_user);
        target.icon = handler::text(channel.icon.as_deref());
        target.owner_id = handler::text(channel.owner_id.as_deref());
        target.application_id = handler::text(channel.application_id.as_deref());
        target.parent_id = handler::text(channel.parent_id.as_deref());
        target.last_pin_timestamp =
            Attr::Known(format::timestamp(channel.last_pin_timestamp.as_deref()));
        target.flags = Attr::Known(enums::list_stringify(channel.flags, &CHANNEL_FLAGS));
        target.applied_tags = Attr::Known(channel.applied_tags.clone());
        target.default_thread_rate_limit_per_user =
            Attr::Known(channel.default_thread_rate_limit_per_user);
        target.default_sort_order = Attr::Known(enums::stringify(
            channel.default_sort_order.unwrap_or_default(),
            &FORUM_SORT_ORDERS,
        ));
        target.default_forum_layout =
            Attr::Known(enums::stringify(channel.default_forum_layout, &FORUM_LAYOUTS));

        if let Some(prior) = prior {
            target.guild_id = prior.guild_id.clone();
        }
    }

    async fn complete(
        cx: &Context<'_>,
        channel: &Channel,
        target: &mut ChannelModel,
    ) -> ProviderResult<()> {
        let children = lookup::channel_children(cx.api, target.guild_id.value_str(), channel)
            .await
            .map_err(|e| ProviderError::from(e).in_operation("get children for", "channel"))?;
        target.children = Attr::Known(lookup::channel_names(&children));
        Ok(())
    }

    fn last_updated(model: &mut ChannelModel) -> &mut Attr<String> {
        &mut model.last_updated
    }
}
