//! `discord_permissions`: a role or member overwrite on a channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::discord::enums::{self, OVERWRITE_TYPES, PERMISSIONS};
use crate::discord::types::{OverwriteParams, PermissionOverwrite};
use crate::discord::{lookup, DiscordError};
use crate::error::ProviderResult;
use crate::handler::{self, Context, Operation, ResourceHandler};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::value::Attr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsModel {
    pub guild_id: Attr<String>,
    pub channel_id: Attr<String>,
    pub id: Attr<String>,
    #[serde(rename = "type")]
    pub kind: Attr<String>,
    pub allow: Attr<Vec<String>>,
    pub deny: Attr<Vec<String>>,
    pub last_updated: Attr<String>,
}

pub struct PermissionsResource;

fn sorted(list: &Attr<Vec<String>>) -> Vec<String> {
    let mut names = list.known().cloned().unwrap_or_default();
    names.sort();
    names
}

/// Writes the overwrite and reads it back from the channel.
async fn apply(cx: &Context<'_>, model: &PermissionsModel) -> ProviderResult<PermissionOverwrite> {
    let kind = model.kind.value_str();
    let params = OverwriteParams {
        kind: lookup::overwrite_type(kind)?,
        allow: enums::calc_permissions(&sorted(&model.allow)),
        deny: enums::calc_permissions(&sorted(&model.deny)),
    };
    let channel_id = model.channel_id.value_str();
    let id = model.id.value_str();

    cx.api
        .edit_channel_permissions(channel_id, id, &params)
        .await?;
    Ok(lookup::overwrite(cx.api, model.guild_id.value_str(), channel_id, id, kind).await?)
}

fn fill_unset(target: &mut Attr<Vec<String>>, bits: u64) {
    handler::fill_list(target, enums::list_stringify(bits, &PERMISSIONS));
}

#[async_trait]
impl ResourceHandler for PermissionsResource {
    type Model = PermissionsModel;
    type Remote = PermissionOverwrite;

    const NAME: &'static str = "discord_permissions";
    const ENTITY: &'static str = "permissions";

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A permission overwrite for a role or member on a channel.")
            .with_attribute("guild_id", Attribute::required_string())
            .with_attribute("channel_id", Attribute::required_string())
            .with_attribute(
                "id",
                Attribute::required_string().with_description("ID of the role or member."),
            )
            .with_attribute(
                "type",
                Attribute::required_string().with_description("Either role or member."),
            )
            .with_attribute(
                "allow",
                Attribute::optional_computed(AttributeType::string_list())
                    .with_description("Permission names explicitly allowed."),
            )
            .with_attribute(
                "deny",
                Attribute::optional_computed(AttributeType::string_list())
                    .with_description("Permission names explicitly denied."),
            )
            .with_attribute("last_updated", Attribute::computed_string())
    }

    fn required(_op: Operation, model: &PermissionsModel) -> Vec<(&'static str, &Attr<String>)> {
        vec![
            ("guild_id", &model.guild_id),
            ("channel_id", &model.channel_id),
            ("id", &model.id),
            ("type", &model.kind),
        ]
    }

    async fn create(cx: &Context<'_>, model: &PermissionsModel) -> ProviderResult<PermissionOverwrite> {
        apply(cx, model).await
    }

    async fn read(cx: &Context<'_>, model: &PermissionsModel) -> ProviderResult<PermissionOverwrite> {
        Ok(lookup::overwrite(
            cx.api,
            model.guild_id.value_str(),
            model.channel_id.value_str(),
            model.id.value_str(),
            model.kind.value_str(),
        )
        .await?)
    }

    async fn update(
        cx: &Context<'_>,
        _prior: &PermissionsModel,
        planned: &PermissionsModel,
    ) -> ProviderResult<PermissionOverwrite> {
        apply(cx, planned).await
    }

    async fn delete(cx: &Context<'_>, model: &PermissionsModel) -> ProviderResult<()> {
        Ok(cx
            .api
            .delete_channel_permission(model.channel_id.value_str(), model.id.value_str())
            .await?)
    }

    async fn import(_cx: &Context<'_>, id: &str) -> ProviderResult<PermissionsModel> {
        match id.split('/').collect::<Vec<_>>()[..] {
            [guild_id, channel_id, kind, target]
                if [guild_id, channel_id, kind, target].iter().all(|p| !p.is_empty()) =>
            {
                Ok(PermissionsModel {
                    guild_id: Attr::Known(guild_id.to_string()),
                    channel_id: Attr::Known(channel_id.to_string()),
                    kind: Attr::Known(kind.to_string()),
                    id: Attr::Known(target.to_string()),
                    ..Default::default()
                })
            },
            _ => Err(handler::import_error(
                "<guild_id>/<channel_id>/<type>/<id>",
                id,
            )),
        }
    }

    fn reconcile(
        overwrite: &PermissionOverwrite,
        target: &mut PermissionsModel,
        prior: Option<&PermissionsModel>,
    ) {
        target.id = Attr::Known(overwrite.id.clone());
        target.kind = Attr::Known(enums::stringify(overwrite.kind, &OVERWRITE_TYPES).to_lowercase());
        fill_unset(&mut target.allow, overwrite.allow);
        fill_unset(&mut target.deny, overwrite.deny);

        if let Some(prior) = prior {
            handler::prefer_prior(&mut target.allow, Some(&prior.allow).filter(|a| a.known().is_some()));
            handler::prefer_prior(&mut target.deny, Some(&prior.deny).filter(|d| d.known().is_some()));
            target.guild_id = prior.guild_id.clone();
            target.channel_id = prior.channel_id.clone();
        }
    }

    fn last_updated(model: &mut PermissionsModel) -> &mut Attr<String> {
        &mut model.last_updated
    }

    /// Starts from the stored state, which already carries the parent IDs.
    fn read_models(state: &PermissionsModel) -> (PermissionsModel, Option<&PermissionsModel>) {
        (state.clone(), None)
    }

    fn is_gone(err: &DiscordError) -> bool {
        matches!(err, DiscordError::OverwriteNotFound { .. })
    }
}
