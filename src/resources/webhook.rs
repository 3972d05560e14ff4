//! `discord_webhook`: channel webhooks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::discord::enums::{self, WEBHOOK_TYPES};
use crate::discord::types::{Webhook, WebhookCreate, WebhookEdit};
use crate::discord::{format, lookup, Key};
use crate::error::{ProviderError, ProviderResult};
use crate::handler::{self, Context, Operation, ResourceHandler};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::value::Attr;

const IMPORT_FORMAT: &str = "<channel|guild>/<channel_id|guild_id>/<name> or <id>";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookModel {
    pub id: Attr<String>,
    pub guild_id: Attr<String>,
    pub channel_id: Attr<String>,
    pub name: Attr<String>,
    pub avatar: Attr<String>,
    pub last_updated: Attr<String>,
    #[serde(rename = "type")]
    pub kind: Attr<String>,
    pub token: Attr<String>,
    pub application_id: Attr<String>,
}

pub struct WebhookResource;

#[async_trait]
impl ResourceHandler for WebhookResource {
    type Model = WebhookModel;
    type Remote = Webhook;

    const NAME: &'static str = "discord_webhook";
    const ENTITY: &'static str = "webhook";

    fn schema() -> Schema {
        let input = Attribute::optional_computed;

        Schema::v0()
            .with_description("A webhook posting into a guild channel.")
            .with_attribute("id", input(AttributeType::String).with_description("ID of the webhook."))
            .with_attribute("guild_id", input(AttributeType::String))
            .with_attribute(
                "channel_id",
                input(AttributeType::String).with_description("ID of the channel the webhook posts to."),
            )
            .with_attribute("name", input(AttributeType::String).with_description("Name of the webhook."))
            .with_attribute(
                "avatar",
                input(AttributeType::String)
                    .with_description("Avatar image data URI.")
                    .sensitive(),
            )
            .with_attribute("last_updated", Attribute::computed_string())
            .with_attribute(
                "type",
                Attribute::computed_string()
                    .with_description("incoming, channel_follower or application."),
            )
            .with_attribute(
                "token",
                Attribute::computed_string()
                    .with_description("Secure token of the webhook.")
                    .sensitive(),
            )
            .with_attribute("application_id", Attribute::computed_string())
    }

    fn required(op: Operation, model: &WebhookModel) -> Vec<(&'static str, &Attr<String>)> {
        match op {
            Operation::Create => vec![("channel_id", &model.channel_id), ("name", &model.name)],
            Operation::Update | Operation::Delete => vec![("id", &model.id)],
            Operation::Read => vec![
                ("id?", &model.id),
                ("name?", &model.name),
                ("guild_id?", &model.guild_id),
                ("channel_id?", &model.channel_id),
            ],
        }
    }

    async fn create(cx: &Context<'_>, model: &WebhookModel) -> ProviderResult<Webhook> {
        let params = WebhookCreate {
            name: model.name.value_str().to_string(),
            avatar: handler::non_empty(&model.avatar),
        };
        Ok(cx
            .api
            .create_webhook(model.channel_id.value_str(), &params)
            .await?)
    }

    async fn read(cx: &Context<'_>, model: &WebhookModel) -> ProviderResult<Webhook> {
        let key = cx.key("webhook", ("id", &model.id), ("name", &model.name))?;
        let webhook = match key {
            Key::Id(id) => lookup::webhook_by_id(cx.api, id).await?,
            Key::Name(name) => {
                if let Some(channel_id) = handler::non_empty(&model.channel_id) {
                    lookup::channel_webhook(cx.api, &channel_id, name).await?
                } else if let Some(guild_id) = handler::non_empty(&model.guild_id) {
                    lookup::guild_webhook(cx.api, &guild_id, name).await?
                } else {
                    return Err(cx.invalid_config(format!(
                        "Either the guild_id or the channel_id must be set if name is set for the webhook {}.",
                        cx.kind
                    )));
                }
            },
        };
        Ok(webhook)
    }

    async fn update(
        cx: &Context<'_>,
        _prior: &WebhookModel,
        planned: &WebhookModel,
    ) -> ProviderResult<Webhook> {
        let params = WebhookEdit {
            name: handler::non_empty(&planned.name),
            avatar: handler::non_empty(&planned.avatar),
            channel_id: handler::non_empty(&planned.channel_id),
        };
        Ok(cx.api.edit_webhook(planned.id.value_str(), &params).await?)
    }

    async fn delete(cx: &Context<'_>, model: &WebhookModel) -> ProviderResult<()> {
        Ok(cx.api.delete_webhook(model.id.value_str()).await?)
    }

    async fn import(cx: &Context<'_>, id: &str) -> ProviderResult<WebhookModel> {
        let known = |s: &str| Attr::Known(s.to_string());
        let parts: Vec<&str> = id.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(handler::import_error(IMPORT_FORMAT, id));
        }

        let model = match parts[..] {
            [webhook_id] => WebhookModel {
                id: known(webhook_id),
                ..Default::default()
            },
            ["guild", guild_id, name] => WebhookModel {
                guild_id: known(guild_id),
                name: known(name),
                ..Default::default()
            },
            ["channel", channel_id, name] if format::is_snowflake(channel_id) => WebhookModel {
                channel_id: known(channel_id),
                name: known(name),
                ..Default::default()
            },
            ["channel", guild_id, channel_name, name] => {
                let channel = lookup::channel(cx.api, guild_id, Key::Name(channel_name))
                    .await
                    .map_err(|e| ProviderError::from(e).in_operation("import", "state"))?;
                WebhookModel {
                    guild_id: known(guild_id),
                    channel_id: Attr::Known(channel.id),
                    name: known(name),
                    ..Default::default()
                }
            },
            _ => return Err(handler::import_error(IMPORT_FORMAT, id)),
        };
        Ok(model)
    }

    fn reconcile(webhook: &Webhook, target: &mut WebhookModel, prior: Option<&WebhookModel>) {
        target.id = Attr::Known(webhook.id.clone());
        target.kind = Attr::Known(enums::stringify(webhook.kind, &WEBHOOK_TYPES).to_lowercase());
        target.name = handler::text(webhook.name.as_deref());
        target.token = handler::text(webhook.token.as_deref());
        target.application_id = handler::text(webhook.application_id.as_deref());
        target.guild_id = handler::text(webhook.guild_id.as_deref());
        target.channel_id = handler::text(webhook.channel_id.as_deref());

        // Discord returns an avatar hash, never the data the user wrote.
        match prior {
            Some(prior) => target.avatar = prior.avatar.clone(),
            None if target.avatar.is_unknown() => target.avatar = Attr::Null,
            None => {},
        }
    }

    fn last_updated(model: &mut WebhookModel) -> &mut Attr<String> {
        &mut model.last_updated
    }

    fn read_models(state: &WebhookModel) -> (WebhookModel, Option<&WebhookModel>) {
        (state.clone(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::fake::FakeDiscord;
    use crate::handler::{create, delete, import, read, read_data_source, update};
    use serde_json::{json, Value};
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_lifecycle() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let channel = fake.add_channel(&guild, "alerts", 0, None);

        let state = assert_ok!(
            create::<WebhookResource>(
                &fake,
                json!({"channel_id": channel, "name": "deploys", "avatar": "data:image/png;base64,AAAA"}),
            )
            .await
        );
        assert_eq!(state["type"], "incoming");
        assert_eq!(state["guild_id"], json!(guild));
        assert_eq!(state["avatar"], "data:image/png;base64,AAAA");
        let id = state["id"].as_str().unwrap().to_string();
        assert_eq!(state["token"], json!(format!("token-{id}")));

        let refreshed = assert_ok!(read::<WebhookResource>(&fake, state.clone()).await);
        assert_eq!(refreshed, state);

        let mut planned = state.clone();
        planned["name"] = json!("releases");
        let updated = assert_ok!(update::<WebhookResource>(&fake, state, planned).await);
        assert_eq!(updated["name"], "releases");
        assert_eq!(fake.webhook(&id).unwrap().name.as_deref(), Some("releases"));

        assert_ok!(delete::<WebhookResource>(&fake, updated).await);
        assert!(fake.webhook(&id).is_none());
    }

    #[tokio::test]
    async fn test_create_without_avatar_leaves_it_null() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let channel = fake.add_channel(&guild, "alerts", 0, None);
        let state = assert_ok!(
            create::<WebhookResource>(
                &fake,
                json!({"channel_id": channel, "name": "deploys", "avatar": crate::value::UNKNOWN_SENTINEL}),
            )
            .await
        );
        assert_eq!(state["avatar"], Value::Null);
    }

    #[tokio::test]
    async fn test_read_by_name_needs_a_parent() {
        let fake = FakeDiscord::new();
        let err = assert_err!(
            read_data_source::<WebhookResource>(&fake, json!({"name": "deploys"})).await
        );
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics[0].summary, "Invalid Data Source Configuration");
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("Either the guild_id or the channel_id must be set if name is set for the webhook data source.")
        );
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_by_guild_and_name() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let channel = fake.add_channel(&guild, "alerts", 0, None);
        let created = assert_ok!(
            create::<WebhookResource>(&fake, json!({"channel_id": channel, "name": "deploys"})).await
        );

        let value = assert_ok!(
            read_data_source::<WebhookResource>(&fake, json!({"guild_id": guild, "name": "deploys"}))
                .await
        );
        assert_eq!(value["id"], created["id"]);
        assert_eq!(value["channel_id"], json!(channel));
        assert!(value.get("last_updated").is_none());
    }

    #[tokio::test]
    async fn test_import_forms() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let channel = fake.add_channel(&guild, "alerts", 0, None);

        let imported = assert_ok!(import::<WebhookResource>(&fake, "333333333333333333").await);
        assert_eq!(imported[0].state["id"], "333333333333333333");

        let imported = assert_ok!(import::<WebhookResource>(&fake, &format!("guild/{guild}/deploys")).await);
        assert_eq!(imported[0].state["guild_id"], json!(guild));
        assert_eq!(imported[0].state["name"], "deploys");

        let imported =
            assert_ok!(import::<WebhookResource>(&fake, &format!("channel/{channel}/deploys")).await);
        assert_eq!(imported[0].state["channel_id"], json!(channel));

        let imported =
            assert_ok!(import::<WebhookResource>(&fake, &format!("channel/{guild}/alerts/deploys")).await);
        assert_eq!(imported[0].state["channel_id"], json!(channel));
        assert_eq!(imported[0].state["guild_id"], json!(guild));

        let err = assert_err!(import::<WebhookResource>(&fake, &format!("channel/{guild}/missing/deploys")).await);
        assert_eq!(err.diagnostics()[0].summary, "Failed to import state");

        for bad in ["user/1/name", "guild//name", "a/b"] {
            let err = assert_err!(import::<WebhookResource>(&fake, bad).await);
            assert_eq!(err.diagnostics()[0].summary, "Unexpected Import Identifier");
        }
    }
}
