//! `discord_role`: guild roles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::discord::enums::{self, PERMISSIONS, ROLE_FLAGS};
use crate::discord::types::{Role, RoleParams};
use crate::discord::{format, lookup, Key};
use crate::error::ProviderResult;
use crate::handler::{self, Context, Operation, ResourceHandler};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::value::Attr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleModel {
    pub guild_id: Attr<String>,
    pub id: Attr<String>,
    pub name: Attr<String>,
    pub color: Attr<String>,
    pub hoist: Attr<bool>,
    pub position: Attr<i64>,
    pub permissions: Attr<Vec<String>>,
    pub unicode_emoji: Attr<String>,
    pub mentionable: Attr<bool>,
    pub last_updated: Attr<String>,
    pub managed: Attr<bool>,
    pub icon: Attr<String>,
    pub flags: Attr<Vec<String>>,
}

pub struct RoleResource;

fn params(model: &RoleModel) -> RoleParams {
    let permissions = model.permissions.known().map(Vec::as_slice).unwrap_or_default();
    RoleParams {
        name: model.name.value_str().to_string(),
        permissions: enums::calc_permissions(permissions),
        color: handler::non_empty(&model.color).map(|c| format::parse_hex_color(&c)),
        hoist: model.hoist.known().copied(),
        mentionable: model.mentionable.known().copied(),
        unicode_emoji: handler::non_empty(&model.unicode_emoji),
        icon: None,
    }
}

async fn resolve_id(cx: &Context<'_>, model: &RoleModel) -> ProviderResult<String> {
    match cx.key("role", ("id", &model.id), ("name", &model.name))? {
        Key::Id(id) => Ok(id.to_string()),
        key @ Key::Name(_) => Ok(lookup::role(cx.api, model.guild_id.value_str(), key).await?.id),
    }
}

#[async_trait]
impl ResourceHandler for RoleResource {
    type Model = RoleModel;
    type Remote = Role;

    const NAME: &'static str = "discord_role";
    const ENTITY: &'static str = "role";

    fn schema() -> Schema {
        let input = Attribute::optional_computed;

        Schema::v0()
            .with_description("A role in a Discord guild.")
            .with_attribute(
                "guild_id",
                Attribute::required_string()
                    .with_description("ID of the guild the role belongs to.")
                    .with_force_new(),
            )
            .with_attribute("id", input(AttributeType::String).with_description("ID of the role."))
            .with_attribute("name", input(AttributeType::String).with_description("Name of the role."))
            .with_attribute(
                "color",
                input(AttributeType::String).with_description("Role color as #RRGGBB."),
            )
            .with_attribute(
                "hoist",
                input(AttributeType::Bool)
                    .with_description("Whether members are displayed separately in the sidebar."),
            )
            .with_attribute("position", input(AttributeType::Int64))
            .with_attribute(
                "permissions",
                input(AttributeType::string_list())
                    .with_description("Permission names granted by the role, e.g. MANAGE_CHANNELS."),
            )
            .with_attribute("unicode_emoji", input(AttributeType::String))
            .with_attribute(
                "mentionable",
                input(AttributeType::Bool).with_description("Whether anyone can mention the role."),
            )
            .with_attribute("last_updated", Attribute::computed_string())
            .with_attribute(
                "managed",
                Attribute::computed(AttributeType::Bool)
                    .with_description("Whether an integration manages the role."),
            )
            .with_attribute("icon", Attribute::computed_string())
            .with_attribute("flags", Attribute::computed(AttributeType::string_list()))
    }

    fn required(op: Operation, model: &RoleModel) -> Vec<(&'static str, &Attr<String>)> {
        match op {
            Operation::Create => vec![("guild_id", &model.guild_id), ("name", &model.name)],
            _ => vec![
                ("guild_id", &model.guild_id),
                ("id?", &model.id),
                ("name?", &model.name),
            ],
        }
    }

    async fn create(cx: &Context<'_>, model: &RoleModel) -> ProviderResult<Role> {
        Ok(cx
            .api
            .create_role(model.guild_id.value_str(), &params(model))
            .await?)
    }

    async fn read(cx: &Context<'_>, model: &RoleModel) -> ProviderResult<Role> {
        let key = cx.key("role", ("id", &model.id), ("name", &model.name))?;
        Ok(lookup::role(cx.api, model.guild_id.value_str(), key).await?)
    }

    async fn update(
        cx: &Context<'_>,
        _prior: &RoleModel,
        planned: &RoleModel,
    ) -> ProviderResult<Role> {
        let id = resolve_id(cx, planned).await?;
        Ok(cx
            .api
            .edit_role(planned.guild_id.value_str(), &id, &params(planned))
            .await?)
    }

    async fn delete(cx: &Context<'_>, model: &RoleModel) -> ProviderResult<()> {
        let id = resolve_id(cx, model).await?;
        Ok(cx.api.delete_role(model.guild_id.value_str(), &id).await?)
    }

    async fn import(_cx: &Context<'_>, id: &str) -> ProviderResult<RoleModel> {
        let (guild_id, key) = handler::guild_scoped_import(id)?;
        let mut model = RoleModel {
            guild_id: Attr::Known(guild_id),
            ..Default::default()
        };
        match key {
            Key::Id(id) => model.id = Attr::Known(id.to_string()),
            Key::Name(name) => model.name = Attr::Known(name.to_string()),
        }
        Ok(model)
    }

    fn reconcile(role: &Role, target: &mut RoleModel, prior: Option<&RoleModel>) {
        target.id = Attr::Known(role.id.clone());
        target.name = Attr::Known(role.name.clone());
        target.color = Attr::Known(format::hex_color(role.color));
        target.hoist = Attr::Known(role.hoist);
        target.position = Attr::Known(role.position);
        target.managed = Attr::Known(role.managed);
        target.mentionable = Attr::Known(role.mentionable);
        target.icon = handler::text(role.icon.as_deref());
        target.unicode_emoji = handler::text(role.unicode_emoji.as_deref());
        target.flags = Attr::Known(enums::list_stringify(role.flags, &ROLE_FLAGS));
        handler::fill_list(
            &mut target.permissions,
            enums::list_stringify(role.permissions, &PERMISSIONS),
        );

        if let Some(prior) = prior {
            handler::prefer_prior(&mut target.permissions, Some(&prior.permissions));
            target.guild_id = prior.guild_id.clone();
        }
    }

    fn last_updated(model: &mut RoleModel) -> &mut Attr<String> {
        &mut model.last_updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::fake::FakeDiscord;
    use crate::handler::{create, delete, import, read, update};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_create_keeps_permission_order() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");

        let state = assert_ok!(
            create::<RoleResource>(
                &fake,
                json!({
                    "guild_id": guild,
                    "name": "mods",
                    "color": "#FF0000",
                    "hoist": true,
                    "permissions": ["SEND_MESSAGES", "KICK_MEMBERS"]
                }),
            )
            .await
        );
        assert_eq!(state["permissions"], json!(["SEND_MESSAGES", "KICK_MEMBERS"]));
        assert_eq!(state["color"], "#FF0000");
        assert_eq!(state["hoist"], true);
        assert_eq!(state["managed"], false);

        let id = state["id"].as_str().unwrap();
        let role = fake.role(&guild, id).unwrap();
        assert_eq!(role.color, 0xFF0000);
        assert_eq!(role.permissions, (1 << 1) | (1 << 11));
    }

    #[tokio::test]
    async fn test_read_fills_permissions_when_prior_is_null() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        fake.add_role(&guild, "admins", 3, (1 << 3) | (1 << 1));

        let state = assert_ok!(
            read::<RoleResource>(&fake, json!({"guild_id": guild, "name": "admins"})).await
        );
        assert_eq!(state["permissions"], json!(["ADMINISTRATOR", "KICK_MEMBERS"]));
        assert_eq!(state["position"], 3);
        assert_eq!(state["color"], "#000000");
    }

    #[tokio::test]
    async fn test_read_keeps_prior_permissions() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let id = fake.add_role(&guild, "admins", 3, 1 << 3);

        let state = assert_ok!(
            read::<RoleResource>(
                &fake,
                json!({"guild_id": guild, "id": id, "permissions": ["KICK_MEMBERS"]}),
            )
            .await
        );
        assert_eq!(state["permissions"], json!(["KICK_MEMBERS"]));
        assert_eq!(state["name"], "admins");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let id = fake.add_role(&guild, "mods", 1, 0);

        let state = assert_ok!(
            update::<RoleResource>(
                &fake,
                json!({"guild_id": guild, "id": id, "name": "mods"}),
                json!({"guild_id": guild, "id": id, "name": "moderators", "mentionable": true}),
            )
            .await
        );
        assert_eq!(state["name"], "moderators");
        assert!(fake.role(&guild, &id).unwrap().mentionable);

        assert_ok!(delete::<RoleResource>(&fake, json!({"guild_id": guild, "id": id})).await);
        assert!(fake.role(&guild, &id).is_none());

        let err = assert_err!(
            delete::<RoleResource>(&fake, json!({"guild_id": guild, "name": "moderators"})).await
        );
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics[0].summary, "Failed to delete role");
        assert_eq!(diagnostics[0].detail.as_deref(), Some("role not found: moderators"));
    }

    #[tokio::test]
    async fn test_import_by_name() {
        let fake = FakeDiscord::new();
        let imported = assert_ok!(import::<RoleResource>(&fake, "111111111111111111/mods").await);
        assert_eq!(imported[0].resource_type, "discord_role");
        assert_eq!(imported[0].state["name"], "mods");
        assert_eq!(imported[0].state["guild_id"], "111111111111111111");
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let role = Role {
            id: "5".into(),
            name: "mods".into(),
            color: 0x00FF00,
            permissions: 1 << 10,
            ..Default::default()
        };
        let prior = RoleModel {
            guild_id: Attr::Known("1".into()),
            ..Default::default()
        };
        let mut once = RoleModel::default();
        RoleResource::reconcile(&role, &mut once, Some(&prior));
        let mut twice = once.clone();
        RoleResource::reconcile(&role, &mut twice, Some(&once));
        assert_eq!(once, twice);
        assert_eq!(once.permissions, Attr::Known(vec!["VIEW_CHANNEL".to_string()]));
        assert_eq!(once.color, Attr::Known("#00FF00".into()));
    }
}
