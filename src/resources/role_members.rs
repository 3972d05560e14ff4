//! `discord_role_members`: the exact set of members holding a role.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::discord::types::{Member, Role};
use crate::discord::{lookup, Key};
use crate::error::ProviderResult;
use crate::handler::{self, Context, Operation, ResourceHandler};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::value::Attr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleMembersModel {
    pub guild_id: Attr<String>,
    pub role_id: Attr<String>,
    pub role: Attr<String>,
    pub members: Attr<Vec<String>>,
    pub last_updated: Attr<String>,
}

/// A role and the members holding it.
pub struct RoleMembership {
    role: Role,
    members: Vec<Member>,
}

pub struct RoleMembersResource;

async fn role(cx: &Context<'_>, model: &RoleMembersModel) -> ProviderResult<Role> {
    let key = cx.key("role_members", ("role_id", &model.role_id), ("role", &model.role))?;
    Ok(lookup::role(cx.api, model.guild_id.value_str(), key).await?)
}

/// Grants the role to exactly the listed usernames.
async fn apply(cx: &Context<'_>, model: &RoleMembersModel) -> ProviderResult<RoleMembership> {
    let guild_id = model.guild_id.value_str();
    let role = role(cx, model).await?;
    let usernames = model.members.known().map(Vec::as_slice).unwrap_or_default();
    let wanted = lookup::members_by_username(cx.api, guild_id, usernames).await?;
    let members = lookup::set_role_members(cx.api, guild_id, &role.id, &wanted).await?;
    Ok(RoleMembership { role, members })
}

#[async_trait]
impl ResourceHandler for RoleMembersResource {
    type Model = RoleMembersModel;
    type Remote = RoleMembership;

    const NAME: &'static str = "discord_role_members";
    const ENTITY: &'static str = "role_members";

    fn schema() -> Schema {
        Schema::v0()
            .with_description("The members holding a guild role. Members not listed lose the role.")
            .with_attribute(
                "guild_id",
                Attribute::required_string()
                    .with_description("ID of the guild.")
                    .with_force_new(),
            )
            .with_attribute(
                "role_id",
                Attribute::optional_computed(AttributeType::String).with_description("ID of the role."),
            )
            .with_attribute(
                "role",
                Attribute::optional_computed(AttributeType::String).with_description("Name of the role."),
            )
            .with_attribute(
                "members",
                Attribute::optional_computed(AttributeType::string_list())
                    .with_description("Usernames of the members holding the role."),
            )
            .with_attribute("last_updated", Attribute::computed_string())
    }

    fn required(_op: Operation, model: &RoleMembersModel) -> Vec<(&'static str, &Attr<String>)> {
        vec![
            ("guild_id", &model.guild_id),
            ("role_id?", &model.role_id),
            ("role?", &model.role),
        ]
    }

    async fn create(cx: &Context<'_>, model: &RoleMembersModel) -> ProviderResult<RoleMembership> {
        apply(cx, model).await
    }

    async fn read(cx: &Context<'_>, model: &RoleMembersModel) -> ProviderResult<RoleMembership> {
        let role = role(cx, model).await?;
        let members = lookup::members_with_role(cx.api, model.guild_id.value_str(), &role.id).await?;
        Ok(RoleMembership { role, members })
    }

    async fn update(
        cx: &Context<'_>,
        _prior: &RoleMembersModel,
        planned: &RoleMembersModel,
    ) -> ProviderResult<RoleMembership> {
        apply(cx, planned).await
    }

    async fn delete(cx: &Context<'_>, model: &RoleMembersModel) -> ProviderResult<()> {
        let guild_id = model.guild_id.value_str();
        let role = role(cx, model).await?;
        let listed = model.members.known().cloned().unwrap_or_default();
        let holders: Vec<Member> = lookup::members_with_role(cx.api, guild_id, &role.id)
            .await?
            .into_iter()
            .filter(|m| listed.contains(&m.user.username))
            .collect();
        Ok(lookup::remove_role_members(cx.api, guild_id, &role.id, &holders).await?)
    }

    async fn import(_cx: &Context<'_>, id: &str) -> ProviderResult<RoleMembersModel> {
        let (guild_id, key) = handler::guild_scoped_import(id)?;
        let mut model = RoleMembersModel {
            guild_id: Attr::Known(guild_id),
            ..Default::default()
        };
        match key {
            Key::Id(id) => model.role_id = Attr::Known(id.to_string()),
            Key::Name(name) => model.role = Attr::Known(name.to_string()),
        }
        Ok(model)
    }

    fn reconcile(
        membership: &RoleMembership,
        target: &mut RoleMembersModel,
        prior: Option<&RoleMembersModel>,
    ) {
        target.role_id = Attr::Known(membership.role.id.clone());
        target.role = Attr::Known(membership.role.name.clone());
        handler::fill_list(&mut target.members, lookup::member_names(&membership.members));

        if let Some(prior) = prior {
            handler::prefer_prior(&mut target.members, Some(&prior.members));
            target.guild_id = prior.guild_id.clone();
        }
    }

    fn last_updated(model: &mut RoleMembersModel) -> &mut Attr<String> {
        &mut model.last_updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::fake::FakeDiscord;
    use crate::handler::{create, delete, import, read, read_data_source};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_create_sets_exact_membership() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let role = fake.add_role(&guild, "mods", 1, 0);
        let alice = fake.add_member(&guild, "alice", &[]);
        let bob = fake.add_member(&guild, "bob", &[role.as_str()]);
        let carol = fake.add_member(&guild, "carol", &[]);

        let state = assert_ok!(
            create::<RoleMembersResource>(
                &fake,
                json!({"guild_id": guild, "role": "mods", "members": ["carol", "alice"]}),
            )
            .await
        );
        assert_eq!(state["members"], json!(["carol", "alice"]));
        assert_eq!(state["role_id"], json!(role));

        assert_eq!(fake.member_roles(&guild, &alice), vec![role.clone()]);
        assert!(fake.member_roles(&guild, &bob).is_empty());
        assert_eq!(fake.member_roles(&guild, &carol), vec![role.clone()]);
    }

    #[tokio::test]
    async fn test_read_sorts_members() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let role = fake.add_role(&guild, "mods", 1, 0);
        fake.add_member(&guild, "zed", &[role.as_str()]);
        fake.add_member(&guild, "amy", &[role.as_str()]);
        fake.add_member(&guild, "other", &[]);

        let value = assert_ok!(
            read_data_source::<RoleMembersResource>(&fake, json!({"guild_id": guild, "role_id": role}))
                .await
        );
        assert_eq!(value["members"], json!(["amy", "zed"]));
        assert_eq!(value["role"], "mods");

        let state = assert_ok!(
            read::<RoleMembersResource>(
                &fake,
                json!({"guild_id": guild, "role_id": role, "members": ["zed", "amy"]}),
            )
            .await
        );
        assert_eq!(state["members"], json!(["zed", "amy"]));
    }

    #[tokio::test]
    async fn test_unknown_username_fails() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        fake.add_role(&guild, "mods", 1, 0);
        let err = assert_err!(
            create::<RoleMembersResource>(
                &fake,
                json!({"guild_id": guild, "role": "mods", "members": ["nobody"]}),
            )
            .await
        );
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics[0].summary, "Failed to create role_members");
        assert_eq!(diagnostics[0].detail.as_deref(), Some("member not found: nobody"));
    }

    #[tokio::test]
    async fn test_delete_removes_listed_members() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let role = fake.add_role(&guild, "mods", 1, 0);
        let alice = fake.add_member(&guild, "alice", &[role.as_str()]);
        let bob = fake.add_member(&guild, "bob", &[role.as_str()]);

        assert_ok!(
            delete::<RoleMembersResource>(
                &fake,
                json!({"guild_id": guild, "role_id": role, "members": ["alice"]}),
            )
            .await
        );
        assert!(fake.member_roles(&guild, &alice).is_empty());
        assert_eq!(fake.member_roles(&guild, &bob), vec![role]);
    }

    #[tokio::test]
    async fn test_missing_role_reference() {
        let fake = FakeDiscord::new();
        let err = assert_err!(create::<RoleMembersResource>(&fake, json!({"guild_id": "1"})).await);
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics[0].summary, "all optional fields are null");
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("At least one field must be set for the role_members resource from role_id, role")
        );
    }

    #[tokio::test]
    async fn test_import_seeds_role() {
        let fake = FakeDiscord::new();
        let imported =
            assert_ok!(import::<RoleMembersResource>(&fake, "111111111111111111/222222222222222222").await);
        assert_eq!(imported[0].state["role_id"], "222222222222222222");

        let imported = assert_ok!(import::<RoleMembersResource>(&fake, "111111111111111111/mods").await);
        assert_eq!(imported[0].state["role"], "mods");
    }
}
