//! Entity lookups by ID or name.
//!
//! Each lookup makes one list or get call and returns the first match.
//! Names are not unique in Discord; the first entity with a matching name wins.

use tracing::debug;

use super::client::DiscordApi;
use super::enums::{
    CHANNEL_TYPE_ANNOUNCEMENT_THREAD, CHANNEL_TYPE_GUILD_CATEGORY, CHANNEL_TYPE_PRIVATE_THREAD,
    CHANNEL_TYPE_PUBLIC_THREAD,
};
use super::error::{DiscordError, DiscordResult};
use super::types::{Channel, Guild, Member, PermissionOverwrite, Role, Webhook};

/// How a handler addresses an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    /// By snowflake.
    Id(&'a str),
    /// By display name.
    Name(&'a str),
}

impl<'a> Key<'a> {
    /// Prefers a non-empty ID over a non-empty name.
    pub fn pick(id: Option<&'a str>, name: Option<&'a str>) -> Option<Self> {
        let non_empty = |s: &&str| !s.is_empty();
        id.filter(non_empty)
            .map(Key::Id)
            .or_else(|| name.filter(non_empty).map(Key::Name))
    }
}

pub async fn guild(api: &dyn DiscordApi, key: Key<'_>) -> DiscordResult<Guild> {
    match key {
        Key::Id(id) => api.get_guild(id).await,
        Key::Name(name) => {
            let guilds = api.current_user_guilds().await?;
            let found = guilds
                .into_iter()
                .find(|g| g.name == name)
                .ok_or_else(|| DiscordError::not_found("guild", name))?;
            api.get_guild(&found.id).await
        },
    }
}

pub async fn channel(api: &dyn DiscordApi, guild_id: &str, key: Key<'_>) -> DiscordResult<Channel> {
    match key {
        Key::Id(id) => api.get_channel(id).await,
        Key::Name(name) => api
            .guild_channels(guild_id)
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DiscordError::not_found("channel", name)),
    }
}

/// Channels parented to `channel`. Only categories and threads have children.
pub async fn channel_children(
    api: &dyn DiscordApi,
    guild_id: &str,
    channel: &Channel,
) -> DiscordResult<Vec<Channel>> {
    let parents = [
        CHANNEL_TYPE_GUILD_CATEGORY,
        CHANNEL_TYPE_ANNOUNCEMENT_THREAD,
        CHANNEL_TYPE_PUBLIC_THREAD,
        CHANNEL_TYPE_PRIVATE_THREAD,
    ];
    if !parents.contains(&channel.kind) {
        return Ok(Vec::new());
    }

    let channels = api.guild_channels(guild_id).await?;
    Ok(channels
        .into_iter()
        .filter(|c| c.parent_id.as_deref() == Some(channel.id.as_str()))
        .collect())
}

/// Sorted channel names.
pub fn channel_names(channels: &[Channel]) -> Vec<String> {
    let mut names: Vec<String> = channels.iter().map(|c| c.name.clone()).collect();
    names.sort();
    names
}

pub async fn role(api: &dyn DiscordApi, guild_id: &str, key: Key<'_>) -> DiscordResult<Role> {
    let roles = api.guild_roles(guild_id).await?;
    let found = match key {
        Key::Id(id) => roles.into_iter().find(|r| r.id == id),
        Key::Name(name) => roles.into_iter().find(|r| r.name == name),
    };
    found.ok_or_else(|| match key {
        Key::Id(key) | Key::Name(key) => DiscordError::not_found("role", key),
    })
}

/// Names of the given role IDs, ordered by role position.
pub async fn role_names_by_position(
    api: &dyn DiscordApi,
    guild_id: &str,
    role_ids: &[String],
) -> DiscordResult<Vec<String>> {
    let mut roles: Vec<Role> = api
        .guild_roles(guild_id)
        .await?
        .into_iter()
        .filter(|r| role_ids.contains(&r.id))
        .collect();
    roles.sort_by_key(|r| r.position);
    Ok(roles.into_iter().map(|r| r.name).collect())
}

pub async fn member(api: &dyn DiscordApi, guild_id: &str, key: Key<'_>) -> DiscordResult<Member> {
    match key {
        Key::Id(id) => api.guild_member(guild_id, id).await,
        Key::Name(username) => api
            .guild_members(guild_id)
            .await?
            .into_iter()
            .find(|m| m.user.username == username)
            .ok_or_else(|| DiscordError::not_found("member", username)),
    }
}

/// Resolves every username with a single member listing.
pub async fn members_by_username<S: AsRef<str>>(
    api: &dyn DiscordApi,
    guild_id: &str,
    usernames: &[S],
) -> DiscordResult<Vec<Member>> {
    let members = api.guild_members(guild_id).await?;
    usernames
        .iter()
        .map(|username| {
            let username = username.as_ref();
            members
                .iter()
                .find(|m| m.user.username == username)
                .cloned()
                .ok_or_else(|| DiscordError::not_found("member", username))
        })
        .collect()
}

pub async fn members_with_role(
    api: &dyn DiscordApi,
    guild_id: &str,
    role_id: &str,
) -> DiscordResult<Vec<Member>> {
    Ok(api
        .guild_members(guild_id)
        .await?
        .into_iter()
        .filter(|m| m.roles.iter().any(|r| r == role_id))
        .collect())
}

/// Sorted usernames.
pub fn member_names(members: &[Member]) -> Vec<String> {
    let mut names: Vec<String> = members.iter().map(|m| m.user.username.clone()).collect();
    names.sort();
    names
}

/// Makes `wanted` the exact set of members holding the role.
///
/// Returns the members holding the role afterwards.
pub async fn set_role_members(
    api: &dyn DiscordApi,
    guild_id: &str,
    role_id: &str,
    wanted: &[Member],
) -> DiscordResult<Vec<Member>> {
    let current = members_with_role(api, guild_id, role_id).await?;

    for member in wanted {
        if !current.iter().any(|m| m.user.id == member.user.id) {
            debug!(user_id = %member.user.id, role_id, "Adding role to member");
            api.add_member_role(guild_id, &member.user.id, role_id).await?;
        }
    }
    for member in &current {
        if !wanted.iter().any(|m| m.user.id == member.user.id) {
            debug!(user_id = %member.user.id, role_id, "Removing role from member");
            api.remove_member_role(guild_id, &member.user.id, role_id)
                .await?;
        }
    }

    members_with_role(api, guild_id, role_id).await
}

pub async fn remove_role_members(
    api: &dyn DiscordApi,
    guild_id: &str,
    role_id: &str,
    members: &[Member],
) -> DiscordResult<()> {
    for member in members {
        api.remove_member_role(guild_id, &member.user.id, role_id)
            .await?;
    }
    Ok(())
}

/// Discord's overwrite type for `role` or `member`.
pub fn overwrite_type(kind: &str) -> DiscordResult<i64> {
    match kind {
        "role" => Ok(0),
        "member" => Ok(1),
        other => Err(DiscordError::InvalidPermissionType(other.to_string())),
    }
}

/// The overwrite for `id` on a channel, read from the channel itself.
pub async fn overwrite(
    api: &dyn DiscordApi,
    guild_id: &str,
    channel_id: &str,
    id: &str,
    kind: &str,
) -> DiscordResult<PermissionOverwrite> {
    let channel = api
        .get_channel(channel_id)
        .await
        .map_err(|source| DiscordError::ChannelFetch {
            guild_id: guild_id.to_string(),
            id: channel_id.to_string(),
            source: Box::new(source),
        })?;
    let kind_value = overwrite_type(kind)?;

    channel
        .permission_overwrites
        .into_iter()
        .find(|o| o.kind == kind_value && o.id == id)
        .ok_or_else(|| DiscordError::OverwriteNotFound {
            id: id.to_string(),
            kind: kind.to_string(),
        })
}

pub async fn webhook_by_id(api: &dyn DiscordApi, id: &str) -> DiscordResult<Webhook> {
    api.get_webhook(id).await
}

pub async fn channel_webhook(
    api: &dyn DiscordApi,
    channel_id: &str,
    name: &str,
) -> DiscordResult<Webhook> {
    api.channel_webhooks(channel_id)
        .await?
        .into_iter()
        .find(|w| w.name.as_deref() == Some(name))
        .ok_or_else(|| DiscordError::not_found("webhook", name))
}

pub async fn guild_webhook(
    api: &dyn DiscordApi,
    guild_id: &str,
    name: &str,
) -> DiscordResult<Webhook> {
    api.guild_webhooks(guild_id)
        .await?
        .into_iter()
        .find(|w| w.name.as_deref() == Some(name))
        .ok_or_else(|| DiscordError::not_found("webhook", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::fake::FakeDiscord;
    use crate::discord::types::OverwriteParams;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_key_pick() {
        assert_eq!(Key::pick(Some("1"), Some("a")), Some(Key::Id("1")));
        assert_eq!(Key::pick(Some(""), Some("a")), Some(Key::Name("a")));
        assert_eq!(Key::pick(None, Some("")), None);
        assert_eq!(Key::pick(None, None), None);
    }

    #[tokio::test]
    async fn test_channel_by_name_and_children() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let category = fake.add_channel(&guild, "text", CHANNEL_TYPE_GUILD_CATEGORY, None);
        fake.add_channel(&guild, "zeta", 0, Some(&category));
        fake.add_channel(&guild, "alpha", 0, Some(&category));
        let loose = fake.add_channel(&guild, "general", 0, None);

        let found = assert_ok!(channel(&fake, &guild, Key::Name("text")).await);
        assert_eq!(found.id, category);

        let children = assert_ok!(channel_children(&fake, &guild, &found).await);
        assert_eq!(channel_names(&children), vec!["alpha", "zeta"]);

        let general = assert_ok!(channel(&fake, &guild, Key::Id(&loose)).await);
        let calls_before = fake.calls().len();
        assert!(assert_ok!(channel_children(&fake, &guild, &general).await).is_empty());
        assert_eq!(fake.calls().len(), calls_before);

        let err = assert_err!(channel(&fake, &guild, Key::Name("missing")).await);
        assert_eq!(err.to_string(), "channel not found: missing");
    }

    #[tokio::test]
    async fn test_role_lookup_and_position_order() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let high = fake.add_role(&guild, "admins", 5, 8);
        let low = fake.add_role(&guild, "members", 1, 0);

        let found = assert_ok!(role(&fake, &guild, Key::Name("admins")).await);
        assert_eq!(found.id, high);

        let names = assert_ok!(
            role_names_by_position(&fake, &guild, &[high.clone(), low.clone()]).await
        );
        assert_eq!(names, vec!["members", "admins"]);

        let err = assert_err!(role(&fake, &guild, Key::Name("mods")).await);
        assert_eq!(err.to_string(), "role not found: mods");
    }

    #[tokio::test]
    async fn test_guild_by_name_fetches_full_guild() {
        let fake = FakeDiscord::new();
        let id = fake.add_guild("home");
        let found = assert_ok!(guild(&fake, Key::Name("home")).await);
        assert_eq!(found.id, id);
        assert_eq!(found.preferred_locale, "en-US");
        assert!(fake.calls().contains(&format!("GET /guilds/{id}")));
        assert_err!(guild(&fake, Key::Name("away")).await);
    }

    #[tokio::test]
    async fn test_set_role_members() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let role_id = fake.add_role(&guild, "crew", 1, 0);
        let alice = fake.add_member(&guild, "alice", &[]);
        let bob = fake.add_member(&guild, "bob", &[&role_id]);

        let wanted = assert_ok!(members_by_username(&fake, &guild, &["alice"]).await);
        let holders = assert_ok!(set_role_members(&fake, &guild, &role_id, &wanted).await);

        assert_eq!(member_names(&holders), vec!["alice"]);
        assert_eq!(fake.member_roles(&guild, &alice), vec![role_id.clone()]);
        assert!(fake.member_roles(&guild, &bob).is_empty());

        let err = assert_err!(members_by_username(&fake, &guild, &["carol"]).await);
        assert_eq!(err.to_string(), "member not found: carol");
    }

    #[tokio::test]
    async fn test_overwrite_lookup() {
        let fake = FakeDiscord::new();
        let guild = fake.add_guild("test");
        let channel_id = fake.add_channel(&guild, "general", 0, None);
        let role_id = fake.add_role(&guild, "crew", 1, 0);

        let err = assert_err!(overwrite(&fake, &guild, &channel_id, &role_id, "role").await);
        assert!(matches!(err, DiscordError::OverwriteNotFound { .. }));

        let params = OverwriteParams {
            kind: 0,
            allow: 1024,
            deny: 0,
        };
        assert_ok!(
            fake.edit_channel_permissions(&channel_id, &role_id, &params)
                .await
        );
        let found = assert_ok!(overwrite(&fake, &guild, &channel_id, &role_id, "role").await);
        assert_eq!(found.allow, 1024);

        // Same ID, wrong type.
        assert_err!(overwrite(&fake, &guild, &channel_id, &role_id, "member").await);

        let err = assert_err!(overwrite(&fake, &guild, &channel_id, &role_id, "user").await);
        assert_eq!(err.to_string(), "invalid permission type: user");

        let err = assert_err!(overwrite(&fake, &guild, "1", &role_id, "role").await);
        assert!(matches!(err, DiscordError::ChannelFetch { .. }));
    }
}
