//! In-memory [`DiscordApi`] for handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::DiscordApi;
use super::error::{DiscordError, DiscordResult};
use super::types::{
    Channel, ChannelCreate, ChannelEdit, Guild, Member, OverwriteParams, PermissionOverwrite, Role,
    RoleParams, User, UserGuild, Webhook, WebhookCreate, WebhookEdit,
};

#[derive(Default)]
struct State {
    next_id: u64,
    guilds: Vec<Guild>,
    channels: Vec<Channel>,
    roles: HashMap<String, Vec<Role>>,
    members: HashMap<String, Vec<Member>>,
    webhooks: Vec<Webhook>,
    calls: Vec<String>,
}

impl State {
    fn snowflake(&mut self) -> String {
        self.next_id += 1;
        format!("{}", 900_000_000_000_000_000 + self.next_id)
    }
}

fn unknown(code: i64, what: &str) -> DiscordError {
    DiscordError::Api {
        status: 404,
        code,
        message: format!("Unknown {what}"),
    }
}

/// A Discord guild held in memory. Every call is recorded.
#[derive(Default)]
pub struct FakeDiscord {
    state: Mutex<State>,
}

impl FakeDiscord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a guild and returns its ID.
    pub fn add_guild(&self, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.snowflake();
        state.guilds.push(Guild {
            id: id.clone(),
            name: name.to_string(),
            preferred_locale: "en-US".to_string(),
            ..Default::default()
        });
        state.roles.insert(id.clone(), Vec::new());
        state.members.insert(id.clone(), Vec::new());
        id
    }

    pub fn update_guild(&self, guild_id: &str, edit: impl FnOnce(&mut Guild)) {
        let mut state = self.state.lock().unwrap();
        if let Some(guild) = state.guilds.iter_mut().find(|g| g.id == guild_id) {
            edit(guild);
        }
    }

    /// Adds a channel directly, bypassing the API.
    pub fn add_channel(&self, guild_id: &str, name: &str, kind: i64, parent_id: Option<&str>) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.snowflake();
        let position = state.channels.len() as i64;
        state.channels.push(Channel {
            id: id.clone(),
            kind,
            guild_id: Some(guild_id.to_string()),
            name: name.to_string(),
            position,
            parent_id: parent_id.map(str::to_string),
            ..Default::default()
        });
        id
    }

    pub fn update_channel(&self, channel_id: &str, edit: impl FnOnce(&mut Channel)) {
        let mut state = self.state.lock().unwrap();
        if let Some(channel) = state.channels.iter_mut().find(|c| c.id == channel_id) {
            edit(channel);
        }
    }

    pub fn channel(&self, channel_id: &str) -> Option<Channel> {
        let state = self.state.lock().unwrap();
        state.channels.iter().find(|c| c.id == channel_id).cloned()
    }

    pub fn add_role(&self, guild_id: &str, name: &str, position: i64, permissions: u64) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.snowflake();
        state.roles.entry(guild_id.to_string()).or_default().push(Role {
            id: id.clone(),
            name: name.to_string(),
            position,
            permissions,
            ..Default::default()
        });
        id
    }

    pub fn role(&self, guild_id: &str, role_id: &str) -> Option<Role> {
        let state = self.state.lock().unwrap();
        state
            .roles
            .get(guild_id)
            .and_then(|roles| roles.iter().find(|r| r.id == role_id).cloned())
    }

    pub fn add_member(&self, guild_id: &str, username: &str, roles: &[&str]) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.snowflake();
        state.members.entry(guild_id.to_string()).or_default().push(Member {
            user: User {
                id: id.clone(),
                username: username.to_string(),
                discriminator: "0".to_string(),
                ..Default::default()
            },
            roles: roles.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        });
        id
    }

    pub fn update_member(&self, guild_id: &str, user_id: &str, edit: impl FnOnce(&mut Member)) {
        let mut state = self.state.lock().unwrap();
        if let Some(member) = state
            .members
            .get_mut(guild_id)
            .and_then(|members| members.iter_mut().find(|m| m.user.id == user_id))
        {
            edit(member);
        }
    }

    pub fn member_roles(&self, guild_id: &str, user_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .members
            .get(guild_id)
            .and_then(|members| members.iter().find(|m| m.user.id == user_id))
            .map(|m| m.roles.clone())
            .unwrap_or_default()
    }

    pub fn webhook(&self, webhook_id: &str) -> Option<Webhook> {
        let state = self.state.lock().unwrap();
        state.webhooks.iter().find(|w| w.id == webhook_id).cloned()
    }

    /// Calls made so far, as `METHOD /path` strings.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

#[async_trait]
impl DiscordApi for FakeDiscord {
    async fn get_guild(&self, guild_id: &str) -> DiscordResult<Guild> {
        let state = self.record(format!("GET /guilds/{guild_id}"));
        state
            .guilds
            .iter()
            .find(|g| g.id == guild_id)
            .cloned()
            .ok_or_else(|| unknown(10004, "Guild"))
    }

    async fn current_user_guilds(&self) -> DiscordResult<Vec<UserGuild>> {
        let state = self.record("GET /users/@me/guilds".to_string());
        Ok(state
            .guilds
            .iter()
            .map(|g| UserGuild {
                id: g.id.clone(),
                name: g.name.clone(),
            })
            .collect())
    }

    async fn get_channel(&self, channel_id: &str) -> DiscordResult<Channel> {
        let state = self.record(format!("GET /channels/{channel_id}"));
        state
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .cloned()
            .ok_or_else(|| unknown(10003, "Channel"))
    }

    async fn guild_channels(&self, guild_id: &str) -> DiscordResult<Vec<Channel>> {
        let state = self.record(format!("GET /guilds/{guild_id}/channels"));
        Ok(state
            .channels
            .iter()
            .filter(|c| c.guild_id.as_deref() == Some(guild_id))
            .cloned()
            .collect())
    }

    async fn create_channel(
        &self,
        guild_id: &str,
        params: &ChannelCreate,
    ) -> DiscordResult<Channel> {
        let mut state = self.record(format!("POST /guilds/{guild_id}/channels"));
        let id = state.snowflake();
        let channel = Channel {
            id,
            kind: params.kind,
            guild_id: Some(guild_id.to_string()),
            name: params.name.clone(),
            position: state.channels.len() as i64,
            ..Default::default()
        };
        state.channels.push(channel.clone());
        Ok(channel)
    }

    async fn edit_channel(&self, channel_id: &str, params: &ChannelEdit) -> DiscordResult<Channel> {
        let mut state = self.record(format!("PATCH /channels/{channel_id}"));
        let channel = state
            .channels
            .iter_mut()
            .find(|c| c.id == channel_id)
            .ok_or_else(|| unknown(10003, "Channel"))?;
        channel.name = params.name.clone();
        if params.parent_id.is_some() {
            channel.parent_id = params.parent_id.clone();
        }
        if params.topic.is_some() {
            channel.topic = params.topic.clone();
        }
        Ok(channel.clone())
    }

    async fn delete_channel(&self, channel_id: &str) -> DiscordResult<()> {
        let mut state = self.record(format!("DELETE /channels/{channel_id}"));
        let before = state.channels.len();
        state.channels.retain(|c| c.id != channel_id);
        if state.channels.len() == before {
            return Err(unknown(10003, "Channel"));
        }
        Ok(())
    }

    async fn guild_roles(&self, guild_id: &str) -> DiscordResult<Vec<Role>> {
        let state = self.record(format!("GET /guilds/{guild_id}/roles"));
        state
            .roles
            .get(guild_id)
            .cloned()
            .ok_or_else(|| unknown(10004, "Guild"))
    }

    async fn create_role(&self, guild_id: &str, params: &RoleParams) -> DiscordResult<Role> {
        let mut state = self.record(format!("POST /guilds/{guild_id}/roles"));
        let id = state.snowflake();
        let roles = state
            .roles
            .get_mut(guild_id)
            .ok_or_else(|| unknown(10004, "Guild"))?;
        let role = Role {
            id,
            name: params.name.clone(),
            permissions: params.permissions,
            color: params.color.unwrap_or_default(),
            hoist: params.hoist.unwrap_or_default(),
            mentionable: params.mentionable.unwrap_or_default(),
            unicode_emoji: params.unicode_emoji.clone(),
            icon: params.icon.clone(),
            position: roles.len() as i64 + 1,
            ..Default::default()
        };
        roles.push(role.clone());
        Ok(role)
    }

    async fn edit_role(
        &self,
        guild_id: &str,
        role_id: &str,
        params: &RoleParams,
    ) -> DiscordResult<Role> {
        let mut state = self.record(format!("PATCH /guilds/{guild_id}/roles/{role_id}"));
        let role = state
            .roles
            .get_mut(guild_id)
            .and_then(|roles| roles.iter_mut().find(|r| r.id == role_id))
            .ok_or_else(|| unknown(10011, "Role"))?;
        role.name = params.name.clone();
        role.permissions = params.permissions;
        if let Some(color) = params.color {
            role.color = color;
        }
        if let Some(hoist) = params.hoist {
            role.hoist = hoist;
        }
        if let Some(mentionable) = params.mentionable {
            role.mentionable = mentionable;
        }
        if params.unicode_emoji.is_some() {
            role.unicode_emoji = params.unicode_emoji.clone();
        }
        if params.icon.is_some() {
            role.icon = params.icon.clone();
        }
        Ok(role.clone())
    }

    async fn delete_role(&self, guild_id: &str, role_id: &str) -> DiscordResult<()> {
        let mut state = self.record(format!("DELETE /guilds/{guild_id}/roles/{role_id}"));
        let roles = state
            .roles
            .get_mut(guild_id)
            .ok_or_else(|| unknown(10004, "Guild"))?;
        let before = roles.len();
        roles.retain(|r| r.id != role_id);
        if roles.len() == before {
            return Err(unknown(10011, "Role"));
        }
        Ok(())
    }

    async fn edit_channel_permissions(
        &self,
        channel_id: &str,
        overwrite_id: &str,
        params: &OverwriteParams,
    ) -> DiscordResult<()> {
        let mut state = self.record(format!(
            "PUT /channels/{channel_id}/permissions/{overwrite_id}"
        ));
        let channel = state
            .channels
            .iter_mut()
            .find(|c| c.id == channel_id)
            .ok_or_else(|| unknown(10003, "Channel"))?;
        let overwrite = PermissionOverwrite {
            id: overwrite_id.to_string(),
            kind: params.kind,
            allow: params.allow,
            deny: params.deny,
        };
        match channel
            .permission_overwrites
            .iter_mut()
            .find(|o| o.id == overwrite_id)
        {
            Some(existing) => *existing = overwrite,
            None => channel.permission_overwrites.push(overwrite),
        }
        Ok(())
    }

    async fn delete_channel_permission(
        &self,
        channel_id: &str,
        overwrite_id: &str,
    ) -> DiscordResult<()> {
        let mut state = self.record(format!(
            "DELETE /channels/{channel_id}/permissions/{overwrite_id}"
        ));
        let channel = state
            .channels
            .iter_mut()
            .find(|c| c.id == channel_id)
            .ok_or_else(|| unknown(10003, "Channel"))?;
        channel.permission_overwrites.retain(|o| o.id != overwrite_id);
        Ok(())
    }

    async fn guild_member(&self, guild_id: &str, user_id: &str) -> DiscordResult<Member> {
        let state = self.record(format!("GET /guilds/{guild_id}/members/{user_id}"));
        state
            .members
            .get(guild_id)
            .and_then(|members| members.iter().find(|m| m.user.id == user_id))
            .cloned()
            .ok_or_else(|| unknown(10007, "Member"))
    }

    async fn guild_members(&self, guild_id: &str) -> DiscordResult<Vec<Member>> {
        let state = self.record(format!("GET /guilds/{guild_id}/members"));
        state
            .members
            .get(guild_id)
            .cloned()
            .ok_or_else(|| unknown(10004, "Guild"))
    }

    async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> DiscordResult<()> {
        let mut state = self.record(format!(
            "PUT /guilds/{guild_id}/members/{user_id}/roles/{role_id}"
        ));
        let member = state
            .members
            .get_mut(guild_id)
            .and_then(|members| members.iter_mut().find(|m| m.user.id == user_id))
            .ok_or_else(|| unknown(10007, "Member"))?;
        if !member.roles.iter().any(|r| r == role_id) {
            member.roles.push(role_id.to_string());
        }
        Ok(())
    }

    async fn remove_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> DiscordResult<()> {
        let mut state = self.record(format!(
            "DELETE /guilds/{guild_id}/members/{user_id}/roles/{role_id}"
        ));
        let member = state
            .members
            .get_mut(guild_id)
            .and_then(|members| members.iter_mut().find(|m| m.user.id == user_id))
            .ok_or_else(|| unknown(10007, "Member"))?;
        member.roles.retain(|r| r != role_id);
        Ok(())
    }

    async fn get_webhook(&self, webhook_id: &str) -> DiscordResult<Webhook> {
        let state = self.record(format!("GET /webhooks/{webhook_id}"));
        state
            .webhooks
            .iter()
            .find(|w| w.id == webhook_id)
            .cloned()
            .ok_or_else(|| unknown(10015, "Webhook"))
    }

    async fn channel_webhooks(&self, channel_id: &str) -> DiscordResult<Vec<Webhook>> {
        let state = self.record(format!("GET /channels/{channel_id}/webhooks"));
        Ok(state
            .webhooks
            .iter()
            .filter(|w| w.channel_id.as_deref() == Some(channel_id))
            .cloned()
            .collect())
    }

    async fn guild_webhooks(&self, guild_id: &str) -> DiscordResult<Vec<Webhook>> {
        let state = self.record(format!("GET /guilds/{guild_id}/webhooks"));
        Ok(state
            .webhooks
            .iter()
            .filter(|w| w.guild_id.as_deref() == Some(guild_id))
            .cloned()
            .collect())
    }

    async fn create_webhook(
        &self,
        channel_id: &str,
        params: &WebhookCreate,
    ) -> DiscordResult<Webhook> {
        let mut state = self.record(format!("POST /channels/{channel_id}/webhooks"));
        let guild_id = state
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .ok_or_else(|| unknown(10003, "Channel"))?
            .guild_id
            .clone();
        let id = state.snowflake();
        let webhook = Webhook {
            token: Some(format!("token-{id}")),
            id,
            kind: 1,
            guild_id,
            channel_id: Some(channel_id.to_string()),
            name: Some(params.name.clone()),
            avatar: params.avatar.clone(),
            application_id: None,
        };
        state.webhooks.push(webhook.clone());
        Ok(webhook)
    }

    async fn edit_webhook(&self, webhook_id: &str, params: &WebhookEdit) -> DiscordResult<Webhook> {
        let mut state = self.record(format!("PATCH /webhooks/{webhook_id}"));
        let webhook = state
            .webhooks
            .iter_mut()
            .find(|w| w.id == webhook_id)
            .ok_or_else(|| unknown(10015, "Webhook"))?;
        if params.name.is_some() {
            webhook.name = params.name.clone();
        }
        if params.avatar.is_some() {
            webhook.avatar = params.avatar.clone();
        }
        if params.channel_id.is_some() {
            webhook.channel_id = params.channel_id.clone();
        }
        Ok(webhook.clone())
    }

    async fn delete_webhook(&self, webhook_id: &str) -> DiscordResult<()> {
        let mut state = self.record(format!("DELETE /webhooks/{webhook_id}"));
        let before = state.webhooks.len();
        state.webhooks.retain(|w| w.id != webhook_id);
        if state.webhooks.len() == before {
            return Err(unknown(10015, "Webhook"));
        }
        Ok(())
    }
}
