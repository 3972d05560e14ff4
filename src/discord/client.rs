//! Discord REST client.
//!
//! [`DiscordApi`] is the seam between handlers and the network. The provider
//! holds one `Arc<dyn DiscordApi>` created at configure time.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::error::{DiscordError, DiscordResult};
use super::types::{
    Channel, ChannelCreate, ChannelEdit, Guild, Member, OverwriteParams, Role, RoleParams,
    UserGuild, Webhook, WebhookCreate, WebhookEdit,
};
use crate::config::ClientConfig;

/// The Discord REST calls the provider makes.
#[async_trait]
pub trait DiscordApi: Send + Sync {
    /// `GET /guilds/{id}?with_counts=true`
    async fn get_guild(&self, guild_id: &str) -> DiscordResult<Guild>;
    /// `GET /users/@me/guilds?limit=100`
    async fn current_user_guilds(&self) -> DiscordResult<Vec<UserGuild>>;

    /// `GET /channels/{id}`
    async fn get_channel(&self, channel_id: &str) -> DiscordResult<Channel>;
    /// `GET /guilds/{id}/channels`
    async fn guild_channels(&self, guild_id: &str) -> DiscordResult<Vec<Channel>>;
    /// `POST /guilds/{id}/channels`
    async fn create_channel(&self, guild_id: &str, params: &ChannelCreate)
        -> DiscordResult<Channel>;
    /// `PATCH /channels/{id}`
    async fn edit_channel(&self, channel_id: &str, params: &ChannelEdit) -> DiscordResult<Channel>;
    /// `DELETE /channels/{id}`
    async fn delete_channel(&self, channel_id: &str) -> DiscordResult<()>;

    /// `GET /guilds/{id}/roles`
    async fn guild_roles(&self, guild_id: &str) -> DiscordResult<Vec<Role>>;
    /// `POST /guilds/{id}/roles`
    async fn create_role(&self, guild_id: &str, params: &RoleParams) -> DiscordResult<Role>;
    /// `PATCH /guilds/{id}/roles/{role}`
    async fn edit_role(&self, guild_id: &str, role_id: &str, params: &RoleParams)
        -> DiscordResult<Role>;
    /// `DELETE /guilds/{id}/roles/{role}`
    async fn delete_role(&self, guild_id: &str, role_id: &str) -> DiscordResult<()>;

    /// `PUT /channels/{id}/permissions/{overwrite}`
    async fn edit_channel_permissions(
        &self,
        channel_id: &str,
        overwrite_id: &str,
        params: &OverwriteParams,
    ) -> DiscordResult<()>;
    /// `DELETE /channels/{id}/permissions/{overwrite}`
    async fn delete_channel_permission(
        &self,
        channel_id: &str,
        overwrite_id: &str,
    ) -> DiscordResult<()>;

    /// `GET /guilds/{id}/members/{user}`
    async fn guild_member(&self, guild_id: &str, user_id: &str) -> DiscordResult<Member>;
    /// `GET /guilds/{id}/members?limit=1000`
    async fn guild_members(&self, guild_id: &str) -> DiscordResult<Vec<Member>>;
    /// `PUT /guilds/{id}/members/{user}/roles/{role}`
    async fn add_member_role(&self, guild_id: &str, user_id: &str, role_id: &str)
        -> DiscordResult<()>;
    /// `DELETE /guilds/{id}/members/{user}/roles/{role}`
    async fn remove_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> DiscordResult<()>;

    /// `GET /webhooks/{id}`
    async fn get_webhook(&self, webhook_id: &str) -> DiscordResult<Webhook>;
    /// `GET /channels/{id}/webhooks`
    async fn channel_webhooks(&self, channel_id: &str) -> DiscordResult<Vec<Webhook>>;
    /// `GET /guilds/{id}/webhooks`
    async fn guild_webhooks(&self, guild_id: &str) -> DiscordResult<Vec<Webhook>>;
    /// `POST /channels/{id}/webhooks`
    async fn create_webhook(&self, channel_id: &str, params: &WebhookCreate)
        -> DiscordResult<Webhook>;
    /// `PATCH /webhooks/{id}`
    async fn edit_webhook(&self, webhook_id: &str, params: &WebhookEdit) -> DiscordResult<Webhook>;
    /// `DELETE /webhooks/{id}`
    async fn delete_webhook(&self, webhook_id: &str) -> DiscordResult<()>;
}

/// Error body Discord returns on failed requests.
#[derive(Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

/// [`DiscordApi`] over HTTPS.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: Client,
    base_url: String,
    bot_token: String,
}

impl DiscordClient {
    /// Builds a client from resolved provider settings.
    pub fn new(config: &ClientConfig) -> DiscordResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("discord-provider/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let bot_token = config
            .access_token
            .strip_prefix("Bot ")
            .unwrap_or(&config.access_token)
            .to_string();

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token,
        })
    }

    /// Sends one request and returns the raw response body.
    #[instrument(skip(self, method, body), fields(method = %method))]
    async fn call<B: Serialize + Sync>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> DiscordResult<Vec<u8>> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Making Discord API request");

        let mut req = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.bot_token));
        if let Some(b) = body {
            req = req.json(b);
        }

        let response = req.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(30.0);
            warn!(retry_after, "Rate limited by Discord");
            return Err(DiscordError::RateLimited { retry_after });
        }

        let bytes = response.bytes().await?;
        if status.is_success() {
            return Ok(bytes.to_vec());
        }

        let error: ApiErrorBody = serde_json::from_slice(&bytes).unwrap_or(ApiErrorBody {
            code: None,
            message: Some(String::from_utf8_lossy(&bytes).into_owned()),
        });
        Err(DiscordError::Api {
            status: status.as_u16(),
            code: error.code.unwrap_or(i64::from(status.as_u16())),
            message: error.message.unwrap_or_else(|| "Unknown error".into()),
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> DiscordResult<T> {
        let bytes = self.call(Method::GET, endpoint, None::<&()>).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> DiscordResult<T> {
        let bytes = self.call(method, endpoint, Some(body)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// A request whose response body is ignored, typically 204 No Content.
    async fn send_empty(&self, method: Method, endpoint: &str) -> DiscordResult<()> {
        self.call(method, endpoint, None::<&()>).await.map(|_| ())
    }
}

#[async_trait]
impl DiscordApi for DiscordClient {
    async fn get_guild(&self, guild_id: &str) -> DiscordResult<Guild> {
        self.get(&format!("/guilds/{guild_id}?with_counts=true")).await
    }

    async fn current_user_guilds(&self) -> DiscordResult<Vec<UserGuild>> {
        self.get("/users/@me/guilds?limit=100").await
    }

    async fn get_channel(&self, channel_id: &str) -> DiscordResult<Channel> {
        self.get(&format!("/channels/{channel_id}")).await
    }

    async fn guild_channels(&self, guild_id: &str) -> DiscordResult<Vec<Channel>> {
        self.get(&format!("/guilds/{guild_id}/channels")).await
    }

    async fn create_channel(
        &self,
        guild_id: &str,
        params: &ChannelCreate,
    ) -> DiscordResult<Channel> {
        self.send(Method::POST, &format!("/guilds/{guild_id}/channels"), params)
            .await
    }

    async fn edit_channel(&self, channel_id: &str, params: &ChannelEdit) -> DiscordResult<Channel> {
        self.send(Method::PATCH, &format!("/channels/{channel_id}"), params)
            .await
    }

    async fn delete_channel(&self, channel_id: &str) -> DiscordResult<()> {
        self.send_empty(Method::DELETE, &format!("/channels/{channel_id}"))
            .await
    }

    async fn guild_roles(&self, guild_id: &str) -> DiscordResult<Vec<Role>> {
        self.get(&format!("/guilds/{guild_id}/roles")).await
    }

    async fn create_role(&self, guild_id: &str, params: &RoleParams) -> DiscordResult<Role> {
        self.send(Method::POST, &format!("/guilds/{guild_id}/roles"), params)
            .await
    }

    async fn edit_role(
        &self,
        guild_id: &str,
        role_id: &str,
        params: &RoleParams,
    ) -> DiscordResult<Role> {
        self.send(
            Method::PATCH,
            &format!("/guilds/{guild_id}/roles/{role_id}"),
            params,
        )
        .await
    }

    async fn delete_role(&self, guild_id: &str, role_id: &str) -> DiscordResult<()> {
        self.send_empty(Method::DELETE, &format!("/guilds/{guild_id}/roles/{role_id}"))
            .await
    }

    async fn edit_channel_permissions(
        &self,
        channel_id: &str,
        overwrite_id: &str,
        params: &OverwriteParams,
    ) -> DiscordResult<()> {
        let endpoint = format!("/channels/{channel_id}/permissions/{overwrite_id}");
        self.call(Method::PUT, &endpoint, Some(params))
            .await
            .map(|_| ())
    }

    async fn delete_channel_permission(
        &self,
        channel_id: &str,
        overwrite_id: &str,
    ) -> DiscordResult<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/channels/{channel_id}/permissions/{overwrite_id}"),
        )
        .await
    }

    async fn guild_member(&self, guild_id: &str, user_id: &str) -> DiscordResult<Member> {
        self.get(&format!("/guilds/{guild_id}/members/{user_id}"))
            .await
    }

    async fn guild_members(&self, guild_id: &str) -> DiscordResult<Vec<Member>> {
        self.get(&format!("/guilds/{guild_id}/members?limit=1000"))
            .await
    }

    async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> DiscordResult<()> {
        self.send_empty(
            Method::PUT,
            &format!("/guilds/{guild_id}/members/{user_id}/roles/{role_id}"),
        )
        .await
    }

    async fn remove_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> DiscordResult<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/guilds/{guild_id}/members/{user_id}/roles/{role_id}"),
        )
        .await
    }

    async fn get_webhook(&self, webhook_id: &str) -> DiscordResult<Webhook> {
        self.get(&format!("/webhooks/{webhook_id}")).await
    }

    async fn channel_webhooks(&self, channel_id: &str) -> DiscordResult<Vec<Webhook>> {
        self.get(&format!("/channels/{channel_id}/webhooks")).await
    }

    async fn guild_webhooks(&self, guild_id: &str) -> DiscordResult<Vec<Webhook>> {
        self.get(&format!("/guilds/{guild_id}/webhooks")).await
    }

    async fn create_webhook(
        &self,
        channel_id: &str,
        params: &WebhookCreate,
    ) -> DiscordResult<Webhook> {
        self.send(
            Method::POST,
            &format!("/channels/{channel_id}/webhooks"),
            params,
        )
        .await
    }

    async fn edit_webhook(&self, webhook_id: &str, params: &WebhookEdit) -> DiscordResult<Webhook> {
        self.send(Method::PATCH, &format!("/webhooks/{webhook_id}"), params)
            .await
    }

    async fn delete_webhook(&self, webhook_id: &str) -> DiscordResult<()> {
        self.send_empty(Method::DELETE, &format!("/webhooks/{webhook_id}"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_client() -> (MockServer, DiscordClient) {
        let server = MockServer::start().await;
        let mut config = ClientConfig::new("Bot abc.def");
        config.api_url = server.uri();
        let client = DiscordClient::new(&config).unwrap();
        (server, client)
    }

    #[test]
    fn test_token_and_url_normalization() {
        let mut config = ClientConfig::new("Bot abc.def");
        config.api_url = "http://localhost:3000/api/".to_string();
        config.timeout = Duration::from_secs(5);

        let client = DiscordClient::new(&config).unwrap();
        assert_eq!(client.bot_token, "abc.def");
        assert_eq!(client.base_url, "http://localhost:3000/api");

        let client = DiscordClient::new(&ClientConfig::new("plain")).unwrap();
        assert_eq!(client.bot_token, "plain");
        assert_eq!(client.base_url, crate::config::DEFAULT_API_URL);
    }

    #[tokio::test]
    async fn test_connection_failure_is_http_error() {
        let mut config = ClientConfig::new("t");
        // Port 9 (discard) on localhost is closed in test environments.
        config.api_url = "http://127.0.0.1:9".to_string();
        config.timeout = Duration::from_secs(2);

        let client = DiscordClient::new(&config).unwrap();
        let err = client.get_channel("1").await.unwrap_err();
        assert!(matches!(err, DiscordError::Http(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_get_sends_bot_token_and_query() {
        let (server, client) = setup_mock_client().await;
        Mock::given(method("GET"))
            .and(path("/guilds/42"))
            .and(query_param("with_counts", "true"))
            .and(header("Authorization", "Bot abc.def"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "42",
                "name": "homelab",
                "permissions": "8",
                "approximate_member_count": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let guild = assert_ok!(client.get_guild("42").await);
        assert_eq!(guild.name, "homelab");
        assert_eq!(guild.permissions, 8);
        assert_eq!(guild.approximate_member_count, Some(3));
    }

    #[tokio::test]
    async fn test_list_endpoints_send_limits() {
        let (server, client) = setup_mock_client().await;
        Mock::given(method("GET"))
            .and(path("/users/@me/guilds"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1", "name": "a"}])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/guilds/1/members"))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"user": {"id": "5", "username": "alice"}, "roles": ["9"]}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let guilds = assert_ok!(client.current_user_guilds().await);
        assert_eq!(guilds[0].name, "a");
        let members = assert_ok!(client.guild_members("1").await);
        assert_eq!(members[0].user.username, "alice");
        assert_eq!(members[0].roles, ["9"]);
    }

    #[tokio::test]
    async fn test_rate_limit_maps_retry_after() {
        let (server, client) = setup_mock_client().await;
        Mock::given(method("GET"))
            .and(path("/channels/1"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "1.5")
                    .set_body_json(json!({"message": "You are being rate limited.", "retry_after": 1.5})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels/2"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = assert_err!(client.get_channel("1").await);
        assert!(matches!(err, DiscordError::RateLimited { retry_after } if retry_after == 1.5), "{err:?}");

        let err = assert_err!(client.get_channel("2").await);
        assert!(matches!(err, DiscordError::RateLimited { retry_after } if retry_after == 30.0), "{err:?}");
    }

    #[tokio::test]
    async fn test_error_body_maps_to_api_error() {
        let (server, client) = setup_mock_client().await;
        Mock::given(method("GET"))
            .and(path("/channels/1"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"code": 10003, "message": "Unknown Channel"})),
            )
            .mount(&server)
            .await;

        let err = assert_err!(client.get_channel("1").await);
        assert!(err.is_not_found());
        match err {
            DiscordError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code, 10003);
                assert_eq!(message, "Unknown Channel");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_keeps_text() {
        let (server, client) = setup_mock_client().await;
        Mock::given(method("DELETE"))
            .and(path("/webhooks/3"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = assert_err!(client.delete_webhook("3").await);
        assert_eq!(
            err.to_string(),
            "Discord API error 502 (HTTP 502): Bad Gateway"
        );
    }

    #[tokio::test]
    async fn test_role_body_sends_permissions_as_string() {
        let (server, client) = setup_mock_client().await;
        Mock::given(method("POST"))
            .and(path("/guilds/1/roles"))
            .and(body_json(json!({"name": "mods", "permissions": "3072", "hoist": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "9", "name": "mods", "permissions": "3072", "hoist": true
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/guilds/1/roles/9"))
            .and(body_json(json!({"name": "admins", "permissions": "8"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "9", "name": "admins", "permissions": "8"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let params = RoleParams {
            name: "mods".into(),
            permissions: 3072,
            hoist: Some(true),
            ..Default::default()
        };
        let role = assert_ok!(client.create_role("1", &params).await);
        assert_eq!(role.permissions, 3072);

        let params = RoleParams {
            name: "admins".into(),
            permissions: 8,
            ..Default::default()
        };
        let role = assert_ok!(client.edit_role("1", "9", &params).await);
        assert_eq!(role.name, "admins");
    }

    #[tokio::test]
    async fn test_no_content_writes() {
        let (server, client) = setup_mock_client().await;
        Mock::given(method("PUT"))
            .and(path("/channels/2/permissions/7"))
            .and(body_json(json!({"type": 0, "allow": "1024", "deny": "2048"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/guilds/1/members/5/roles/9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/guilds/1/members/5/roles/9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/channels/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "2"})))
            .expect(1)
            .mount(&server)
            .await;

        let overwrite = OverwriteParams {
            kind: 0,
            allow: 1024,
            deny: 2048,
        };
        assert_ok!(client.edit_channel_permissions("2", "7", &overwrite).await);
        assert_ok!(client.add_member_role("1", "5", "9").await);
        assert_ok!(client.remove_member_role("1", "5", "9").await);
        assert_ok!(client.delete_channel("2").await);
    }

    #[tokio::test]
    async fn test_channel_and_webhook_paths() {
        let (server, client) = setup_mock_client().await;
        Mock::given(method("POST"))
            .and(path("/guilds/1/channels"))
            .and(body_json(json!({"name": "general", "type": 0})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "2", "type": 0, "name": "general"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/channels/2"))
            .and(body_json(json!({"name": "general", "topic": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "2", "type": 0, "name": "general", "topic": "hello"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels/2/webhooks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "3", "type": 1, "name": "deploys"}])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/webhooks/3"))
            .and(body_json(json!({"name": "builds"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "3", "type": 1, "name": "builds"})))
            .expect(1)
            .mount(&server)
            .await;

        let created = assert_ok!(
            client
                .create_channel("1", &ChannelCreate { name: "general".into(), kind: 0 })
                .await
        );
        assert_eq!(created.id, "2");

        let edit = ChannelEdit {
            name: "general".into(),
            topic: Some("hello".into()),
            ..Default::default()
        };
        let edited = assert_ok!(client.edit_channel("2", &edit).await);
        assert_eq!(edited.topic.as_deref(), Some("hello"));

        let hooks = assert_ok!(client.channel_webhooks("2").await);
        assert_eq!(hooks[0].name.as_deref(), Some("deploys"));

        let edit = WebhookEdit {
            name: Some("builds".into()),
            ..Default::default()
        };
        let hook = assert_ok!(client.edit_webhook("3", &edit).await);
        assert_eq!(hook.name.as_deref(), Some("builds"));
    }
}
