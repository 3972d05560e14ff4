//! The Discord provider: dispatches host calls to the entity handlers.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::config::ProviderConfig;
use crate::data_sources::{GuildDataSource, MemberDataSource};
use crate::discord::{DiscordApi, DiscordClient};
use crate::error::{ProviderError, ProviderResult};
use crate::handler::{self, DataSourceHandler, ResourceHandler};
use crate::plan;
use crate::resources::{
    ChannelResource, PermissionsResource, RoleMembersResource, RoleResource, WebhookResource,
};
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Runs `$body` with `$h` bound to the resource handler named `$name`.
macro_rules! with_resource {
    ($name:expr, $h:ident => $body:expr) => {{
        let name: &str = $name;
        if name == ChannelResource::NAME {
            type $h = ChannelResource;
            $body
        } else if name == RoleResource::NAME {
            type $h = RoleResource;
            $body
        } else if name == PermissionsResource::NAME {
            type $h = PermissionsResource;
            $body
        } else if name == WebhookResource::NAME {
            type $h = WebhookResource;
            $body
        } else if name == RoleMembersResource::NAME {
            type $h = RoleMembersResource;
            $body
        } else {
            Err(ProviderError::UnknownResource(name.to_string()))
        }
    }};
}

/// Terraform-style provider for Discord guilds.
///
/// The client is injected by [`configure`](ProviderService::configure) and
/// shared read-only by every later call.
pub struct DiscordProvider {
    client: RwLock<Option<Arc<dyn DiscordApi>>>,
}

impl Default for DiscordProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscordProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
        }
    }

    /// A provider already bound to `api`, skipping configuration.
    pub fn with_client(api: Arc<dyn DiscordApi>) -> Self {
        Self {
            client: RwLock::new(Some(api)),
        }
    }

    async fn api(&self) -> ProviderResult<Arc<dyn DiscordApi>> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "the provider has not been configured with a Discord client".to_string(),
            )
        })
    }

    fn resource_schema(resource_type: &str) -> ProviderResult<Schema> {
        with_resource!(resource_type, H => Ok(H::schema()))
    }

    fn data_source_schema(data_source_type: &str) -> ProviderResult<Schema> {
        if data_source_type == GuildDataSource::NAME {
            Ok(GuildDataSource::schema())
        } else if data_source_type == MemberDataSource::NAME {
            Ok(MemberDataSource::schema())
        } else {
            with_resource!(data_source_type, H => Ok(H::data_source_schema()))
        }
    }
}

fn register<H: ResourceHandler>(schema: ProviderSchema) -> ProviderSchema {
    schema
        .with_resource(H::NAME, H::schema())
        .with_data_source(H::NAME, H::data_source_schema())
}

#[async_trait::async_trait]
impl ProviderService for DiscordProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        let schema = register::<ChannelResource>(schema);
        let schema = register::<RoleResource>(schema);
        let schema = register::<PermissionsResource>(schema);
        let schema = register::<WebhookResource>(schema);
        register::<RoleMembersResource>(schema)
            .with_data_source(GuildDataSource::NAME, GuildDataSource::schema())
            .with_data_source(MemberDataSource::NAME, MemberDataSource::schema())
    }

    async fn validate_provider_config(&self, config: Value) -> ProviderResult<Vec<Diagnostic>> {
        Ok(validation::validate(&ProviderConfig::schema(), &config))
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> ProviderResult<Vec<Diagnostic>> {
        let config: ProviderConfig = if config.is_null() {
            ProviderConfig::default()
        } else {
            serde_json::from_value(config)?
        };

        let settings = match config.resolve() {
            Ok(settings) => settings,
            Err(diagnostics) => {
                warn!(count = diagnostics.len(), "Provider configuration rejected");
                return Ok(diagnostics);
            },
        };

        let client = match DiscordClient::new(&settings) {
            Ok(client) => client,
            Err(e) => {
                return Ok(vec![Diagnostic::error("Unable to create Discord client")
                    .with_detail(e.to_string())]);
            },
        };

        *self.client.write().await = Some(Arc::new(client));
        info!(api_url = %settings.api_url, "Configured Discord client");
        Ok(Vec::new())
    }

    async fn stop(&self) -> ProviderResult<()> {
        self.client.write().await.take();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> ProviderResult<Vec<Diagnostic>> {
        let schema = Self::resource_schema(resource_type)?;
        Ok(validation::validate(&schema, &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> ProviderResult<PlanResult> {
        let schema = Self::resource_schema(resource_type)?;
        Ok(plan::plan(&schema, prior_state.as_ref(), proposed_state))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> ProviderResult<Value> {
        let api = self.api().await?;
        with_resource!(resource_type, H => handler::create::<H>(api.as_ref(), planned_state).await)
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> ProviderResult<Value> {
        let api = self.api().await?;
        with_resource!(resource_type, H => handler::read::<H>(api.as_ref(), current_state).await)
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> ProviderResult<Value> {
        let api = self.api().await?;
        with_resource!(resource_type, H => {
            handler::update::<H>(api.as_ref(), prior_state, planned_state).await
        })
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> ProviderResult<()> {
        let api = self.api().await?;
        with_resource!(resource_type, H => handler::delete::<H>(api.as_ref(), current_state).await)
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> ProviderResult<Vec<ImportedResource>> {
        let api = self.api().await?;
        with_resource!(resource_type, H => handler::import::<H>(api.as_ref(), id).await)
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> ProviderResult<Vec<Diagnostic>> {
        let schema = Self::data_source_schema(data_source_type)?;
        Ok(validation::validate(&schema, &config))
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> ProviderResult<Value> {
        let api = self.api().await?;
        let api = api.as_ref();
        if data_source_type == GuildDataSource::NAME {
            handler::read_lookup::<GuildDataSource>(api, config).await
        } else if data_source_type == MemberDataSource::NAME {
            handler::read_lookup::<MemberDataSource>(api, config).await
        } else {
            with_resource!(data_source_type, H => handler::read_data_source::<H>(api, config).await)
        }
    }
}
