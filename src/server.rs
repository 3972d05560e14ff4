//! The gRPC server and the [`ProviderService`] trait behind it.
//!
//! # Signal Handling
//!
//! The server stops accepting connections on SIGTERM or SIGINT. In-flight
//! requests then get [`ServeOptions::shutdown_timeout`] to finish, after which
//! the provider's `stop()` runs and [`serve`] returns.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::generated as proto;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};

/// High-level provider API behind the gRPC layer.
///
/// Values are plain JSON. Unknown values arrive as
/// [`UNKNOWN_SENTINEL`](crate::value::UNKNOWN_SENTINEL) strings.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Resource and data source names. Derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
            capabilities: Default::default(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: Value) -> ProviderResult<Vec<Diagnostic>> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider with credentials and settings.
    ///
    /// User-facing problems are returned as diagnostics, not as errors.
    async fn configure(&self, config: Value) -> ProviderResult<Vec<Diagnostic>>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> ProviderResult<()> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> ProviderResult<Vec<Diagnostic>> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Upgrade resource state from an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> ProviderResult<Value> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Plan changes for a resource.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> ProviderResult<PlanResult>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value) -> ProviderResult<Value>;

    /// Read the current state of a resource. `Value::Null` means it is gone.
    async fn read(&self, resource_type: &str, current_state: Value) -> ProviderResult<Value>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> ProviderResult<Value>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> ProviderResult<()>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> ProviderResult<Vec<ImportedResource>>;

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source's configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> ProviderResult<Vec<Diagnostic>> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Read data from an external source.
    async fn read_data_source(&self, data_source_type: &str, config: Value) -> ProviderResult<Value>;
}

/// Wrapper that implements the generated gRPC trait.
struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| proto::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_to_diagnostics(err: &ProviderError) -> Vec<proto::Diagnostic> {
    diagnostics_to_proto(err.diagnostics())
}

fn schema_to_proto(schema: &crate::schema::Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version as i64,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &crate::schema::Block) -> proto::Block {
    proto::Block {
        attributes: block
            .attributes
            .iter()
            .map(|(name, attr)| proto::Attribute {
                name: name.clone(),
                r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
                required: attr.flags.required,
                optional: attr.flags.optional,
                computed: attr.flags.computed,
                sensitive: attr.flags.sensitive,
                description: attr.description.clone().unwrap_or_default(),
                force_new: attr.force_new,
                default_value: attr
                    .default
                    .as_ref()
                    .and_then(|v| serde_json::to_vec(v).ok())
                    .unwrap_or_default(),
            })
            .collect(),
        description: block.description.clone().unwrap_or_default(),
    }
}

/// Decodes a JSON payload. Empty bytes decode to null.
fn decode(bytes: &[u8]) -> Result<Value, Status> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| ProviderError::from(e).into())
}

/// Encodes a JSON payload. Null encodes to empty bytes.
fn encode(value: &Value) -> Result<Vec<u8>, Status> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::to_vec(value).map_err(|e| ProviderError::from(e).into())
}

fn log_diagnostics(diagnostics: &[Diagnostic], operation: &str) {
    if diagnostics.iter().any(Diagnostic::is_error) {
        warn!(diagnostics = diagnostics.len(), "{operation} completed with errors");
    } else {
        info!("{operation} completed successfully");
    }
}

#[tonic::async_trait]
impl<P: ProviderService> proto::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip_all, name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: Request<proto::GetMetadataRequest>,
    ) -> Result<Response<proto::GetMetadataResponse>, Status> {
        let metadata = self.provider.metadata();
        debug!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata completed"
        );
        Ok(Response::new(proto::GetMetadataResponse {
            server_capabilities: Some(proto::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: vec![],
        }))
    }

    #[instrument(skip_all, name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: Request<proto::GetSchemaRequest>,
    ) -> Result<Response<proto::GetSchemaResponse>, Status> {
        let schema = self.provider.schema();
        debug!(
            resources = schema.resources.len(),
            data_sources = schema.data_sources.len(),
            "GetSchema completed"
        );
        Ok(Response::new(proto::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip_all, name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: Request<proto::ValidateProviderConfigRequest>,
    ) -> Result<Response<proto::ValidateProviderConfigResponse>, Status> {
        let config = decode(&request.into_inner().config)?;

        let diagnostics = match self.provider.validate_provider_config(config).await {
            Ok(diagnostics) => {
                log_diagnostics(&diagnostics, "ValidateProviderConfig");
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "ValidateProviderConfig failed");
                error_to_diagnostics(&e)
            },
        };
        Ok(Response::new(proto::ValidateProviderConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.configure")]
    async fn configure(
        &self,
        request: Request<proto::ConfigureRequest>,
    ) -> Result<Response<proto::ConfigureResponse>, Status> {
        let config = decode(&request.into_inner().config)?;

        let diagnostics = match self.provider.configure(config).await {
            Ok(diagnostics) => {
                log_diagnostics(&diagnostics, "Configure");
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "Configure failed");
                error_to_diagnostics(&e)
            },
        };
        Ok(Response::new(proto::ConfigureResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.stop")]
    async fn stop(
        &self,
        _request: Request<proto::StopRequest>,
    ) -> Result<Response<proto::StopResponse>, Status> {
        info!("Stop called");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            },
        };
        Ok(Response::new(proto::StopResponse { error }))
    }

    #[instrument(
        skip_all,
        name = "grpc.validate_resource_config",
        fields(resource_type = %request.get_ref().resource_type)
    )]
    async fn validate_resource_config(
        &self,
        request: Request<proto::ValidateResourceConfigRequest>,
    ) -> Result<Response<proto::ValidateResourceConfigResponse>, Status> {
        let req = request.into_inner();
        let config = decode(&req.config)?;

        let diagnostics = match self
            .provider
            .validate_resource_config(&req.resource_type, config)
            .await
        {
            Ok(diagnostics) => {
                log_diagnostics(&diagnostics, "ValidateResourceConfig");
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "ValidateResourceConfig failed");
                error_to_diagnostics(&e)
            },
        };
        Ok(Response::new(proto::ValidateResourceConfigResponse { diagnostics }))
    }

    #[instrument(
        skip_all,
        name = "grpc.upgrade_resource_state",
        fields(resource_type = %request.get_ref().resource_type, version = request.get_ref().version)
    )]
    async fn upgrade_resource_state(
        &self,
        request: Request<proto::UpgradeResourceStateRequest>,
    ) -> Result<Response<proto::UpgradeResourceStateResponse>, Status> {
        let req = request.into_inner();
        let state = decode(&req.raw_state)?;

        match self
            .provider
            .upgrade_resource_state(&req.resource_type, req.version, state)
            .await
        {
            Ok(upgraded) => {
                debug!("UpgradeResourceState completed");
                Ok(Response::new(proto::UpgradeResourceStateResponse {
                    upgraded_state: encode(&upgraded)?,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(error = %e, "UpgradeResourceState failed");
                Ok(Response::new(proto::UpgradeResourceStateResponse {
                    upgraded_state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }))
            },
        }
    }

    #[instrument(skip_all, name = "grpc.plan", fields(resource_type = %request.get_ref().resource_type))]
    async fn plan(
        &self,
        request: Request<proto::PlanRequest>,
    ) -> Result<Response<proto::PlanResponse>, Status> {
        let req = request.into_inner();
        let prior_state = match decode(&req.prior_state)? {
            Value::Null => None,
            state => Some(state),
        };
        let proposed_state = decode(&req.proposed_state)?;
        let config = decode(&req.config)?;
        debug!(is_create = prior_state.is_none(), "Plan called");

        match self
            .provider
            .plan(&req.resource_type, prior_state, proposed_state, config)
            .await
        {
            Ok(result) => {
                info!(
                    changes = result.changes.len(),
                    requires_replace = result.requires_replace,
                    "Plan completed"
                );
                Ok(Response::new(proto::PlanResponse {
                    planned_state: encode(&result.planned_state)?,
                    changes: result.changes.into_iter().map(Into::into).collect(),
                    requires_replace: result.requires_replace,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(error = %e, "Plan failed");
                Ok(Response::new(proto::PlanResponse {
                    planned_state: vec![],
                    changes: vec![],
                    requires_replace: false,
                    diagnostics: error_to_diagnostics(&e),
                }))
            },
        }
    }

    #[instrument(skip_all, name = "grpc.create", fields(resource_type = %request.get_ref().resource_type))]
    async fn create(
        &self,
        request: Request<proto::CreateRequest>,
    ) -> Result<Response<proto::CreateResponse>, Status> {
        let req = request.into_inner();
        let planned_state = decode(&req.planned_state)?;

        match self.provider.create(&req.resource_type, planned_state).await {
            Ok(state) => {
                info!("Create completed successfully");
                Ok(Response::new(proto::CreateResponse {
                    state: encode(&state)?,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(error = %e, "Create failed");
                Ok(Response::new(proto::CreateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }))
            },
        }
    }

    #[instrument(skip_all, name = "grpc.read", fields(resource_type = %request.get_ref().resource_type))]
    async fn read(
        &self,
        request: Request<proto::ReadRequest>,
    ) -> Result<Response<proto::ReadResponse>, Status> {
        let req = request.into_inner();
        let current_state = decode(&req.current_state)?;

        match self.provider.read(&req.resource_type, current_state).await {
            Ok(state) => {
                if state.is_null() {
                    info!("Resource is gone");
                }
                Ok(Response::new(proto::ReadResponse {
                    state: encode(&state)?,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(error = %e, "Read failed");
                Ok(Response::new(proto::ReadResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }))
            },
        }
    }

    #[instrument(skip_all, name = "grpc.update", fields(resource_type = %request.get_ref().resource_type))]
    async fn update(
        &self,
        request: Request<proto::UpdateRequest>,
    ) -> Result<Response<proto::UpdateResponse>, Status> {
        let req = request.into_inner();
        let prior_state = decode(&req.prior_state)?;
        let planned_state = decode(&req.planned_state)?;

        match self
            .provider
            .update(&req.resource_type, prior_state, planned_state)
            .await
        {
            Ok(state) => {
                info!("Update completed successfully");
                Ok(Response::new(proto::UpdateResponse {
                    state: encode(&state)?,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(error = %e, "Update failed");
                Ok(Response::new(proto::UpdateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }))
            },
        }
    }

    #[instrument(skip_all, name = "grpc.delete", fields(resource_type = %request.get_ref().resource_type))]
    async fn delete(
        &self,
        request: Request<proto::DeleteRequest>,
    ) -> Result<Response<proto::DeleteResponse>, Status> {
        let req = request.into_inner();
        let current_state = decode(&req.current_state)?;

        let diagnostics = match self.provider.delete(&req.resource_type, current_state).await {
            Ok(()) => {
                info!("Delete completed successfully");
                vec![]
            },
            Err(e) => {
                error!(error = %e, "Delete failed");
                error_to_diagnostics(&e)
            },
        };
        Ok(Response::new(proto::DeleteResponse { diagnostics }))
    }

    #[instrument(
        skip_all,
        name = "grpc.import_resource_state",
        fields(resource_type = %request.get_ref().resource_type, id = %request.get_ref().id)
    )]
    async fn import_resource_state(
        &self,
        request: Request<proto::ImportResourceStateRequest>,
    ) -> Result<Response<proto::ImportResourceStateResponse>, Status> {
        let req = request.into_inner();

        match self.provider.import_resource(&req.resource_type, &req.id).await {
            Ok(imported) => {
                info!(imported_count = imported.len(), "ImportResourceState completed");
                let imported = imported
                    .into_iter()
                    .map(|r| {
                        Ok(proto::ImportedResource {
                            state: encode(&r.state)?,
                            resource_type: r.resource_type,
                        })
                    })
                    .collect::<Result<_, Status>>()?;
                Ok(Response::new(proto::ImportResourceStateResponse {
                    imported,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(error = %e, "ImportResourceState failed");
                Ok(Response::new(proto::ImportResourceStateResponse {
                    imported: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }))
            },
        }
    }

    #[instrument(
        skip_all,
        name = "grpc.validate_data_source_config",
        fields(data_source_type = %request.get_ref().data_source_type)
    )]
    async fn validate_data_source_config(
        &self,
        request: Request<proto::ValidateDataSourceConfigRequest>,
    ) -> Result<Response<proto::ValidateDataSourceConfigResponse>, Status> {
        let req = request.into_inner();
        let config = decode(&req.config)?;

        let diagnostics = match self
            .provider
            .validate_data_source_config(&req.data_source_type, config)
            .await
        {
            Ok(diagnostics) => {
                log_diagnostics(&diagnostics, "ValidateDataSourceConfig");
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "ValidateDataSourceConfig failed");
                error_to_diagnostics(&e)
            },
        };
        Ok(Response::new(proto::ValidateDataSourceConfigResponse { diagnostics }))
    }

    #[instrument(
        skip_all,
        name = "grpc.read_data_source",
        fields(data_source_type = %request.get_ref().data_source_type)
    )]
    async fn read_data_source(
        &self,
        request: Request<proto::ReadDataSourceRequest>,
    ) -> Result<Response<proto::ReadDataSourceResponse>, Status> {
        let req = request.into_inner();
        let config = decode(&req.config)?;

        match self
            .provider
            .read_data_source(&req.data_source_type, config)
            .await
        {
            Ok(state) => {
                info!("ReadDataSource completed successfully");
                Ok(Response::new(proto::ReadDataSourceResponse {
                    state: encode(&state)?,
                    diagnostics: vec![],
                }))
            },
            Err(e) => {
                error!(error = %e, "ReadDataSource failed");
                Ok(Response::new(proto::ReadDataSourceResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }))
            },
        }
    }
}

/// Options for configuring the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long in-flight requests may run after a shutdown signal.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Create new serve options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// OS signals that end the server.
struct ShutdownSignal {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Installs the handlers up front so a failure surfaces before serving.
    fn install() -> ProviderResult<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            Ok(Self {
                sigterm: signal(SignalKind::terminate())?,
                sigint: signal(SignalKind::interrupt())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    async fn recv(mut self) {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.sigterm.recv() => info!("Received SIGTERM, shutting down"),
                _ = self.sigint.recv() => info!("Received SIGINT, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received CTRL+C, shutting down"),
                Err(e) => {
                    error!(error = %e, "Unable to listen for CTRL+C");
                    std::future::pending::<()>().await;
                },
            }
        }
    }
}

/// Serve a provider as a gRPC server.
///
/// Binds an ephemeral port on 127.0.0.1, prints the handshake line
/// `PROVIDER_PLUGIN|<version>|<address>` to stdout and serves until SIGTERM
/// or SIGINT.
pub async fn serve<P: ProviderService>(provider: P) -> ProviderResult<()> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// Serve a provider with custom options. See [`serve`].
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> ProviderResult<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    serve_on_listener(provider, listener, addr, options).await
}

async fn serve_on_listener<P: ProviderService>(
    provider: P,
    listener: TcpListener,
    addr: SocketAddr,
    options: ServeOptions,
) -> ProviderResult<()> {
    let signal = ShutdownSignal::install()?;

    println!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr);
    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let grpc_service = ProviderGrpcService {
        provider: Arc::clone(&provider),
    };

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = Server::builder()
        .add_service(proto::provider_server::ProviderServer::new(grpc_service))
        .serve_with_incoming_shutdown(
            tokio_stream::wrappers::TcpListenerStream::new(listener),
            async move {
                signal.recv().await;
                let _ = signalled_tx.send(());
            },
        );
    tokio::pin!(server);

    // The grace period only starts once the signal arrived.
    let finished = tokio::select! {
        result = &mut server => Some(result),
        _ = signalled_rx => tokio::time::timeout(options.shutdown_timeout, &mut server).await.ok(),
    };

    match finished {
        Some(Ok(())) => info!("Server shutdown complete"),
        Some(Err(e)) => {
            error!(error = %e, "Server error");
            return Err(e.into());
        },
        None => warn!(
            timeout = ?options.shutdown_timeout,
            "Shutdown timeout exceeded, dropping in-flight requests"
        ),
    }

    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }

    info!("Provider shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::fake::FakeDiscord;
    use crate::provider::DiscordProvider;
    use proto::provider_server::Provider;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn service() -> (Arc<FakeDiscord>, ProviderGrpcService<DiscordProvider>) {
        let fake = Arc::new(FakeDiscord::new());
        let provider = DiscordProvider::with_client(fake.clone());
        (
            fake,
            ProviderGrpcService {
                provider: Arc::new(provider),
            },
        )
    }

    fn bytes(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[tokio::test]
    async fn test_read_of_gone_resource_returns_empty_state() {
        let (fake, service) = service();
        let guild = fake.add_guild("test");
        let channel = fake.add_channel(&guild, "general", 0, None);

        let request = proto::ReadRequest {
            resource_type: "discord_permissions".into(),
            current_state: bytes(json!({
                "guild_id": guild, "channel_id": channel, "id": "7", "type": "role"
            })),
        };
        let response = assert_ok!(service.read(Request::new(request)).await).into_inner();
        assert!(response.state.is_empty());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_failures_become_diagnostics() {
        let (_, service) = service();
        let request = proto::CreateRequest {
            resource_type: "discord_channel".into(),
            planned_state: bytes(json!({"guild_id": "1"})),
        };
        let response = assert_ok!(service.create(Request::new(request)).await).into_inner();
        assert!(response.state.is_empty());
        let diagnostic = &response.diagnostics[0];
        assert_eq!(diagnostic.summary, "name is null");
        assert_eq!(diagnostic.attribute, "name");
        assert_eq!(diagnostic.severity, proto::diagnostic::Severity::Error as i32);
    }

    #[tokio::test]
    async fn test_unknown_types_become_diagnostics() {
        let (_, service) = service();
        let request = proto::ImportResourceStateRequest {
            resource_type: "discord_emoji".into(),
            id: "1/2".into(),
        };
        let response =
            assert_ok!(service.import_resource_state(Request::new(request)).await).into_inner();
        assert!(response.imported.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Unknown resource type: discord_emoji");

        let request = proto::ReadDataSourceRequest {
            data_source_type: "discord_emoji".into(),
            config: bytes(json!({})),
        };
        let response = assert_ok!(service.read_data_source(Request::new(request)).await).into_inner();
        assert!(response.state.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Unknown resource type: discord_emoji");
    }

    #[tokio::test]
    async fn test_import_returns_seeded_state() {
        let (fake, service) = service();
        let guild = fake.add_guild("homelab");
        let request = proto::ImportResourceStateRequest {
            resource_type: "discord_channel".into(),
            id: format!("{guild}/general"),
        };
        let response =
            assert_ok!(service.import_resource_state(Request::new(request)).await).into_inner();
        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported[0].resource_type, "discord_channel");
        let state: Value = serde_json::from_slice(&response.imported[0].state).unwrap();
        assert_eq!(state["guild_id"], json!(guild));
        assert_eq!(state["name"], "general");
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_invalid_argument() {
        let (_, service) = service();
        let request = proto::CreateRequest {
            resource_type: "discord_channel".into(),
            planned_state: b"{not json".to_vec(),
        };
        let status = assert_err!(service.create(Request::new(request)).await);
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_plan_create_marks_computed_unknown() {
        let (_, service) = service();
        let request = proto::PlanRequest {
            resource_type: "discord_channel".into(),
            prior_state: vec![],
            proposed_state: bytes(json!({"guild_id": "1", "name": "general"})),
            config: vec![],
        };
        let response = assert_ok!(service.plan(Request::new(request)).await).into_inner();
        let planned: Value = serde_json::from_slice(&response.planned_state).unwrap();
        assert_eq!(planned["id"], crate::value::unknown());
        assert!(!response.requires_replace);
    }

    #[tokio::test]
    async fn test_schema_has_no_nested_blocks() {
        let (_, service) = service();
        let response = assert_ok!(
            service
                .get_schema(Request::new(proto::GetSchemaRequest {}))
                .await
        )
        .into_inner();
        let channel = &response.resources["discord_channel"];
        let block = channel.block.as_ref().unwrap();
        let kind = block.attributes.iter().find(|a| a.name == "type").unwrap();
        assert!(kind.force_new);
        assert_eq!(response.data_sources.len(), 7);
    }

    #[test]
    fn test_serve_options() {
        assert_eq!(ServeOptions::new().shutdown_timeout, Duration::from_secs(30));
        let options = ServeOptions::new().with_shutdown_timeout(Duration::from_secs(5));
        assert_eq!(options.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_encode_null_is_empty() {
        assert!(encode(&Value::Null).unwrap().is_empty());
        assert_eq!(decode(&[]).unwrap(), Value::Null);
    }
}
