//! The CRUD pipeline shared by every resource and data source.
//!
//! Each entity implements [`ResourceHandler`] (or [`DataSourceHandler`] for
//! read-only lookups) and the driver functions here run the fixed sequence:
//! decode the host value, check the identifying fields, call Discord,
//! reconcile the result into the model and encode it back.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::discord::{format, DiscordApi, DiscordError, Key};
use crate::error::{ProviderError, ProviderResult};
use crate::schema::{Diagnostic, Schema};
use crate::types::ImportedResource;
use crate::validation::check_required;
use crate::value::Attr;

/// Kind label used in diagnostics for resources.
pub const RESOURCE: &str = "resource";
/// Kind label used in diagnostics for data sources.
pub const DATA_SOURCE: &str = "data source";

/// The operation a set of required fields applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Resource creation.
    Create,
    /// Resource refresh and data source reads.
    Read,
    /// In-place update.
    Update,
    /// Destroy.
    Delete,
}

/// What a handler call runs against.
pub struct Context<'a> {
    /// The configured Discord client.
    pub api: &'a dyn DiscordApi,
    /// [`RESOURCE`] or [`DATA_SOURCE`].
    pub kind: &'static str,
}

impl<'a> Context<'a> {
    /// Context for a resource call.
    pub fn resource(api: &'a dyn DiscordApi) -> Self {
        Self {
            api,
            kind: RESOURCE,
        }
    }

    /// Context for a data source read.
    pub fn data_source(api: &'a dyn DiscordApi) -> Self {
        Self {
            api,
            kind: DATA_SOURCE,
        }
    }

    /// An "Invalid ... Configuration" error for this kind.
    pub fn invalid_config(&self, detail: impl Into<String>) -> ProviderError {
        let kind = capitalize(self.kind);
        ProviderError::diagnostic(
            Diagnostic::error(format!("Invalid {kind} Configuration")).with_detail(detail),
        )
    }

    /// Picks the lookup key from an ID field and a name field.
    ///
    /// Fails with a configuration error when neither is set.
    pub fn key<'m>(
        &self,
        entity: &str,
        id: (&str, &'m Attr<String>),
        name: (&str, &'m Attr<String>),
    ) -> ProviderResult<Key<'m>> {
        Key::pick(
            id.1.known().map(String::as_str),
            name.1.known().map(String::as_str),
        )
        .ok_or_else(|| {
            self.invalid_config(format!(
                "Either the {} or the {} must be set for the {entity} {}.",
                id.0, name.0, self.kind
            ))
        })
    }
}

fn capitalize(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Entity-specific hooks of a managed resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync + 'static {
    /// Attribute model, decoded from and encoded to host JSON.
    type Model: Serialize + DeserializeOwned + Default + Clone + Send + Sync;
    /// What Discord returns for the entity.
    type Remote: Send + Sync;

    /// Resource type name, e.g. `discord_channel`.
    const NAME: &'static str;
    /// Entity name used in diagnostics, e.g. `channel`.
    const ENTITY: &'static str;

    /// Resource schema, including `last_updated`.
    fn schema() -> Schema;

    /// Identifying fields an operation needs. See [`check_required`].
    fn required(op: Operation, model: &Self::Model) -> Vec<(&'static str, &Attr<String>)>;

    /// Creates the entity from the planned model.
    async fn create(cx: &Context<'_>, model: &Self::Model) -> ProviderResult<Self::Remote>;

    /// Fetches the entity the model identifies.
    async fn read(cx: &Context<'_>, model: &Self::Model) -> ProviderResult<Self::Remote>;

    /// Applies the planned model to the entity.
    async fn update(
        cx: &Context<'_>,
        prior: &Self::Model,
        planned: &Self::Model,
    ) -> ProviderResult<Self::Remote>;

    /// Deletes the entity.
    async fn delete(cx: &Context<'_>, model: &Self::Model) -> ProviderResult<()>;

    /// Seeds a partial model from an import identifier.
    async fn import(cx: &Context<'_>, id: &str) -> ProviderResult<Self::Model>;

    /// Maps a fetched entity onto `target`.
    ///
    /// Scalars are always overwritten. Lists whose order Discord does not
    /// keep are only filled when unset, and a non-null `prior` value wins.
    /// Parent IDs come from `prior`.
    fn reconcile(remote: &Self::Remote, target: &mut Self::Model, prior: Option<&Self::Model>);

    /// Fills attributes that need further calls after reconciliation.
    async fn complete(
        _cx: &Context<'_>,
        _remote: &Self::Remote,
        _target: &mut Self::Model,
    ) -> ProviderResult<()> {
        Ok(())
    }

    /// The `last_updated` attribute of a model.
    fn last_updated(model: &mut Self::Model) -> &mut Attr<String>;

    /// Target and prior models for a read.
    ///
    /// By default the read starts from an empty model with the stored state
    /// as prior.
    fn read_models(state: &Self::Model) -> (Self::Model, Option<&Self::Model>) {
        (Self::Model::default(), Some(state))
    }

    /// Returns true if the read error means the entity is gone for good.
    fn is_gone(_err: &DiscordError) -> bool {
        false
    }

    /// Data source schema: the resource schema without `last_updated`.
    fn data_source_schema() -> Schema {
        Self::schema()
            .without_attribute("last_updated")
            .into_lookup()
    }
}

/// A read-only lookup with its own model.
#[async_trait]
pub trait DataSourceHandler: Send + Sync + 'static {
    /// Attribute model.
    type Model: Serialize + DeserializeOwned + Default + Send + Sync;

    /// Data source type name, e.g. `discord_guild`.
    const NAME: &'static str;
    /// Entity name used in diagnostics.
    const ENTITY: &'static str;

    /// Data source schema.
    fn schema() -> Schema;

    /// Identifying fields of the lookup.
    fn required(model: &Self::Model) -> Vec<(&'static str, &Attr<String>)>;

    /// Looks the entity up and returns the filled model.
    async fn read(cx: &Context<'_>, config: Self::Model) -> ProviderResult<Self::Model>;
}

fn decode<M: DeserializeOwned + Default>(value: Value) -> ProviderResult<M> {
    if value.is_null() {
        return Ok(M::default());
    }
    Ok(serde_json::from_value(value)?)
}

fn encode<M: Serialize>(model: &M) -> ProviderResult<Value> {
    Ok(serde_json::to_value(model)?)
}

/// Creates a resource from its planned state and returns the new state.
#[instrument(skip_all, fields(resource_type = H::NAME))]
pub async fn create<H: ResourceHandler>(api: &dyn DiscordApi, planned: Value) -> ProviderResult<Value> {
    let cx = Context::resource(api);
    let mut plan: H::Model = decode(planned)?;
    check_required(&H::required(Operation::Create, &plan), H::ENTITY, RESOURCE)?;

    let remote = H::create(&cx, &plan)
        .await
        .map_err(|e| e.in_operation("create", H::ENTITY))?;
    H::reconcile(&remote, &mut plan, None);
    H::complete(&cx, &remote, &mut plan).await?;
    *H::last_updated(&mut plan) = Attr::Known(format::now_rfc850());

    info!("Created {}", H::ENTITY);
    encode(&plan)
}

/// Refreshes stored state. Returns `Value::Null` when the entity is gone.
#[instrument(skip_all, fields(resource_type = H::NAME))]
pub async fn read<H: ResourceHandler>(api: &dyn DiscordApi, state: Value) -> ProviderResult<Value> {
    let cx = Context::resource(api);
    let mut state: H::Model = decode(state)?;
    check_required(&H::required(Operation::Read, &state), H::ENTITY, RESOURCE)?;
    let stamp = H::last_updated(&mut state).clone();

    let remote = match H::read(&cx, &state).await {
        Ok(remote) => remote,
        Err(ProviderError::Discord(err)) if H::is_gone(&err) => {
            warn!(error = %err, "{} no longer exists, removing from state", H::ENTITY);
            return Ok(Value::Null);
        },
        Err(err) => return Err(err.in_operation("get", H::ENTITY)),
    };

    let (mut target, prior) = H::read_models(&state);
    H::reconcile(&remote, &mut target, prior);
    H::complete(&cx, &remote, &mut target).await?;
    *H::last_updated(&mut target) = stamp;

    debug!("Read {}", H::ENTITY);
    encode(&target)
}

/// Applies a planned state over the prior one.
#[instrument(skip_all, fields(resource_type = H::NAME))]
pub async fn update<H: ResourceHandler>(
    api: &dyn DiscordApi,
    prior: Value,
    planned: Value,
) -> ProviderResult<Value> {
    let cx = Context::resource(api);
    let prior: H::Model = decode(prior)?;
    let mut plan: H::Model = decode(planned)?;
    check_required(&H::required(Operation::Update, &plan), H::ENTITY, RESOURCE)?;

    let remote = H::update(&cx, &prior, &plan)
        .await
        .map_err(|e| e.in_operation("update", H::ENTITY))?;
    H::reconcile(&remote, &mut plan, None);
    H::complete(&cx, &remote, &mut plan).await?;
    *H::last_updated(&mut plan) = Attr::Known(format::now_rfc850());

    info!("Updated {}", H::ENTITY);
    encode(&plan)
}

/// Deletes the resource a state describes.
#[instrument(skip_all, fields(resource_type = H::NAME))]
pub async fn delete<H: ResourceHandler>(api: &dyn DiscordApi, state: Value) -> ProviderResult<()> {
    let cx = Context::resource(api);
    let state: H::Model = decode(state)?;
    check_required(&H::required(Operation::Delete, &state), H::ENTITY, RESOURCE)?;

    H::delete(&cx, &state)
        .await
        .map_err(|e| e.in_operation("delete", H::ENTITY))?;
    info!("Deleted {}", H::ENTITY);
    Ok(())
}

/// Turns an import identifier into a partial state for a later read.
#[instrument(skip(api), fields(resource_type = H::NAME))]
pub async fn import<H: ResourceHandler>(
    api: &dyn DiscordApi,
    id: &str,
) -> ProviderResult<Vec<ImportedResource>> {
    let cx = Context::resource(api);
    let model = H::import(&cx, id).await?;
    Ok(vec![ImportedResource::new(H::NAME, encode(&model)?)])
}

/// Reads a resource-backed data source. The output has no `last_updated`.
#[instrument(skip_all, fields(data_source_type = H::NAME))]
pub async fn read_data_source<H: ResourceHandler>(
    api: &dyn DiscordApi,
    config: Value,
) -> ProviderResult<Value> {
    let cx = Context::data_source(api);
    let config: H::Model = decode(config)?;
    check_required(&H::required(Operation::Read, &config), H::ENTITY, DATA_SOURCE)?;

    let remote = H::read(&cx, &config)
        .await
        .map_err(|e| e.in_operation("get", H::ENTITY))?;
    let (mut target, prior) = H::read_models(&config);
    H::reconcile(&remote, &mut target, prior);
    H::complete(&cx, &remote, &mut target).await?;

    let mut value = encode(&target)?;
    if let Value::Object(map) = &mut value {
        map.remove("last_updated");
    }
    Ok(value)
}

/// Reads a data source with its own handler.
#[instrument(skip_all, fields(data_source_type = D::NAME))]
pub async fn read_lookup<D: DataSourceHandler>(
    api: &dyn DiscordApi,
    config: Value,
) -> ProviderResult<Value> {
    let cx = Context::data_source(api);
    let config: D::Model = decode(config)?;
    check_required(&D::required(&config), D::ENTITY, DATA_SOURCE)?;

    let model = D::read(&cx, config)
        .await
        .map_err(|e| e.in_operation("get", D::ENTITY))?;
    encode(&model)
}

/// "Unexpected Import Identifier" with the expected format.
pub fn import_error(format: &str, id: &str) -> ProviderError {
    ProviderError::diagnostic(
        Diagnostic::error("Unexpected Import Identifier").with_detail(format!(
            "Expected import identifier with format: {format}. Got: {id:?}"
        )),
    )
}

/// Splits `<guild_id>/<id|name>`. The second part is an ID if it looks like a snowflake.
pub fn guild_scoped_import(id: &str) -> ProviderResult<(String, Key<'_>)> {
    match id.split('/').collect::<Vec<_>>()[..] {
        [guild_id, target] if !guild_id.is_empty() && !target.is_empty() => {
            let key = if format::is_snowflake(target) {
                Key::Id(target)
            } else {
                Key::Name(target)
            };
            Ok((guild_id.to_string(), key))
        },
        _ => Err(import_error("<guild_id>/<id|name>", id)),
    }
}

/// A remote optional string as an attribute. Absent maps to `""`.
pub fn text(value: Option<&str>) -> Attr<String> {
    Attr::Known(value.unwrap_or_default().to_string())
}

/// A non-empty string attribute, for optional request fields.
pub fn non_empty(value: &Attr<String>) -> Option<String> {
    value.known().filter(|s| !s.is_empty()).cloned()
}

/// Fills an order-unstable list only when it is null, unknown or empty.
pub fn fill_list(target: &mut Attr<Vec<String>>, fresh: Vec<String>) {
    let unset = target.known().is_none_or(Vec::is_empty);
    if unset {
        *target = Attr::Known(fresh);
    }
}

/// Keeps a non-null prior list over whatever was fetched.
pub fn prefer_prior(target: &mut Attr<Vec<String>>, prior: Option<&Attr<Vec<String>>>) {
    if let Some(prior) = prior.filter(|p| !p.is_null()) {
        *target = prior.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::fake::FakeDiscord;

    #[test]
    fn test_guild_scoped_import() {
        let (guild, key) = guild_scoped_import("111111111111111111/222222222222222222").unwrap();
        assert_eq!(guild, "111111111111111111");
        assert_eq!(key, Key::Id("222222222222222222"));

        let (_, key) = guild_scoped_import("111111111111111111/general").unwrap();
        assert_eq!(key, Key::Name("general"));
    }

    #[test]
    fn test_guild_scoped_import_rejects_bad_shapes() {
        for id in ["", "111111111111111111", "111111111111111111/", "/general", "a/b/c"] {
            let err = guild_scoped_import(id).unwrap_err();
            let diagnostics = err.diagnostics();
            assert_eq!(diagnostics[0].summary, "Unexpected Import Identifier");
            assert_eq!(
                diagnostics[0].detail.as_deref(),
                Some(
                    format!(
                        "Expected import identifier with format: <guild_id>/<id|name>. Got: {id:?}"
                    )
                    .as_str()
                )
            );
        }
    }

    #[test]
    fn test_key_requires_id_or_name() {
        let fake = FakeDiscord::new();
        let cx = Context::data_source(&fake);
        let null = Attr::Null;
        let err = cx
            .key("channel", ("id", &null), ("name", &null))
            .unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics[0].summary, "Invalid Data Source Configuration");
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("Either the id or the name must be set for the channel data source.")
        );

        let empty = Attr::Known(String::new());
        let name = Attr::Known("general".to_string());
        let key = Context::resource(&fake)
            .key("channel", ("id", &empty), ("name", &name))
            .unwrap();
        assert_eq!(key, Key::Name("general"));
    }

    #[test]
    fn test_list_helpers() {
        let mut list = Attr::Unknown;
        fill_list(&mut list, vec!["A".into()]);
        assert_eq!(list, Attr::Known(vec!["A".to_string()]));

        fill_list(&mut list, vec!["B".into()]);
        assert_eq!(list, Attr::Known(vec!["A".to_string()]));

        let mut empty = Attr::Known(Vec::new());
        fill_list(&mut empty, vec!["B".into()]);
        assert_eq!(empty, Attr::Known(vec!["B".to_string()]));

        prefer_prior(&mut list, Some(&Attr::Null));
        assert_eq!(list, Attr::Known(vec!["A".to_string()]));
        prefer_prior(&mut list, Some(&Attr::Known(vec!["C".to_string()])));
        assert_eq!(list, Attr::Known(vec!["C".to_string()]));
    }

    #[test]
    fn test_text_and_non_empty() {
        assert_eq!(text(None), Attr::Known(String::new()));
        assert_eq!(text(Some("x")), Attr::Known("x".to_string()));
        assert_eq!(non_empty(&Attr::Known(String::new())), None);
        assert_eq!(non_empty(&Attr::Unknown), None);
        assert_eq!(non_empty(&Attr::Known("t".into())), Some("t".to_string()));
    }
}
