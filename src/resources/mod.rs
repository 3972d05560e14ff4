//! Managed resources. Each module pairs a model with its [`ResourceHandler`].
//!
//! [`ResourceHandler`]: crate::handler::ResourceHandler

pub mod channel;
pub mod permissions;
pub mod role;
pub mod role_members;
pub mod webhook;

pub use channel::ChannelResource;
pub use permissions::PermissionsResource;
pub use role::RoleResource;
pub use role_members::RoleMembersResource;
pub use webhook::WebhookResource;
