//! Data sources with their own models. The resource-backed ones reuse the
//! resource handlers.

pub mod guild;
pub mod member;

pub use guild::GuildDataSource;
pub use member::MemberDataSource;
