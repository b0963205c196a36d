//! Built-in searchable entities
//!
//! Each module declares one [`EntitySchema`](crate::core::registry::EntitySchema):
//! its filterable fields, the relations they reach through, the aggregates
//! they count and the columns the global query searches.

pub mod startup;
pub mod user;

/// Table names shared by the built-in schemas
pub mod tables {
    pub const USERS: &str = "users";
    pub const STARTUPS: &str = "startups";
    pub const STARTUP_MEMBERS: &str = "startup_members";
    pub const INVESTOR_PROFILES: &str = "investor_profiles";
    pub const USER_MODERATION_LOGS: &str = "user_moderation_logs";
    pub const REFRESH_TOKENS: &str = "refresh_tokens";
}
