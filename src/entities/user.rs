//! User search schema

use super::tables::{
    INVESTOR_PROFILES, REFRESH_TOKENS, STARTUP_MEMBERS, STARTUPS, USER_MODERATION_LOGS, USERS,
};
use crate::core::aggregate::{AggregateCondition, AggregateDefinition};
use crate::core::field::{FilterField, JoinStep};
use crate::core::predicate::{Comparator, Predicate};
use crate::core::registry::{EntityKind, EntitySchema};

/// Active WARNING entries in the moderation log
pub const ACTIVE_WARNINGS: &str = "active_warnings";

/// Refresh tokens that have not expired yet
pub const ACTIVE_SESSIONS: &str = "active_sessions";

fn investor_profile() -> JoinStep {
    JoinStep::new("investorProfile", INVESTOR_PROFILES, "id", "user_id")
}

fn owned_startups() -> JoinStep {
    JoinStep::new("startups", STARTUPS, "id", "owner_id")
}

fn memberships() -> JoinStep {
    JoinStep::new("memberships", STARTUP_MEMBERS, "id", "user_id")
}

pub fn schema() -> EntitySchema {
    EntitySchema::new(EntityKind::User, USERS)
        .field(FilterField::exact("id", "id"))
        // Text
        .field(FilterField::text("email", "email"))
        .field(FilterField::text("username", "username"))
        .field(FilterField::text("firstName", "first_name"))
        .field(FilterField::text("lastName", "last_name"))
        .field(FilterField::text("displayName", "display_name"))
        .field(FilterField::text("phoneNumber", "phone_number"))
        .field(FilterField::text("country", "country"))
        // Enums
        .field(FilterField::exact("role", "role"))
        .field(FilterField::exact("status", "status"))
        .field(FilterField::exact("authProvider", "auth_provider"))
        .field(FilterField::exact("suspensionType", "suspension_type"))
        // Dates
        .field(FilterField::date_range("createdAt", "created_at"))
        .field(FilterField::date_range("updatedAt", "updated_at"))
        .field(FilterField::date_range("lastLogin", "last_login_at"))
        .field(FilterField::date_range("suspendedAt", "suspended_at"))
        // Relations
        .field(FilterField::boolean(
            "hasInvestorProfile",
            Predicate::exists(investor_profile()),
        ))
        .field(FilterField::boolean(
            "isVerifiedInvestor",
            Predicate::exists_where(investor_profile(), Predicate::equals("is_verified", true)),
        ))
        .field(FilterField::boolean(
            "hasStartups",
            Predicate::exists(owned_startups()),
        ))
        .field(FilterField::boolean(
            "isMemberOfStartups",
            Predicate::exists_where(memberships(), Predicate::equals("is_active", true)),
        ))
        .field(FilterField::boolean(
            "isSuspended",
            Predicate::equals("status", "SUSPENDED"),
        ))
        // Aggregates
        .field(FilterField::aggregate_threshold(
            "minWarningCount",
            ACTIVE_WARNINGS,
            Comparator::Gte,
        ))
        .field(FilterField::aggregate_presence(
            "hasActiveSession",
            ACTIVE_SESSIONS,
        ))
        .aggregate(
            AggregateDefinition::new(ACTIVE_WARNINGS, USER_MODERATION_LOGS, "user_id")
                .when(AggregateCondition::equals("action_type", "WARNING"))
                .when(AggregateCondition::equals("is_active", true)),
        )
        .aggregate(
            AggregateDefinition::new(ACTIVE_SESSIONS, REFRESH_TOKENS, "user_id")
                .when(AggregateCondition::after_now("expiry_date")),
        )
        .search("email")
        .sortable(&[
            "created_at",
            "updated_at",
            "last_login_at",
            "email",
            "username",
            "display_name",
            "role",
            "status",
        ])
}
