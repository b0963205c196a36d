//! Startup search schema

use super::tables::{STARTUP_MEMBERS, STARTUPS, USERS};
use crate::core::field::{FilterField, JoinPath, JoinStep};
use crate::core::registry::{EntityKind, EntitySchema};

fn owner() -> JoinStep {
    JoinStep::new("owner", USERS, "owner_id", "id")
}

/// startups -> startup_members -> users
fn member_users() -> JoinPath {
    JoinPath::from(JoinStep::new("members", STARTUP_MEMBERS, "id", "startup_id"))
        .then(JoinStep::new("user", USERS, "user_id", "id"))
}

pub fn schema() -> EntitySchema {
    EntitySchema::new(EntityKind::Startup, STARTUPS)
        .field(FilterField::text("name", "name"))
        .field(FilterField::text("industry", "industry"))
        .field(FilterField::text("ownerEmail", "email").via(owner()))
        .field(FilterField::text("memberEmail", "email").via(member_users()))
        .field(FilterField::exact("stage", "stage"))
        .field(FilterField::exact("status", "status"))
        .field(FilterField::numeric_range("fundingGoal", "funding_goal"))
        .field(FilterField::numeric_range("raisedAmount", "raised_amount"))
        .field(FilterField::date_range("createdAt", "created_at"))
        .search("name")
        .search("tagline")
        .search("industry")
        .search("full_description")
        .search_via(owner(), "email")
        .sortable(&[
            "created_at",
            "name",
            "stage",
            "status",
            "funding_goal",
            "raised_amount",
        ])
}
