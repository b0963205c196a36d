//! Shared test harness for query executor testing
//!
//! Provides a fixed dataset of five users and three startups with their
//! moderation logs, sessions, investor profiles and memberships, plus
//! helpers to run filter requests against any `QueryExecutor`.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod search_harness;
//! use search_harness::*;
//!
//! executor_tests!(seeded_store());
//! ```

#![allow(dead_code)]

#[macro_use]
mod executor_tests;

use chrono::{DateTime, TimeZone, Utc};
use sieve::core::executor::QueryExecutor;
use sieve::core::query::PageRequest;
use sieve::core::registry::{EntityKind, FieldRegistry};
use sieve::core::request::FilterRequest;
use sieve::core::service::AdminSearch;
use sieve::entities::tables;
use sieve::row;
use sieve::storage::InMemoryStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Fixture ids
// ---------------------------------------------------------------------------

pub const U1: Uuid = Uuid::from_u128(1);
pub const U2: Uuid = Uuid::from_u128(2);
pub const U3: Uuid = Uuid::from_u128(3);
pub const U4: Uuid = Uuid::from_u128(4);
pub const U5: Uuid = Uuid::from_u128(5);

pub const ALL_USERS: [Uuid; 5] = [U1, U2, U3, U4, U5];

pub const ACME: Uuid = Uuid::from_u128(101);
pub const BLUE: Uuid = Uuid::from_u128(102);
pub const GREEN: Uuid = Uuid::from_u128(103);

pub const ALL_STARTUPS: [Uuid; 3] = [ACME, BLUE, GREEN];

/// The instant every fixture search is evaluated at
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn next_id() -> Uuid {
    Uuid::new_v4()
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// Users U1..U5
///
/// | user | email   | role     | status    | country | created_at | active warnings | live session |
/// |------|---------|----------|-----------|---------|------------|-----------------|--------------|
/// | U1   | a@x.com | ADMIN    | ACTIVE    | FR      | 2023-12-31 | 0               | no (expired) |
/// | U2   | b@x.com | USER     | ACTIVE    | NULL    | 2024-01-01 | 1               | yes          |
/// | U3   | c@y.com | USER     | SUSPENDED | US      | 2024-03-15 | 2               | no           |
/// | U4   | d@y.com | INVESTOR | ACTIVE    | FR      | 2024-06-30 | 3               | yes          |
/// | U5   | e@y.com | USER     | BANNED    | NULL    | 2024-07-01 | 0               | no           |
pub fn seed(store: &InMemoryStore) -> anyhow::Result<()> {
    store.insert_many(
        tables::USERS,
        [
            row! {
                "id" => U1, "email" => "a@x.com", "username" => "alice", "display_name" => "Alice",
                "role" => "ADMIN", "status" => "ACTIVE", "country" => "FR",
                "created_at" => at(2023, 12, 31), "last_login_at" => at(2024, 12, 20),
            },
            row! {
                "id" => U2, "email" => "b@x.com", "username" => "bob", "display_name" => "Bob",
                "role" => "USER", "status" => "ACTIVE", "country" => None::<String>,
                "created_at" => at(2024, 1, 1), "last_login_at" => None::<DateTime<Utc>>,
            },
            row! {
                "id" => U3, "email" => "c@y.com", "username" => "carol", "display_name" => "Carol",
                "role" => "USER", "status" => "SUSPENDED", "country" => "US",
                "created_at" => at(2024, 3, 15), "last_login_at" => at(2024, 3, 20),
                "suspended_at" => at(2024, 4, 1),
            },
            row! {
                "id" => U4, "email" => "d@y.com", "username" => "dave", "display_name" => "Dave",
                "role" => "INVESTOR", "status" => "ACTIVE", "country" => "FR",
                "created_at" => at(2024, 6, 30), "last_login_at" => at(2024, 12, 31),
            },
            row! {
                "id" => U5, "email" => "e@y.com", "username" => "erin", "display_name" => "Erin",
                "role" => "USER", "status" => "BANNED", "country" => None::<String>,
                "created_at" => at(2024, 7, 1), "last_login_at" => None::<DateTime<Utc>>,
            },
        ],
    )?;

    let mut logs = Vec::new();
    for (user, warnings) in [(U2, 1), (U3, 2), (U4, 3)] {
        for _ in 0..warnings {
            logs.push(row! {
                "id" => next_id(), "user_id" => user, "action_type" => "WARNING", "is_active" => true,
            });
        }
    }
    // Entries that must not count as active warnings
    logs.push(row! { "id" => next_id(), "user_id" => U1, "action_type" => "WARNING", "is_active" => false });
    logs.push(row! { "id" => next_id(), "user_id" => U2, "action_type" => "WARNING", "is_active" => false });
    logs.push(row! { "id" => next_id(), "user_id" => U5, "action_type" => "SUSPENSION", "is_active" => true });
    logs.push(row! { "id" => next_id(), "user_id" => U3, "action_type" => "SUSPENSION", "is_active" => true });
    store.insert_many(tables::USER_MODERATION_LOGS, logs)?;

    store.insert_many(
        tables::REFRESH_TOKENS,
        [
            row! { "id" => next_id(), "user_id" => U1, "expiry_date" => at(2024, 12, 1) },
            row! { "id" => next_id(), "user_id" => U2, "expiry_date" => at(2025, 2, 1) },
            row! { "id" => next_id(), "user_id" => U4, "expiry_date" => at(2025, 6, 1) },
            row! { "id" => next_id(), "user_id" => U4, "expiry_date" => at(2024, 6, 1) },
            // Expires exactly at `now`: not live
            row! { "id" => next_id(), "user_id" => U5, "expiry_date" => now() },
        ],
    )?;

    store.insert_many(
        tables::INVESTOR_PROFILES,
        [
            row! { "id" => next_id(), "user_id" => U3, "is_verified" => false },
            row! { "id" => next_id(), "user_id" => U4, "is_verified" => true },
        ],
    )?;

    store.insert_many(
        tables::STARTUPS,
        [
            row! {
                "id" => ACME, "owner_id" => U1, "name" => "Acme Robotics",
                "tagline" => "Robots for every warehouse", "industry" => "Robotics",
                "full_description" => "Autonomous picking arms", "stage" => "SEED",
                "status" => "ACTIVE", "funding_goal" => 500_000.0, "raised_amount" => 120_000.0,
                "created_at" => at(2024, 2, 1),
            },
            row! {
                "id" => BLUE, "owner_id" => U3, "name" => "Blue Ledger",
                "tagline" => "Payments without borders", "industry" => "Fintech",
                "full_description" => "Cross-border settlement", "stage" => "SERIES_A",
                "status" => "ACTIVE", "funding_goal" => 2_000_000.0, "raised_amount" => 2_000_000.0,
                "created_at" => at(2024, 5, 1),
            },
            row! {
                "id" => GREEN, "owner_id" => U4, "name" => "Green Rows",
                "tagline" => "The acme of vertical farming", "industry" => "Agriculture",
                "full_description" => "Indoor farms", "stage" => "IDEA",
                "status" => "PENDING", "funding_goal" => None::<f64>, "raised_amount" => 0.0,
                "created_at" => at(2024, 8, 1),
            },
        ],
    )?;

    store.insert_many(
        tables::STARTUP_MEMBERS,
        [
            row! { "id" => next_id(), "startup_id" => ACME, "user_id" => U2, "is_active" => true },
            row! { "id" => next_id(), "startup_id" => ACME, "user_id" => U3, "is_active" => true },
            row! { "id" => next_id(), "startup_id" => BLUE, "user_id" => U5, "is_active" => true },
            row! { "id" => next_id(), "startup_id" => GREEN, "user_id" => U1, "is_active" => false },
        ],
    )?;

    Ok(())
}

/// A fresh in-memory store holding the fixture dataset
pub fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    seed(&store).expect("fixture should load");
    store
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn search<E: QueryExecutor>(executor: E) -> AdminSearch<E> {
    AdminSearch::new(Arc::new(FieldRegistry::standard().unwrap()), executor)
}

pub fn users() -> FilterRequest {
    FilterRequest::new(EntityKind::User)
}

pub fn startups() -> FilterRequest {
    FilterRequest::new(EntityKind::Startup)
}

/// Every matching id, as a set
pub async fn matches<E: QueryExecutor>(search: &AdminSearch<E>, request: &FilterRequest) -> BTreeSet<Uuid> {
    let page = search
        .search_at(request, PageRequest::new(1, 100), now())
        .await
        .expect("search should succeed");
    page.data.into_iter().collect()
}

pub fn set(ids: &[Uuid]) -> BTreeSet<Uuid> {
    ids.iter().copied().collect()
}

/// Ids in `universe` not in `ids`
pub fn complement(universe: &[Uuid], ids: &BTreeSet<Uuid>) -> BTreeSet<Uuid> {
    universe.iter().copied().filter(|id| !ids.contains(id)).collect()
}
