//! Macro-generated conformance suite for `QueryExecutor` implementations.
//!
//! The `executor_tests!` macro generates a test module that runs composed
//! filter requests against an executor holding the harness dataset and
//! checks the resulting id sets.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod search_harness;
//!
//! use search_harness::*;
//!
//! executor_tests!(seeded_store());
//! ```
//!
//! # Generated Tests
//!
//! ## Scenarios
//! - `test_s1_email_substring` / `test_s1_email_substring_negated`
//! - `test_s2_email_alternatives` / `test_s2_email_alternatives_negated`
//! - `test_s3_warning_threshold` / `test_s3_warning_threshold_negated`
//! - `test_s4_no_session_negated_means_has_session`
//! - `test_s5_date_range_and_email`
//!
//! ## Properties
//! - identity, negation complement, AND intersection, OR within a field,
//!   the intent/negate table, inclusive ranges, inert negate-only clauses
//!
//! ## Joins, aggregates and paging
//! - owner/member email through joins, numeric ranges with NULLs, global
//!   query, sorting and pagination

/// Generate the `QueryExecutor` conformance suite.
///
/// `$factory` must evaluate to an executor loaded with the harness dataset
/// (see `seed`). It is re-evaluated for each test.
macro_rules! executor_tests {
    ($factory:expr) => {
        mod executor_contract_tests {
            use super::*;
            use sieve::core::error::{FilterError, SieveError};
            use sieve::core::field::FieldValue;
            use sieve::core::query::PageRequest;

            // ==================================================================
            // Scenarios
            // ==================================================================

            #[tokio::test]
            async fn test_s1_email_substring() {
                let search = search($factory);
                let hits = matches(&search, &users().text("email", "x.com")).await;
                assert_eq!(hits, set(&[U1, U2]));
            }

            #[tokio::test]
            async fn test_s1_email_substring_negated() {
                let search = search($factory);
                let request = users().text("email", "x.com").negate("email");
                assert_eq!(matches(&search, &request).await, set(&[U3, U4, U5]));
            }

            #[tokio::test]
            async fn test_s2_email_alternatives() {
                let search = search($factory);
                let hits = matches(&search, &users().text("email", "x.com,y.com")).await;
                assert_eq!(hits, set(&ALL_USERS));
            }

            #[tokio::test]
            async fn test_s2_email_alternatives_negated() {
                let search = search($factory);
                let request = users().text("email", "x.com,y.com").negate("email");
                assert!(matches(&search, &request).await.is_empty());
            }

            #[tokio::test]
            async fn test_s3_warning_threshold() {
                let search = search($factory);
                let hits = matches(&search, &users().count("minWarningCount", 2)).await;
                assert_eq!(hits, set(&[U3, U4]));
            }

            #[tokio::test]
            async fn test_s3_warning_threshold_negated() {
                let search = search($factory);
                let request = users().count("minWarningCount", 2).negate("minWarningCount");
                assert_eq!(matches(&search, &request).await, set(&[U1, U2, U5]));
            }

            #[tokio::test]
            async fn test_s4_no_session_negated_means_has_session() {
                let search = search($factory);
                let request = users().flag("hasActiveSession", false).negate("hasActiveSession");
                assert_eq!(matches(&search, &request).await, set(&[U2, U4]));
            }

            #[tokio::test]
            async fn test_s5_date_range_and_email() {
                let search = search($factory);
                let range = users().between("createdAt", at(2024, 1, 1), at(2024, 6, 30));
                let email = users().text("email", "y.com");
                let both = users()
                    .between("createdAt", at(2024, 1, 1), at(2024, 6, 30))
                    .text("email", "y.com");

                let by_range = matches(&search, &range).await;
                let by_email = matches(&search, &email).await;
                let expected: std::collections::BTreeSet<_> =
                    by_range.intersection(&by_email).copied().collect();

                assert_eq!(by_range, set(&[U2, U3, U4]));
                assert_eq!(matches(&search, &both).await, expected);
                assert_eq!(expected, set(&[U3, U4]));
            }

            // ==================================================================
            // Properties
            // ==================================================================

            #[tokio::test]
            async fn test_empty_request_matches_everything() {
                let search = search($factory);
                assert_eq!(matches(&search, &users()).await, set(&ALL_USERS));
                assert_eq!(matches(&search, &startups()).await, set(&ALL_STARTUPS));
            }

            #[tokio::test]
            async fn test_negation_is_complement_even_with_nulls() {
                let search = search($factory);
                let clauses = [
                    users().text("country", "FR"),
                    users().text("role", "USER"),
                    users().text("status", "ACTIVE,BANNED"),
                    users().between("lastLogin", at(2024, 12, 1), at(2025, 1, 1)),
                    users().flag("isSuspended", true),
                    users().flag("hasInvestorProfile", true),
                    users().flag("isVerifiedInvestor", true),
                    users().flag("hasStartups", true),
                    users().flag("isMemberOfStartups", true),
                    users().count("minWarningCount", 1),
                    users().flag("hasActiveSession", true),
                ];
                for request in clauses {
                    let field = request.clauses().next().unwrap().0.to_string();
                    let hits = matches(&search, &request).await;
                    let negated = matches(&search, &request.clone().negate(&field)).await;
                    assert_eq!(negated, complement(&ALL_USERS, &hits), "field {}", field);
                }
            }

            #[tokio::test]
            async fn test_and_is_intersection() {
                let search = search($factory);
                let role = matches(&search, &users().text("role", "USER")).await;
                let warned = matches(&search, &users().count("minWarningCount", 1)).await;
                let both = users().text("role", "USER").count("minWarningCount", 1);
                let expected: std::collections::BTreeSet<_> = role.intersection(&warned).copied().collect();
                assert_eq!(matches(&search, &both).await, expected);
                assert_eq!(expected, set(&[U2, U3]));
            }

            #[tokio::test]
            async fn test_or_within_field_and_its_negation() {
                let search = search($factory);
                let admin = matches(&search, &users().text("role", "ADMIN")).await;
                let investor = matches(&search, &users().text("role", "INVESTOR")).await;
                let union: std::collections::BTreeSet<_> = admin.union(&investor).copied().collect();

                let either = users().text("role", "ADMIN, INVESTOR");
                assert_eq!(matches(&search, &either).await, union);
                assert_eq!(
                    matches(&search, &either.negate("role")).await,
                    complement(&ALL_USERS, &union)
                );
            }

            #[tokio::test]
            async fn test_exact_is_case_sensitive() {
                let search = search($factory);
                assert!(matches(&search, &users().text("role", "admin")).await.is_empty());
                assert_eq!(matches(&search, &users().text("email", "A@X")).await, set(&[U1]));
            }

            #[tokio::test]
            async fn test_intent_negate_table() {
                let search = search($factory);
                let with_session = set(&[U2, U4]);
                let without_session = complement(&ALL_USERS, &with_session);
                for (intent, negate, expected) in [
                    (true, false, &with_session),
                    (true, true, &without_session),
                    (false, false, &without_session),
                    (false, true, &with_session),
                ] {
                    let mut request = users().flag("hasActiveSession", intent);
                    if negate {
                        request = request.negate("hasActiveSession");
                    }
                    assert_eq!(
                        &matches(&search, &request).await,
                        expected,
                        "intent={} negate={}",
                        intent,
                        negate
                    );
                }

                let suspended = set(&[U3]);
                let request = users().flag("isSuspended", false).negate("isSuspended");
                assert_eq!(matches(&search, &request).await, suspended);
            }

            #[tokio::test]
            async fn test_range_bounds_are_inclusive() {
                let search = search($factory);
                let exact_lower = users().range("createdAt", Some(at(2024, 1, 1).into()), None);
                assert_eq!(matches(&search, &exact_lower).await, set(&[U2, U3, U4, U5]));

                let exact_upper = users().range("createdAt", None, Some(at(2024, 6, 30).into()));
                assert_eq!(matches(&search, &exact_upper).await, set(&[U1, U2, U3, U4]));

                let single_day = users().between("createdAt", at(2024, 3, 15), at(2024, 3, 15));
                assert_eq!(matches(&search, &single_day).await, set(&[U3]));
            }

            #[tokio::test]
            async fn test_negate_only_clause_is_inert() {
                let search = search($factory);
                let request = users()
                    .negate("email")
                    .text("country", "  ")
                    .negate("country")
                    .range("createdAt", None, None)
                    .negate("createdAt")
                    .negate("hasActiveSession");
                assert_eq!(matches(&search, &request).await, set(&ALL_USERS));

                let with_email = users().text("email", "x.com");
                let with_noise = users().text("email", "x.com").negate("displayName");
                assert_eq!(
                    matches(&search, &with_email).await,
                    matches(&search, &with_noise).await
                );
            }

            // ==================================================================
            // Joins and aggregates
            // ==================================================================

            #[tokio::test]
            async fn test_relation_flags() {
                let search = search($factory);
                assert_eq!(
                    matches(&search, &users().flag("hasInvestorProfile", true)).await,
                    set(&[U3, U4])
                );
                assert_eq!(
                    matches(&search, &users().flag("isVerifiedInvestor", true)).await,
                    set(&[U4])
                );
                assert_eq!(
                    matches(&search, &users().flag("hasStartups", true)).await,
                    set(&[U1, U3, U4])
                );
                // U1's only membership is inactive
                assert_eq!(
                    matches(&search, &users().flag("isMemberOfStartups", true)).await,
                    set(&[U2, U3, U5])
                );
            }

            #[tokio::test]
            async fn test_warning_count_ignores_inactive_and_other_actions() {
                let search = search($factory);
                assert_eq!(
                    matches(&search, &users().count("minWarningCount", 1)).await,
                    set(&[U2, U3, U4])
                );
                assert_eq!(
                    matches(&search, &users().count("minWarningCount", 0)).await,
                    set(&ALL_USERS)
                );
                assert_eq!(
                    matches(&search, &users().count("minWarningCount", 4)).await,
                    set(&[])
                );
            }

            #[tokio::test]
            async fn test_owner_email_through_join() {
                let search = search($factory);
                let request = startups().text("ownerEmail", "y.com");
                assert_eq!(matches(&search, &request).await, set(&[BLUE, GREEN]));
                let negated = request.negate("ownerEmail");
                assert_eq!(matches(&search, &negated).await, set(&[ACME]));
            }

            #[tokio::test]
            async fn test_member_email_has_exists_semantics() {
                let search = search($factory);
                // ACME has members b@x.com and c@y.com
                let request = startups().text("memberEmail", "b@x");
                assert_eq!(matches(&search, &request).await, set(&[ACME]));
                let negated = request.negate("memberEmail");
                assert_eq!(matches(&search, &negated).await, set(&[BLUE, GREEN]));

                // GREEN's only member is on x.com
                let none_on_y = startups().text("memberEmail", "y.com").negate("memberEmail");
                assert_eq!(matches(&search, &none_on_y).await, set(&[GREEN]));
            }

            #[tokio::test]
            async fn test_numeric_range_with_null_column() {
                let search = search($factory);
                let request = startups().range("fundingGoal", Some(FieldValue::Integer(1_000_000)), None);
                assert_eq!(matches(&search, &request).await, set(&[BLUE]));

                // GREEN has no funding goal and lands on the negated side
                let negated = request.negate("fundingGoal");
                assert_eq!(matches(&search, &negated).await, set(&[ACME, GREEN]));

                let raised = startups().between("raisedAmount", 0i64, 120_000i64);
                assert_eq!(matches(&search, &raised).await, set(&[ACME, GREEN]));
            }

            #[tokio::test]
            async fn test_startup_exact_and_date_fields() {
                let search = search($factory);
                let active = startups().text("status", "ACTIVE").text("stage", "SEED,SERIES_A");
                assert_eq!(matches(&search, &active).await, set(&[ACME, BLUE]));

                let recent = startups().range("createdAt", Some(at(2024, 5, 1).into()), None);
                assert_eq!(matches(&search, &recent).await, set(&[BLUE, GREEN]));
            }

            #[tokio::test]
            async fn test_global_query_spans_columns_and_owner() {
                let search = search($factory);
                // ACME by name, GREEN by tagline
                assert_eq!(
                    matches(&search, &startups().global_query("ACME")).await,
                    set(&[ACME, GREEN])
                );
                // Owner email of BLUE
                assert_eq!(
                    matches(&search, &startups().global_query("c@y")).await,
                    set(&[BLUE])
                );
                assert_eq!(
                    matches(&search, &users().global_query(" X.COM ")).await,
                    set(&[U1, U2])
                );
                assert_eq!(
                    matches(&search, &users().global_query("   ")).await,
                    set(&ALL_USERS)
                );
            }

            #[tokio::test]
            async fn test_global_query_combines_with_fields() {
                let search = search($factory);
                let request = startups().global_query("acme").text("industry", "robot");
                assert_eq!(matches(&search, &request).await, set(&[ACME]));
            }

            // ==================================================================
            // Paging, sorting and errors
            // ==================================================================

            #[tokio::test]
            async fn test_pagination_metadata() {
                let search = search($factory);
                let page = search
                    .search_at(&users(), PageRequest::new(2, 2), now())
                    .await
                    .unwrap();
                assert_eq!(page.data, vec![U3, U4]);
                assert_eq!(page.pagination.total, 5);
                assert_eq!(page.pagination.total_pages, 3);
                assert!(page.pagination.has_next);
                assert!(page.pagination.has_prev);
            }

            #[tokio::test]
            async fn test_sorted_descending() {
                let search = search($factory);
                let page = search
                    .search_at(&users(), PageRequest::new(1, 5).sorted_by("created_at:desc"), now())
                    .await
                    .unwrap();
                assert_eq!(page.data, vec![U5, U4, U3, U2, U1]);
            }

            #[tokio::test]
            async fn test_sort_puts_nulls_last() {
                let search = search($factory);
                let page = search
                    .search_at(&users(), PageRequest::new(1, 5).sorted_by("last_login_at:asc"), now())
                    .await
                    .unwrap();
                assert_eq!(page.data, vec![U3, U1, U4, U2, U5]);
            }

            #[tokio::test]
            async fn test_no_results_is_success() {
                let search = search($factory);
                let page = search
                    .search_at(&users().text("email", "nobody"), PageRequest::default(), now())
                    .await
                    .unwrap();
                assert!(page.data.is_empty());
                assert_eq!(page.pagination.total, 0);
                assert!(!page.pagination.has_next);
            }

            #[tokio::test]
            async fn test_page_past_the_end_is_empty() {
                let search = search($factory);
                let page: PageRequest =
                    serde_json::from_value(serde_json::json!({"page": u64::MAX, "limit": 20})).unwrap();
                let page = search.search_at(&users(), page, now()).await.unwrap();
                assert!(page.data.is_empty());
                assert_eq!(page.pagination.total, 5);
                assert!(!page.pagination.has_next);
                assert!(page.pagination.has_prev);
            }

            #[tokio::test]
            async fn test_count_matches_search_total() {
                let search = search($factory);
                let request = users().text("email", "y.com");
                assert_eq!(search.count(&request).await.unwrap(), 3);
            }

            #[tokio::test]
            async fn test_unknown_field_rejected() {
                let search = search($factory);
                let err = search
                    .search_at(&users().text("nickname", "x"), PageRequest::default(), now())
                    .await
                    .unwrap_err();
                assert!(matches!(err, SieveError::Filter(FilterError::UnknownField { .. })));
            }

            #[tokio::test]
            async fn test_inverted_range_rejected() {
                let search = search($factory);
                let request = users().between("createdAt", at(2024, 6, 30), at(2024, 1, 1));
                let err = search
                    .search_at(&request, PageRequest::default(), now())
                    .await
                    .unwrap_err();
                assert!(matches!(err, SieveError::Filter(FilterError::InvalidRange { .. })));
            }
        }
    };
}
