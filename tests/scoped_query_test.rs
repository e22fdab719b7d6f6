use rstest::rstest;
use sea_orm::sea_query::Condition;
use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

use voterbase_api::access::{scope_condition, scoped_condition, ResolvedScope};
use voterbase_api::entities::voter;
use voterbase_api::locations::LocationLevel;
use voterbase_api::services::voters::VoterFilter;

fn sql(condition: Condition) -> String {
    voter::Entity::find()
        .filter(condition)
        .build(DbBackend::Postgres)
        .to_string()
}

#[test]
fn unrestricted_scope_emits_no_where_clause() {
    let query = sql(scope_condition(&ResolvedScope::Unrestricted));
    assert!(!query.contains("WHERE"), "unexpected WHERE in: {query}");
}

#[rstest]
#[case(LocationLevel::Division, "division_id")]
#[case(LocationLevel::District, "district_id")]
#[case(LocationLevel::Upazila, "upazila_id")]
#[case(LocationLevel::Union, "union_id")]
#[case(LocationLevel::Village, "village_id")]
fn anchored_scope_is_one_equality_on_the_anchor_column(
    #[case] level: LocationLevel,
    #[case] column: &str,
) {
    let query = sql(scope_condition(&ResolvedScope::Anchored {
        level,
        anchor_id: "x1".to_string(),
    }));
    assert!(
        query.contains(&format!(r#""{column}" = 'x1'"#)),
        "missing anchor equality in: {query}"
    );
    // The subtree is covered by the denormalized ancestor ids; no other
    // location column may appear.
    assert!(!query.contains("AND"), "extra predicates in: {query}");
    assert!(!query.contains("IN ("), "descendant expansion in: {query}");
}

#[test]
fn drill_down_filters_narrow_the_scope() {
    let scope = ResolvedScope::Anchored {
        level: LocationLevel::District,
        anchor_id: "t1".to_string(),
    };
    let filter = VoterFilter {
        gender: Some("female".to_string()),
        vote_intent: Some("undecided".to_string()),
        ..Default::default()
    };
    let query = sql(scoped_condition(&scope, filter.condition()));
    assert!(query.contains(r#""district_id" = 't1'"#), "{query}");
    assert!(query.contains(r#""gender" = 'female'"#), "{query}");
    assert!(query.contains(r#""vote_intent" = 'undecided'"#), "{query}");
    assert!(query.contains("AND"), "{query}");
}

#[test]
fn a_location_filter_cannot_replace_the_scope_restriction() {
    // Asking for another village narrows to the empty set rather than
    // escaping the anchor.
    let scope = ResolvedScope::Anchored {
        level: LocationLevel::Village,
        anchor_id: "v1".to_string(),
    };
    let filter = VoterFilter {
        village_id: Some("v2".to_string()),
        ..Default::default()
    };
    let query = sql(scoped_condition(&scope, filter.condition()));
    assert!(query.contains(r#""village_id" = 'v1'"#), "{query}");
    assert!(query.contains(r#""village_id" = 'v2'"#), "{query}");
    assert!(query.contains("AND"), "{query}");
}

#[test]
fn search_matches_name_or_phone_within_the_scope() {
    let scope = ResolvedScope::Anchored {
        level: LocationLevel::Upazila,
        anchor_id: "u1".to_string(),
    };
    let filter = VoterFilter {
        search: Some("01711".to_string()),
        ..Default::default()
    };
    let query = sql(scoped_condition(&scope, filter.condition()));
    assert!(query.contains(r#""upazila_id" = 'u1'"#), "{query}");
    assert!(query.contains(r#""name" LIKE '%01711%'"#), "{query}");
    assert!(query.contains(r#""phone" LIKE '%01711%'"#), "{query}");
    assert!(query.contains("OR"), "{query}");
}

#[test]
fn empty_filter_leaves_the_scope_condition_alone() {
    let scope = ResolvedScope::Anchored {
        level: LocationLevel::Union,
        anchor_id: "n1".to_string(),
    };
    assert_eq!(
        sql(scoped_condition(&scope, VoterFilter::default().condition())),
        sql(scope_condition(&scope))
    );
}
