use sea_orm::sea_query::Condition;
use sea_orm::ColumnTrait;

use super::ResolvedScope;
use crate::entities::voter;
use crate::locations::LocationLevel;

/// Voter table column holding the location id at the given level.
pub fn level_column(level: LocationLevel) -> voter::Column {
    match level {
        LocationLevel::Division => voter::Column::DivisionId,
        LocationLevel::District => voter::Column::DistrictId,
        LocationLevel::Upazila => voter::Column::UpazilaId,
        LocationLevel::Union => voter::Column::UnionId,
        LocationLevel::Village => voter::Column::VillageId,
    }
}

/// Condition restricting voter rows to the resolved scope.
///
/// An unrestricted scope becomes an empty conjunction, which sea-orm
/// renders as no WHERE clause at all. An anchored scope becomes a single
/// equality on the anchor level's column; because every row stores its
/// full ancestor chain, that one comparison covers the entire subtree.
pub fn scope_condition(scope: &ResolvedScope) -> Condition {
    match scope {
        ResolvedScope::Unrestricted => Condition::all(),
        ResolvedScope::Anchored { level, anchor_id } => {
            Condition::all().add(level_column(*level).eq(anchor_id.as_str()))
        }
    }
}

/// Combine the scope restriction with caller-supplied filters. Extra
/// filters narrow the scoped set; they can never widen it, since the
/// conditions are joined with AND.
pub fn scoped_condition(scope: &ResolvedScope, extra: Option<Condition>) -> Condition {
    let base = scope_condition(scope);
    match extra {
        Some(extra) => base.add(extra),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    fn sql(condition: Condition) -> String {
        voter::Entity::find()
            .filter(condition)
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn unrestricted_scope_adds_no_where_clause() {
        let query = sql(scope_condition(&ResolvedScope::Unrestricted));
        assert!(!query.contains("WHERE"), "unexpected WHERE in: {query}");
    }

    #[test]
    fn anchored_scope_is_a_single_equality() {
        let query = sql(scope_condition(&ResolvedScope::Anchored {
            level: LocationLevel::Upazila,
            anchor_id: "u1".into(),
        }));
        assert!(
            query.contains(r#""upazila_id" = 'u1'"#),
            "missing anchor equality in: {query}"
        );
        assert!(!query.contains("AND"), "extra predicates in: {query}");
    }

    #[test]
    fn extra_filters_narrow_rather_than_replace() {
        let scope = ResolvedScope::Anchored {
            level: LocationLevel::Village,
            anchor_id: "v1".into(),
        };
        let extra = Condition::all().add(voter::Column::Gender.eq("female"));
        let query = sql(scoped_condition(&scope, Some(extra)));
        assert!(query.contains(r#""village_id" = 'v1'"#), "{query}");
        assert!(query.contains(r#""gender" = 'female'"#), "{query}");
        assert!(query.contains("AND"), "{query}");
    }

    #[test]
    fn no_extra_filter_leaves_the_scope_alone() {
        let scope = ResolvedScope::Anchored {
            level: LocationLevel::District,
            anchor_id: "t2".into(),
        };
        assert_eq!(
            sql(scoped_condition(&scope, None)),
            sql(scope_condition(&scope))
        );
    }
}
