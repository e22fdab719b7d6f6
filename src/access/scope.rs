use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AccessError, Role};
use crate::locations::{LocationLevel, LocationStore};

/// The location anchor a user is assigned at approval time. Only the
/// fields down to the role's own level are populated; descendant fields
/// stay empty. Immutable after approval except by explicit reassignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccessScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upazila_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub union_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village_id: Option<String>,
}

impl AccessScope {
    pub fn id_at(&self, level: LocationLevel) -> Option<&str> {
        match level {
            LocationLevel::Division => self.division_id.as_deref(),
            LocationLevel::District => self.district_id.as_deref(),
            LocationLevel::Upazila => self.upazila_id.as_deref(),
            LocationLevel::Union => self.union_id.as_deref(),
            LocationLevel::Village => self.village_id.as_deref(),
        }
    }
}

/// Output of [`resolve_scope`]: either no location restriction at all, or
/// a single anchor at the role's level. Descendant expansion is never
/// materialized — records carry all ancestor ids, so one equality check
/// on the anchor level captures the whole subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedScope {
    Unrestricted,
    Anchored {
        level: LocationLevel,
        anchor_id: String,
    },
}

/// Resolve a user's role and assigned scope to the anchor that scopes
/// every query and visibility decision made on their behalf.
///
/// super_admin resolves to [`ResolvedScope::Unrestricted`] whatever the
/// scope contains, including nothing. Any other role requires the id at
/// its own level; a missing anchor is an authorization failure
/// ([`AccessError::MissingScope`]), never a silent empty or unrestricted
/// result.
pub fn resolve_scope(role: Role, scope: &AccessScope) -> Result<ResolvedScope, AccessError> {
    let Some(level) = role.anchor_level() else {
        return Ok(ResolvedScope::Unrestricted);
    };

    match scope.id_at(level) {
        Some(anchor_id) if !anchor_id.is_empty() => Ok(ResolvedScope::Anchored {
            level,
            anchor_id: anchor_id.to_string(),
        }),
        _ => Err(AccessError::MissingScope { role, level }),
    }
}

/// Validate an assigned scope against the location tree. Called when a
/// scope is granted (user approval, scope reassignment), not on every
/// resolution. Checks that the anchor exists at the role's level and
/// that every populated ancestor field equals the anchor's real ancestor.
pub fn verify_scope_consistency(
    role: Role,
    scope: &AccessScope,
    store: &LocationStore,
) -> Result<(), AccessError> {
    let resolved = resolve_scope(role, scope)?;
    let ResolvedScope::Anchored { level, anchor_id } = resolved else {
        return Ok(());
    };

    let inconsistent = |detail: String| AccessError::InconsistentScope { role, detail };

    let anchor = store
        .node(&anchor_id)
        .ok_or_else(|| inconsistent(format!("anchor '{anchor_id}' is not in the location tree")))?;
    if anchor.level != level {
        return Err(inconsistent(format!(
            "anchor '{anchor_id}' is a {}, expected a {level}",
            anchor.level
        )));
    }

    let ancestors = store
        .ancestors(&anchor_id)
        .map_err(|e| inconsistent(e.to_string()))?;
    for ancestor in ancestors {
        if let Some(claimed) = scope.id_at(ancestor.level) {
            if claimed != ancestor.id {
                return Err(inconsistent(format!(
                    "scope names {} '{claimed}' but anchor '{anchor_id}' lies under '{}'",
                    ancestor.level, ancestor.id
                )));
            }
        }
    }

    // Fields below the anchor level must be empty at assignment time.
    for l in [
        LocationLevel::District,
        LocationLevel::Upazila,
        LocationLevel::Union,
        LocationLevel::Village,
    ] {
        if l.depth() > level.depth() && scope.id_at(l).is_some() {
            return Err(inconsistent(format!(
                "scope populates the {l} field below the {level} anchor"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations::test_fixtures::sample_store;
    use strum::IntoEnumIterator;

    fn upazila_scope() -> AccessScope {
        AccessScope {
            division_id: Some("d1".into()),
            district_id: Some("t1".into()),
            upazila_id: Some("u1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn super_admin_is_unrestricted_even_with_empty_scope() {
        let resolved = resolve_scope(Role::SuperAdmin, &AccessScope::default()).unwrap();
        assert_eq!(resolved, ResolvedScope::Unrestricted);
    }

    #[test]
    fn anchors_at_the_role_level() {
        let resolved = resolve_scope(Role::UpazilaAdmin, &upazila_scope()).unwrap();
        assert_eq!(
            resolved,
            ResolvedScope::Anchored {
                level: LocationLevel::Upazila,
                anchor_id: "u1".into(),
            }
        );
    }

    #[test]
    fn every_non_super_role_requires_its_anchor() {
        for role in Role::iter().filter(|r| *r != Role::SuperAdmin) {
            let err = resolve_scope(role, &AccessScope::default()).unwrap_err();
            assert_eq!(
                err,
                AccessError::MissingScope {
                    role,
                    level: role.anchor_level().unwrap(),
                }
            );
        }
    }

    #[test]
    fn empty_string_anchor_is_missing() {
        let scope = AccessScope {
            village_id: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_scope(Role::VillageAdmin, &scope),
            Err(AccessError::MissingScope { .. })
        ));
    }

    #[test]
    fn consistent_scope_passes_verification() {
        let store = sample_store();
        assert!(verify_scope_consistency(Role::UpazilaAdmin, &upazila_scope(), &store).is_ok());
    }

    #[test]
    fn ancestor_mismatch_is_inconsistent() {
        let store = sample_store();
        let scope = AccessScope {
            division_id: Some("d2".into()), // u1 actually lies under d1
            district_id: Some("t1".into()),
            upazila_id: Some("u1".into()),
            ..Default::default()
        };
        assert!(matches!(
            verify_scope_consistency(Role::UpazilaAdmin, &scope, &store),
            Err(AccessError::InconsistentScope { .. })
        ));
    }

    #[test]
    fn unknown_anchor_is_inconsistent() {
        let store = sample_store();
        let scope = AccessScope {
            division_id: Some("d404".into()),
            ..Default::default()
        };
        assert!(matches!(
            verify_scope_consistency(Role::DivisionAdmin, &scope, &store),
            Err(AccessError::InconsistentScope { .. })
        ));
    }

    #[test]
    fn fields_below_the_anchor_are_rejected_at_assignment() {
        let store = sample_store();
        let mut scope = upazila_scope();
        scope.village_id = Some("v1".into());
        assert!(matches!(
            verify_scope_consistency(Role::UpazilaAdmin, &scope, &store),
            Err(AccessError::InconsistentScope { .. })
        ));
    }
}
