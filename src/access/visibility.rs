use super::ResolvedScope;
use crate::locations::LocationLevel;

/// Anything carrying the full five-level location chain of the place it
/// belongs to. Voter rows implement this.
pub trait Located {
    fn location_id(&self, level: LocationLevel) -> Option<&str>;
}

/// In-memory mirror of [`super::scope_condition`]: true exactly when the
/// record would survive the SQL restriction. A record missing the id at
/// the anchor level is treated as outside the scope, not as a wildcard.
pub fn is_accessible<T: Located>(scope: &ResolvedScope, record: &T) -> bool {
    match scope {
        ResolvedScope::Unrestricted => true,
        ResolvedScope::Anchored { level, anchor_id } => {
            record.location_id(*level) == Some(anchor_id.as_str())
        }
    }
}

/// Keep only the records visible under the scope, preserving their
/// relative order. The input slice is left untouched.
pub fn filter_accessible<T: Located + Clone>(scope: &ResolvedScope, records: &[T]) -> Vec<T> {
    records
        .iter()
        .filter(|r| is_accessible(scope, *r))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Row {
        tag: &'static str,
        upazila_id: Option<&'static str>,
    }

    impl Located for Row {
        fn location_id(&self, level: LocationLevel) -> Option<&str> {
            match level {
                LocationLevel::Upazila => self.upazila_id,
                _ => None,
            }
        }
    }

    fn upazila_scope(anchor: &str) -> ResolvedScope {
        ResolvedScope::Anchored {
            level: LocationLevel::Upazila,
            anchor_id: anchor.to_string(),
        }
    }

    #[test]
    fn keeps_matching_rows_in_order() {
        let rows = vec![
            Row { tag: "a", upazila_id: Some("u1") },
            Row { tag: "b", upazila_id: Some("u2") },
            Row { tag: "c", upazila_id: Some("u1") },
        ];
        let kept = filter_accessible(&upazila_scope("u1"), &rows);
        let tags: Vec<_> = kept.iter().map(|r| r.tag).collect();
        assert_eq!(tags, vec!["a", "c"]);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn missing_location_field_means_excluded() {
        let row = Row { tag: "x", upazila_id: None };
        assert!(!is_accessible(&upazila_scope("u1"), &row));
    }

    #[test]
    fn unrestricted_keeps_everything() {
        let rows = vec![
            Row { tag: "a", upazila_id: Some("u1") },
            Row { tag: "b", upazila_id: None },
        ];
        assert_eq!(filter_accessible(&ResolvedScope::Unrestricted, &rows).len(), 2);
    }

    #[test]
    fn filtering_is_idempotent() {
        let rows = vec![
            Row { tag: "a", upazila_id: Some("u1") },
            Row { tag: "b", upazila_id: Some("u2") },
        ];
        let scope = upazila_scope("u1");
        let once = filter_accessible(&scope, &rows);
        let twice = filter_accessible(&scope, &once);
        let once: Vec<_> = once.iter().map(|r| r.tag).collect();
        let twice: Vec<_> = twice.iter().map(|r| r.tag).collect();
        assert_eq!(once, twice);
    }
}
