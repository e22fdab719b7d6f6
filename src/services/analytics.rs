use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::access::{resolve_scope, scoped_condition, ResolvedScope};
use crate::auth::AuthUser;
use crate::cache::CacheBackend;
use crate::db::DbPool;
use crate::entities::voter;
use crate::errors::ServiceError;
use crate::locations::{LocationLevel, LocationStore};

const SUMMARY_TTL: Duration = Duration::from_secs(300);

/// One bucket of a grouped count. `label` is the raw column value,
/// `None` for rows where the field is unset.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountBucket {
    pub label: Option<String>,
    pub count: i64,
}

/// A count against one child location of the caller's anchor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationBucket {
    pub location_id: String,
    pub name: String,
    pub bn_name: String,
    pub count: i64,
}

/// Scoped voter statistics for the dashboard landing page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoterSummary {
    pub total: u64,
    pub by_gender: Vec<CountBucket>,
    pub by_vote_intent: Vec<CountBucket>,
    pub by_occupation: Vec<CountBucket>,
    /// Counts per child of the caller's anchor (per division for an
    /// unrestricted caller). Empty for a village-anchored caller.
    pub by_location: Vec<LocationBucket>,
}

/// Service computing scoped voter statistics, cached per anchor
#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DbPool>,
    locations: Arc<LocationStore>,
    cache: Arc<dyn CacheBackend>,
}

impl AnalyticsService {
    pub fn new(db: Arc<DbPool>, locations: Arc<LocationStore>, cache: Arc<dyn CacheBackend>) -> Self {
        Self {
            db,
            locations,
            cache,
        }
    }

    /// Computes the scoped summary, serving from cache when fresh.
    /// Two callers with the same anchor share a cache entry; the scope
    /// is the only input, so the key is derived from it alone.
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn voter_summary(&self, actor: &AuthUser) -> Result<VoterSummary, ServiceError> {
        let resolved = resolve_scope(actor.role, &actor.scope)?;
        let cache_key = summary_cache_key(&resolved);

        match self.cache.get(&cache_key).await {
            Ok(Some(cached)) => {
                if let Ok(summary) = serde_json::from_str::<VoterSummary>(&cached) {
                    return Ok(summary);
                }
                warn!(key = %cache_key, "discarding undecodable cached summary");
            }
            Ok(None) => {}
            Err(e) => warn!("analytics cache read failed: {}", e),
        }

        let summary = self.compute_summary(&resolved).await?;

        match serde_json::to_string(&summary) {
            Ok(encoded) => {
                if let Err(e) = self.cache.set(&cache_key, &encoded, Some(SUMMARY_TTL)).await {
                    warn!("analytics cache write failed: {}", e);
                }
            }
            Err(e) => warn!("failed to encode summary for cache: {}", e),
        }

        Ok(summary)
    }

    async fn compute_summary(&self, resolved: &ResolvedScope) -> Result<VoterSummary, ServiceError> {
        let total = voter::Entity::find()
            .filter(scoped_condition(resolved, None))
            .count(&*self.db)
            .await?;

        let by_gender = self.grouped_counts(resolved, voter::Column::Gender).await?;
        let by_vote_intent = self
            .grouped_counts(resolved, voter::Column::VoteIntent)
            .await?;
        let by_occupation = self
            .grouped_counts(resolved, voter::Column::Occupation)
            .await?;
        let by_location = self.location_breakdown(resolved).await?;

        Ok(VoterSummary {
            total,
            by_gender,
            by_vote_intent,
            by_occupation,
            by_location,
        })
    }

    async fn grouped_counts(
        &self,
        resolved: &ResolvedScope,
        column: voter::Column,
    ) -> Result<Vec<CountBucket>, ServiceError> {
        let rows: Vec<(Option<String>, i64)> = voter::Entity::find()
            .select_only()
            .column(column)
            .column_as(voter::Column::Id.count(), "count")
            .filter(scoped_condition(resolved, None))
            .group_by(column)
            .into_tuple()
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(label, count)| CountBucket { label, count })
            .collect())
    }

    /// Per-child-location counts, one level below the caller's anchor.
    async fn location_breakdown(
        &self,
        resolved: &ResolvedScope,
    ) -> Result<Vec<LocationBucket>, ServiceError> {
        let Some(child_level) = child_level(resolved) else {
            return Ok(Vec::new());
        };
        let child_column = crate::access::level_column(child_level);

        let rows: Vec<(String, i64)> = voter::Entity::find()
            .select_only()
            .column(child_column)
            .column_as(voter::Column::Id.count(), "count")
            .filter(scoped_condition(resolved, None))
            .group_by(child_column)
            .into_tuple()
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(location_id, count)| {
                let node = self.locations.node(&location_id);
                LocationBucket {
                    name: node.map(|n| n.name.clone()).unwrap_or_default(),
                    bn_name: node.map(|n| n.bn_name.clone()).unwrap_or_default(),
                    location_id,
                    count,
                }
            })
            .collect())
    }
}

fn summary_cache_key(resolved: &ResolvedScope) -> String {
    match resolved {
        ResolvedScope::Unrestricted => "analytics:summary:all".to_string(),
        ResolvedScope::Anchored { level, anchor_id } => {
            format!("analytics:summary:{}:{}", level, anchor_id)
        }
    }
}

fn child_level(resolved: &ResolvedScope) -> Option<LocationLevel> {
    match resolved {
        ResolvedScope::Unrestricted => Some(LocationLevel::Division),
        ResolvedScope::Anchored { level, .. } => match level {
            LocationLevel::Division => Some(LocationLevel::District),
            LocationLevel::District => Some(LocationLevel::Upazila),
            LocationLevel::Upazila => Some(LocationLevel::Union),
            LocationLevel::Union => Some(LocationLevel::Village),
            LocationLevel::Village => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_per_anchor() {
        let a = summary_cache_key(&ResolvedScope::Anchored {
            level: LocationLevel::Upazila,
            anchor_id: "u1".into(),
        });
        let b = summary_cache_key(&ResolvedScope::Anchored {
            level: LocationLevel::Upazila,
            anchor_id: "u2".into(),
        });
        assert_ne!(a, b);
        assert_eq!(a, "analytics:summary:upazila:u1");
        assert_eq!(
            summary_cache_key(&ResolvedScope::Unrestricted),
            "analytics:summary:all"
        );
    }

    #[test]
    fn breakdown_level_is_one_below_the_anchor() {
        assert_eq!(
            child_level(&ResolvedScope::Unrestricted),
            Some(LocationLevel::Division)
        );
        assert_eq!(
            child_level(&ResolvedScope::Anchored {
                level: LocationLevel::District,
                anchor_id: "t1".into()
            }),
            Some(LocationLevel::Upazila)
        );
        assert_eq!(
            child_level(&ResolvedScope::Anchored {
                level: LocationLevel::Village,
                anchor_id: "v1".into()
            }),
            None
        );
    }
}
