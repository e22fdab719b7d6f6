use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Condition;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::access::{
    is_accessible, resolve_scope, role_permissions, scoped_condition, Capability, ResolvedScope,
};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::voter;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::locations::{LocationPath, LocationStore};

/// Data for a new voter record. The five-id location tuple is validated
/// against the seeded hierarchy before anything is written.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewVoter {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    pub bn_name: Option<String>,
    #[validate(length(min = 11, max = 14, message = "Phone must be 11 to 14 digits"))]
    pub phone: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub occupation: Option<String>,
    pub vote_intent: Option<String>,
    pub notes: Option<String>,
    pub location: LocationPath,
}

/// Partial update for a voter. `expected_version` implements optimistic
/// locking; a stale version is a conflict, not a silent overwrite.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct VoterChanges {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,
    pub bn_name: Option<String>,
    #[validate(length(min = 11, max = 14, message = "Phone must be 11 to 14 digits"))]
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub occupation: Option<String>,
    pub vote_intent: Option<String>,
    pub notes: Option<String>,
    pub location: Option<LocationPath>,
    pub expected_version: i32,
}

/// Drill-down filters for voter listings. Every field narrows the
/// caller's scoped set; none can widen it.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct VoterFilter {
    pub gender: Option<String>,
    pub vote_intent: Option<String>,
    pub occupation: Option<String>,
    pub division_id: Option<String>,
    pub district_id: Option<String>,
    pub upazila_id: Option<String>,
    pub union_id: Option<String>,
    pub village_id: Option<String>,
    /// Matches against name or phone.
    pub search: Option<String>,
}

impl VoterFilter {
    /// Build the caller-supplied half of the query condition. Returns
    /// `None` when no filter is set so the scope condition stands alone.
    pub fn condition(&self) -> Option<Condition> {
        let mut cond = Condition::all();
        let mut any = false;

        let exact = [
            (voter::Column::Gender, &self.gender),
            (voter::Column::VoteIntent, &self.vote_intent),
            (voter::Column::Occupation, &self.occupation),
            (voter::Column::DivisionId, &self.division_id),
            (voter::Column::DistrictId, &self.district_id),
            (voter::Column::UpazilaId, &self.upazila_id),
            (voter::Column::UnionId, &self.union_id),
            (voter::Column::VillageId, &self.village_id),
        ];
        for (column, value) in exact {
            if let Some(value) = value {
                cond = cond.add(column.eq(value.as_str()));
                any = true;
            }
        }

        if let Some(term) = &self.search {
            let pattern = format!("%{}%", term);
            cond = cond.add(
                Condition::any()
                    .add(voter::Column::Name.like(&pattern))
                    .add(voter::Column::Phone.like(&pattern)),
            );
            any = true;
        }

        any.then_some(cond)
    }
}

/// A page of voters with the total matching count.
#[derive(Debug, Clone)]
pub struct VoterPage {
    pub voters: Vec<voter::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for managing voter records within the caller's scope
#[derive(Clone)]
pub struct VoterService {
    db: Arc<DbPool>,
    locations: Arc<LocationStore>,
    event_sender: Arc<EventSender>,
}

impl VoterService {
    pub fn new(db: Arc<DbPool>, locations: Arc<LocationStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db,
            locations,
            event_sender,
        }
    }

    /// Creates a voter record inside the caller's scope
    #[instrument(skip(self, input), fields(actor = %actor.user_id))]
    pub async fn create_voter(
        &self,
        actor: &AuthUser,
        input: NewVoter,
    ) -> Result<voter::Model, ServiceError> {
        input.validate()?;

        let resolved = resolve_scope(actor.role, &actor.scope)?;
        self.locations.verify_path(&input.location)?;
        ensure_path_in_scope(&resolved, &input.location)?;

        let now = Utc::now();
        let model = voter::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            bn_name: Set(input.bn_name),
            phone: Set(input.phone),
            gender: Set(input.gender),
            date_of_birth: Set(input.date_of_birth),
            occupation: Set(input.occupation),
            vote_intent: Set(input.vote_intent),
            notes: Set(input.notes),
            division_id: Set(input.location.division_id),
            district_id: Set(input.location.district_id),
            upazila_id: Set(input.location.upazila_id),
            union_id: Set(input.location.union_id),
            village_id: Set(input.location.village_id),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(None),
            version: Set(1),
        };

        let created = model.insert(&*self.db).await?;
        info!(voter_id = %created.id, "voter created");

        if let Err(e) = self.event_sender.send(Event::VoterCreated(created.id)).await {
            error!("Failed to send VoterCreated event: {}", e);
        }

        Ok(created)
    }

    /// Gets a voter by id, refusing records outside the caller's scope
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn get_voter(
        &self,
        actor: &AuthUser,
        voter_id: Uuid,
    ) -> Result<voter::Model, ServiceError> {
        let resolved = resolve_scope(actor.role, &actor.scope)?;
        let record = voter::Entity::find_by_id(voter_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Voter {} not found", voter_id)))?;

        if !is_accessible(&resolved, &record) {
            return Err(ServiceError::Forbidden(
                "Voter record lies outside your assigned scope".to_string(),
            ));
        }

        Ok(record)
    }

    /// Lists voters in the caller's scope with optional drill-down filters
    #[instrument(skip(self, filter), fields(actor = %actor.user_id))]
    pub async fn list_voters(
        &self,
        actor: &AuthUser,
        filter: &VoterFilter,
        page: u64,
        per_page: u64,
    ) -> Result<VoterPage, ServiceError> {
        let resolved = resolve_scope(actor.role, &actor.scope)?;
        let condition = scoped_condition(&resolved, filter.condition());

        let paginator = voter::Entity::find()
            .filter(condition)
            .order_by_desc(voter::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let voters = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(VoterPage {
            voters,
            total,
            page,
            per_page,
        })
    }

    /// Updates a voter, keeping it inside the caller's scope
    #[instrument(skip(self, changes), fields(actor = %actor.user_id))]
    pub async fn update_voter(
        &self,
        actor: &AuthUser,
        voter_id: Uuid,
        changes: VoterChanges,
    ) -> Result<voter::Model, ServiceError> {
        changes.validate()?;

        let resolved = resolve_scope(actor.role, &actor.scope)?;
        let current = voter::Entity::find_by_id(voter_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Voter {} not found", voter_id)))?;

        if !is_accessible(&resolved, &current) {
            return Err(ServiceError::Forbidden(
                "Voter record lies outside your assigned scope".to_string(),
            ));
        }

        if current.version != changes.expected_version {
            return Err(ServiceError::Conflict(format!(
                "Voter {} was modified concurrently (expected version {}, found {})",
                voter_id, changes.expected_version, current.version
            )));
        }

        let mut active: voter::ActiveModel = current.clone().into();

        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(bn_name) = changes.bn_name {
            active.bn_name = Set(Some(bn_name));
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(phone);
        }
        if let Some(gender) = changes.gender {
            active.gender = Set(Some(gender));
        }
        if let Some(date_of_birth) = changes.date_of_birth {
            active.date_of_birth = Set(Some(date_of_birth));
        }
        if let Some(occupation) = changes.occupation {
            active.occupation = Set(Some(occupation));
        }
        if let Some(vote_intent) = changes.vote_intent {
            active.vote_intent = Set(Some(vote_intent));
        }
        if let Some(notes) = changes.notes {
            active.notes = Set(Some(notes));
        }

        // A relocated record must both exist in the tree and stay inside
        // the caller's scope; moving a voter out of scope is refused.
        if let Some(location) = changes.location {
            self.locations.verify_path(&location)?;
            ensure_path_in_scope(&resolved, &location)?;
            active.division_id = Set(location.division_id);
            active.district_id = Set(location.district_id);
            active.upazila_id = Set(location.upazila_id);
            active.union_id = Set(location.union_id);
            active.village_id = Set(location.village_id);
        }

        active.version = Set(current.version + 1);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        info!(voter_id = %updated.id, version = updated.version, "voter updated");

        if let Err(e) = self.event_sender.send(Event::VoterUpdated(updated.id)).await {
            error!("Failed to send VoterUpdated event: {}", e);
        }

        Ok(updated)
    }

    /// Deletes a voter. Only roles holding the delete capability may call
    /// this, and the record must sit inside the caller's scope.
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_voter(&self, actor: &AuthUser, voter_id: Uuid) -> Result<(), ServiceError> {
        if !role_permissions(actor.role).allows(Capability::Delete) {
            return Err(ServiceError::Forbidden(
                "Your role may not delete voter records".to_string(),
            ));
        }

        let resolved = resolve_scope(actor.role, &actor.scope)?;
        let record = voter::Entity::find_by_id(voter_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Voter {} not found", voter_id)))?;

        if !is_accessible(&resolved, &record) {
            return Err(ServiceError::Forbidden(
                "Voter record lies outside your assigned scope".to_string(),
            ));
        }

        voter::Entity::delete_by_id(voter_id).exec(&*self.db).await?;
        info!(voter_id = %voter_id, "voter deleted");

        if let Err(e) = self.event_sender.send(Event::VoterDeleted(voter_id)).await {
            error!("Failed to send VoterDeleted event: {}", e);
        }

        Ok(())
    }

    /// Counts voters matching the caller's scope and filters
    #[instrument(skip(self, filter), fields(actor = %actor.user_id))]
    pub async fn count_voters(
        &self,
        actor: &AuthUser,
        filter: &VoterFilter,
    ) -> Result<u64, ServiceError> {
        let resolved = resolve_scope(actor.role, &actor.scope)?;
        let count = voter::Entity::find()
            .filter(scoped_condition(&resolved, filter.condition()))
            .count(&*self.db)
            .await?;
        Ok(count)
    }
}

/// A record's location tuple must sit under the caller's anchor.
fn ensure_path_in_scope(
    resolved: &ResolvedScope,
    path: &LocationPath,
) -> Result<(), ServiceError> {
    match resolved {
        ResolvedScope::Unrestricted => Ok(()),
        ResolvedScope::Anchored { level, anchor_id } => {
            if path.id_at(*level) == anchor_id {
                Ok(())
            } else {
                Err(ServiceError::Forbidden(
                    "Location lies outside your assigned scope".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations::LocationLevel;
    use sea_orm::{DbBackend, QueryTrait};

    fn path(division: &str, district: &str, upazila: &str, union: &str, village: &str) -> LocationPath {
        LocationPath {
            division_id: division.into(),
            district_id: district.into(),
            upazila_id: upazila.into(),
            union_id: union.into(),
            village_id: village.into(),
        }
    }

    #[test]
    fn path_outside_anchor_is_forbidden() {
        let resolved = ResolvedScope::Anchored {
            level: LocationLevel::Upazila,
            anchor_id: "u1".into(),
        };
        assert!(ensure_path_in_scope(&resolved, &path("d1", "t1", "u1", "n1", "v1")).is_ok());
        assert!(matches!(
            ensure_path_in_scope(&resolved, &path("d2", "t2", "u2", "n2", "v2")),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn unrestricted_scope_accepts_any_path() {
        assert!(ensure_path_in_scope(
            &ResolvedScope::Unrestricted,
            &path("d2", "t2", "u2", "n2", "v2")
        )
        .is_ok());
    }

    #[test]
    fn empty_filter_builds_no_condition() {
        assert!(VoterFilter::default().condition().is_none());
    }

    #[test]
    fn filters_are_conjunctive_with_the_scope() {
        let resolved = ResolvedScope::Anchored {
            level: LocationLevel::District,
            anchor_id: "t1".into(),
        };
        let filter = VoterFilter {
            gender: Some("female".into()),
            village_id: Some("v1".into()),
            ..Default::default()
        };
        let sql = voter::Entity::find()
            .filter(scoped_condition(&resolved, filter.condition()))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""district_id" = 't1'"#), "{sql}");
        assert!(sql.contains(r#""gender" = 'female'"#), "{sql}");
        assert!(sql.contains(r#""village_id" = 'v1'"#), "{sql}");
    }

    #[test]
    fn search_matches_name_or_phone() {
        let filter = VoterFilter {
            search: Some("rahim".into()),
            ..Default::default()
        };
        let sql = voter::Entity::find()
            .filter(filter.condition().unwrap())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("LIKE '%rahim%'"), "{sql}");
        assert!(sql.contains("OR"), "{sql}");
    }
}
