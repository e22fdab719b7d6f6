use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::access::{
    role_permissions, verify_scope_consistency, AccessError, AccessScope, Capability, Role,
};
use crate::auth::{hash_password, AuthService, AuthUser};
use crate::db::DbPool;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::locations::LocationStore;

/// Self-service registration. Accounts start pending with no role and
/// no scope; an administrator assigns both at approval time.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(min = 11, max = 14, message = "Phone must be 11 to 14 digits"))]
    pub phone: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Role plus scope, assigned together at approval or reassignment.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RoleAssignment {
    pub role: Role,
    pub scope: AccessScope,
}

/// A page of users with the total matching count.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<user::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for dashboard-user lifecycle: registration, approval with
/// role and scope assignment, rejection, and scope reassignment.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    locations: Arc<LocationStore>,
    auth: Arc<AuthService>,
    event_sender: Arc<EventSender>,
}

impl UserService {
    pub fn new(
        db: Arc<DbPool>,
        locations: Arc<LocationStore>,
        auth: Arc<AuthService>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            locations,
            auth,
            event_sender,
        }
    }

    /// Registers a new pending account
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: RegisterUser) -> Result<user::Model, ServiceError> {
        input.validate()?;

        let existing = user::Entity::find()
            .filter(user::Column::Phone.eq(input.phone.as_str()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "An account with phone {} already exists",
                input.phone
            )));
        }

        let password_hash = hash_password(&input.password)
            .map_err(|e| ServiceError::HashError(e.to_string()))?;

        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            phone: Set(input.phone),
            password_hash: Set(password_hash),
            role: Set(None),
            division_id: Set(None),
            district_id: Set(None),
            upazila_id: Set(None),
            union_id: Set(None),
            village_id: Set(None),
            approval_status: Set(user::STATUS_PENDING.to_string()),
            approved_by: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let created = model.insert(&*self.db).await?;
        info!(user_id = %created.id, "user registered, pending approval");

        if let Err(e) = self.event_sender.send(Event::UserRegistered(created.id)).await {
            error!("Failed to send UserRegistered event: {}", e);
        }

        Ok(created)
    }

    /// Approves a pending account, assigning role and scope together
    #[instrument(skip(self, assignment), fields(actor = %actor.user_id))]
    pub async fn approve_user(
        &self,
        actor: &AuthUser,
        user_id: Uuid,
        assignment: RoleAssignment,
    ) -> Result<user::Model, ServiceError> {
        self.ensure_can_assign(actor, assignment.role)?;
        self.validate_assignment(&assignment)?;

        let account = self.find_user(user_id).await?;
        if account.approval_status != user::STATUS_PENDING {
            return Err(ServiceError::InvalidOperation(format!(
                "User {} is not pending approval",
                user_id
            )));
        }

        let role_name = assignment.role.to_string();
        let updated = self
            .apply_assignment(account, &assignment, Some(actor.user_id))
            .await?;
        info!(user_id = %updated.id, role = %role_name, "user approved");

        if let Err(e) = self
            .event_sender
            .send(Event::UserApproved {
                user_id: updated.id,
                approved_by: actor.user_id,
                role: role_name,
            })
            .await
        {
            error!("Failed to send UserApproved event: {}", e);
        }

        Ok(updated)
    }

    /// Rejects a pending account
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn reject_user(
        &self,
        actor: &AuthUser,
        user_id: Uuid,
    ) -> Result<user::Model, ServiceError> {
        if !role_permissions(actor.role).allows(Capability::AssignRoles) {
            return Err(ServiceError::Forbidden(
                "Your role may not manage user approvals".to_string(),
            ));
        }

        let account = self.find_user(user_id).await?;
        if account.approval_status != user::STATUS_PENDING {
            return Err(ServiceError::InvalidOperation(format!(
                "User {} is not pending approval",
                user_id
            )));
        }

        let mut active: user::ActiveModel = account.into();
        active.approval_status = Set(user::STATUS_REJECTED.to_string());
        active.approved_by = Set(Some(actor.user_id));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;
        info!(user_id = %updated.id, "user rejected");

        if let Err(e) = self
            .event_sender
            .send(Event::UserRejected {
                user_id: updated.id,
                rejected_by: actor.user_id,
            })
            .await
        {
            error!("Failed to send UserRejected event: {}", e);
        }

        Ok(updated)
    }

    /// Reassigns an approved user's role and scope. Outstanding refresh
    /// tokens are revoked so the old grant dies with the access token.
    #[instrument(skip(self, assignment), fields(actor = %actor.user_id))]
    pub async fn reassign_scope(
        &self,
        actor: &AuthUser,
        user_id: Uuid,
        assignment: RoleAssignment,
    ) -> Result<user::Model, ServiceError> {
        self.ensure_can_assign(actor, assignment.role)?;
        self.validate_assignment(&assignment)?;

        let account = self.find_user(user_id).await?;
        if !account.is_approved() {
            return Err(ServiceError::InvalidOperation(format!(
                "User {} is not approved; approve with a role and scope instead",
                user_id
            )));
        }

        let updated = self
            .apply_assignment(account, &assignment, Some(actor.user_id))
            .await?;
        self.auth.revoke_user_refresh_tokens(user_id).await;
        info!(user_id = %updated.id, role = %assignment.role, "scope reassigned");

        if let Err(e) = self
            .event_sender
            .send(Event::ScopeReassigned {
                user_id: updated.id,
                reassigned_by: actor.user_id,
            })
            .await
        {
            error!("Failed to send ScopeReassigned event: {}", e);
        }

        Ok(updated)
    }

    /// Gets a single user by id
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        self.find_user(user_id).await
    }

    /// Lists users, optionally filtered by approval status
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        status: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<UserPage, ServiceError> {
        let mut query = user::Entity::find().order_by_desc(user::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(user::Column::ApprovalStatus.eq(status));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(UserPage {
            users,
            total,
            page,
            per_page,
        })
    }

    fn ensure_can_assign(&self, actor: &AuthUser, role: Role) -> Result<(), ServiceError> {
        let assignable = role_permissions(actor.role).can_assign_roles;
        if !assignable.contains(&role) {
            return Err(ServiceError::Forbidden(format!(
                "Role {} may not assign role {}",
                actor.role, role
            )));
        }
        Ok(())
    }

    /// Consistency problems at assignment time are the caller's mistake,
    /// not a policy denial, so they surface as 422 rather than 403.
    fn validate_assignment(&self, assignment: &RoleAssignment) -> Result<(), ServiceError> {
        verify_scope_consistency(assignment.role, &assignment.scope, &self.locations).map_err(
            |e| match e {
                AccessError::MissingScope { .. } | AccessError::InconsistentScope { .. } => {
                    ServiceError::UnprocessableEntity(e.to_string())
                }
                other => ServiceError::Access(other),
            },
        )
    }

    async fn apply_assignment(
        &self,
        account: user::Model,
        assignment: &RoleAssignment,
        assigned_by: Option<Uuid>,
    ) -> Result<user::Model, ServiceError> {
        let mut active: user::ActiveModel = account.into();
        active.role = Set(Some(assignment.role.to_string()));
        active.division_id = Set(assignment.scope.division_id.clone());
        active.district_id = Set(assignment.scope.district_id.clone());
        active.upazila_id = Set(assignment.scope.upazila_id.clone());
        active.union_id = Set(assignment.scope.union_id.clone());
        active.village_id = Set(assignment.scope.village_id.clone());
        active.approval_status = Set(user::STATUS_APPROVED.to_string());
        active.approved_by = Set(assigned_by);
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db).await?)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_must_be_strictly_narrower() {
        // A district admin may grant upazila and below, never a peer or
        // broader role.
        let assignable = role_permissions(Role::DistrictAdmin).can_assign_roles;
        assert!(assignable.contains(&Role::UpazilaAdmin));
        assert!(assignable.contains(&Role::VillageAdmin));
        assert!(!assignable.contains(&Role::DistrictAdmin));
        assert!(!assignable.contains(&Role::DivisionAdmin));
        assert!(!assignable.contains(&Role::SuperAdmin));
    }

    #[test]
    fn registration_input_is_validated() {
        let bad = RegisterUser {
            name: "".into(),
            phone: "017".into(),
            password: "short".into(),
        };
        assert!(bad.validate().is_err());

        let good = RegisterUser {
            name: "Field Organizer".into(),
            phone: "01712345678".into(),
            password: "long-enough-password".into(),
        };
        assert!(good.validate().is_ok());
    }
}
