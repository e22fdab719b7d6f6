mod common;

use std::sync::Arc;

use assert_matches::assert_matches;

use voterbase_api::access::{AccessScope, Role};
use voterbase_api::entities::user;
use voterbase_api::errors::ServiceError;
use voterbase_api::locations::LocationStore;
use voterbase_api::services::users::{RegisterUser, RoleAssignment, UserService};

async fn user_service() -> UserService {
    let db = common::setup_db().await;
    let locations = Arc::new(LocationStore::load(&db).await.expect("tree loads"));
    let auth = common::auth_service(db.clone());
    let (events, rx) = common::event_channel();
    std::mem::forget(rx);
    UserService::new(db, locations, auth, events)
}

fn registration(name: &str, phone: &str) -> RegisterUser {
    RegisterUser {
        name: name.to_string(),
        phone: phone.to_string(),
        password: "correct-horse-battery".to_string(),
    }
}

fn upazila_assignment() -> RoleAssignment {
    RoleAssignment {
        role: Role::UpazilaAdmin,
        scope: AccessScope {
            division_id: Some("d1".to_string()),
            district_id: Some("t1".to_string()),
            upazila_id: Some("u1".to_string()),
            ..Default::default()
        },
    }
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn registration_starts_pending_with_no_role() {
    let service = user_service().await;

    let created = service
        .register(registration("Amina Khatun", "01712000001"))
        .await
        .unwrap();
    assert_eq!(created.approval_status, user::STATUS_PENDING);
    assert!(created.role.is_none());
    assert!(created.access_scope().division_id.is_none());
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn duplicate_phone_registration_conflicts() {
    let service = user_service().await;

    service
        .register(registration("First", "01712000002"))
        .await
        .unwrap();
    let err = service
        .register(registration("Second", "01712000002"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn approval_assigns_role_and_scope_together() {
    let service = user_service().await;
    let root = common::super_admin();

    let pending = service
        .register(registration("Approved Soon", "01712000003"))
        .await
        .unwrap();
    let approved = service
        .approve_user(&root, pending.id, upazila_assignment())
        .await
        .unwrap();

    assert_eq!(approved.approval_status, user::STATUS_APPROVED);
    assert_eq!(approved.role.as_deref(), Some("upazila_admin"));
    assert_eq!(approved.upazila_id.as_deref(), Some("u1"));
    assert!(approved.village_id.is_none());
    assert!(approved.is_approved());
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn an_admin_cannot_grant_a_role_as_broad_as_its_own() {
    let service = user_service().await;
    let upazila = common::upazila_admin();

    let pending = service
        .register(registration("Too Broad", "01712000004"))
        .await
        .unwrap();
    let assignment = RoleAssignment {
        role: Role::UpazilaAdmin,
        scope: upazila_assignment().scope,
    };
    let err = service
        .approve_user(&upazila, pending.id, assignment)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn inconsistent_assignment_is_unprocessable() {
    let service = user_service().await;
    let root = common::super_admin();

    let pending = service
        .register(registration("Bad Scope", "01712000005"))
        .await
        .unwrap();

    // u2 does not lie under the claimed d1/t1 branch.
    let assignment = RoleAssignment {
        role: Role::UpazilaAdmin,
        scope: AccessScope {
            division_id: Some("d1".to_string()),
            district_id: Some("t1".to_string()),
            upazila_id: Some("u2".to_string()),
            ..Default::default()
        },
    };
    let err = service
        .approve_user(&root, pending.id, assignment)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::UnprocessableEntity(_));

    // A missing anchor at the role's level fails the same way.
    let assignment = RoleAssignment {
        role: Role::VillageAdmin,
        scope: AccessScope::default(),
    };
    let err = service
        .approve_user(&root, pending.id, assignment)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::UnprocessableEntity(_));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn rejected_accounts_cannot_be_approved_later() {
    let service = user_service().await;
    let root = common::super_admin();

    let pending = service
        .register(registration("Rejected", "01712000006"))
        .await
        .unwrap();
    let rejected = service.reject_user(&root, pending.id).await.unwrap();
    assert_eq!(rejected.approval_status, user::STATUS_REJECTED);

    let err = service
        .approve_user(&root, pending.id, upazila_assignment())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn reassignment_moves_an_approved_user() {
    let service = user_service().await;
    let root = common::super_admin();

    let pending = service
        .register(registration("Mobile Admin", "01712000007"))
        .await
        .unwrap();
    service
        .approve_user(&root, pending.id, upazila_assignment())
        .await
        .unwrap();

    let reassignment = RoleAssignment {
        role: Role::VillageAdmin,
        scope: AccessScope {
            division_id: Some("d2".to_string()),
            district_id: Some("t2".to_string()),
            upazila_id: Some("u2".to_string()),
            union_id: Some("n2".to_string()),
            village_id: Some("v2".to_string()),
        },
    };
    let moved = service
        .reassign_scope(&root, pending.id, reassignment)
        .await
        .unwrap();
    assert_eq!(moved.role.as_deref(), Some("village_admin"));
    assert_eq!(moved.village_id.as_deref(), Some("v2"));
}
