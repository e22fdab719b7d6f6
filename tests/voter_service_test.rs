mod common;

use std::sync::Arc;

use assert_matches::assert_matches;

use voterbase_api::errors::ServiceError;
use voterbase_api::locations::LocationStore;
use voterbase_api::services::voters::{NewVoter, VoterChanges, VoterFilter, VoterService};

fn new_voter(name: &str, phone: &str, branch: u8) -> NewVoter {
    NewVoter {
        name: name.to_string(),
        bn_name: None,
        phone: phone.to_string(),
        gender: Some("female".to_string()),
        date_of_birth: None,
        occupation: Some("farmer".to_string()),
        vote_intent: None,
        notes: None,
        location: common::branch_path(branch),
    }
}

async fn voter_service() -> VoterService {
    let db = common::setup_db().await;
    let locations = Arc::new(LocationStore::load(&db).await.expect("tree loads"));
    let (events, rx) = common::event_channel();
    // Receiver leaks for the life of the test so sends never fail.
    std::mem::forget(rx);
    VoterService::new(db, locations, events)
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn creates_and_reads_back_within_scope() {
    let service = voter_service().await;
    let admin = common::upazila_admin();

    let created = service
        .create_voter(&admin, new_voter("Rahima Begum", "01711000001", 1))
        .await
        .expect("create succeeds inside scope");
    assert_eq!(created.version, 1);
    assert_eq!(created.upazila_id, "u1");

    let fetched = service.get_voter(&admin, created.id).await.unwrap();
    assert_eq!(fetched.name, "Rahima Begum");
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn refuses_to_create_outside_the_anchor() {
    let service = voter_service().await;
    let admin = common::upazila_admin();

    let err = service
        .create_voter(&admin, new_voter("Karim Mia", "01711000002", 2))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn refuses_tuples_the_tree_does_not_contain() {
    let service = voter_service().await;
    let root = common::super_admin();

    let mut input = new_voter("Cross Branch", "01711000003", 1);
    input.location.village_id = "v2".to_string(); // v2 lies under n2, not n1
    let err = service.create_voter(&root, input).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn listing_is_confined_to_the_callers_branch() {
    let service = voter_service().await;
    let root = common::super_admin();

    for (name, phone, branch) in [
        ("Voter One", "01711000010", 1),
        ("Voter Two", "01711000011", 2),
        ("Voter Three", "01711000012", 1),
    ] {
        service
            .create_voter(&root, new_voter(name, phone, branch))
            .await
            .unwrap();
    }

    let all = service
        .list_voters(&root, &VoterFilter::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(all.total, 3);

    let scoped = service
        .list_voters(&common::upazila_admin(), &VoterFilter::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(scoped.total, 2);
    assert!(scoped.voters.iter().all(|v| v.upazila_id == "u1"));

    let village = service
        .list_voters(&common::village_admin(), &VoterFilter::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(village.total, 1);
    assert_eq!(village.voters[0].name, "Voter Two");
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn cross_scope_reads_are_forbidden_not_missing() {
    let service = voter_service().await;
    let root = common::super_admin();

    let other_branch = service
        .create_voter(&root, new_voter("Hidden Voter", "01711000020", 2))
        .await
        .unwrap();

    let err = service
        .get_voter(&common::upazila_admin(), other_branch.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn stale_version_updates_conflict() {
    let service = voter_service().await;
    let admin = common::upazila_admin();

    let created = service
        .create_voter(&admin, new_voter("Versioned", "01711000030", 1))
        .await
        .unwrap();

    let first = VoterChanges {
        notes: Some("first pass".to_string()),
        expected_version: created.version,
        ..stub_changes()
    };
    let updated = service.update_voter(&admin, created.id, first).await.unwrap();
    assert_eq!(updated.version, 2);

    // Re-submitting against the original version must not overwrite.
    let stale = VoterChanges {
        notes: Some("second pass".to_string()),
        expected_version: created.version,
        ..stub_changes()
    };
    let err = service.update_voter(&admin, created.id, stale).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn relocation_cannot_leave_the_scope() {
    let service = voter_service().await;
    let admin = common::upazila_admin();

    let created = service
        .create_voter(&admin, new_voter("Mover", "01711000040", 1))
        .await
        .unwrap();

    let changes = VoterChanges {
        location: Some(common::branch_path(2)),
        expected_version: created.version,
        ..stub_changes()
    };
    let err = service.update_voter(&admin, created.id, changes).await.unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn only_super_admin_deletes() {
    let service = voter_service().await;
    let admin = common::upazila_admin();
    let root = common::super_admin();

    let created = service
        .create_voter(&admin, new_voter("Removable", "01711000050", 1))
        .await
        .unwrap();

    let err = service.delete_voter(&admin, created.id).await.unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    service.delete_voter(&root, created.id).await.unwrap();
    let err = service.get_voter(&root, created.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

fn stub_changes() -> VoterChanges {
    VoterChanges {
        name: None,
        bn_name: None,
        phone: None,
        gender: None,
        date_of_birth: None,
        occupation: None,
        vote_intent: None,
        notes: None,
        location: None,
        expected_version: 0,
    }
}
