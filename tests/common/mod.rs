#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use voterbase_api::access::{AccessScope, Role};
use voterbase_api::auth::{AuthConfig, AuthService, AuthUser};
use voterbase_api::db::{self, DbPool};
use voterbase_api::entities::location;
use voterbase_api::events::{Event, EventSender};
use voterbase_api::locations::{LocationLevel, LocationNode, LocationPath, LocationStore};

/// Two divisions, each with one fully populated branch down to a village:
/// d1 → t1 → u1 → n1 → v1 and d2 → t2 → u2 → n2 → v2.
pub fn sample_nodes() -> Vec<LocationNode> {
    fn node(id: &str, level: LocationLevel, parent: Option<&str>) -> LocationNode {
        LocationNode {
            id: id.to_string(),
            name: id.to_uppercase(),
            bn_name: format!("bn-{id}"),
            level,
            parent_id: parent.map(str::to_string),
        }
    }

    vec![
        node("d1", LocationLevel::Division, None),
        node("d2", LocationLevel::Division, None),
        node("t1", LocationLevel::District, Some("d1")),
        node("t2", LocationLevel::District, Some("d2")),
        node("u1", LocationLevel::Upazila, Some("t1")),
        node("u2", LocationLevel::Upazila, Some("t2")),
        node("n1", LocationLevel::Union, Some("u1")),
        node("n2", LocationLevel::Union, Some("u2")),
        node("v1", LocationLevel::Village, Some("n1")),
        node("v2", LocationLevel::Village, Some("n2")),
    ]
}

pub fn sample_store() -> LocationStore {
    LocationStore::from_nodes(sample_nodes()).expect("sample tree is valid")
}

/// The full five-id tuple of branch 1 or branch 2 of the sample tree.
pub fn branch_path(branch: u8) -> LocationPath {
    let b = branch.to_string();
    LocationPath {
        division_id: format!("d{b}"),
        district_id: format!("t{b}"),
        upazila_id: format!("u{b}"),
        union_id: format!("n{b}"),
        village_id: format!("v{b}"),
    }
}

/// Fresh in-memory SQLite database with all migrations applied and the
/// sample location tree seeded.
pub async fn setup_db() -> Arc<DbPool> {
    let pool = db::establish_connection("sqlite::memory:")
        .await
        .expect("in-memory SQLite connection");
    db::run_migrations(&pool).await.expect("migrations apply");

    for node in sample_nodes() {
        location::ActiveModel {
            id: Set(node.id),
            name: Set(node.name),
            bn_name: Set(node.bn_name),
            level: Set(node.level.to_string()),
            parent_id: Set(node.parent_id),
        }
        .insert(&pool)
        .await
        .expect("location row inserts");
    }

    Arc::new(pool)
}

/// Event channel wired for tests. Keep the receiver alive so service
/// event sends succeed.
pub fn event_channel() -> (Arc<EventSender>, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(32);
    (Arc::new(EventSender::new(tx)), rx)
}

pub fn auth_service(db: Arc<DbPool>) -> Arc<AuthService> {
    let config = AuthConfig::new(
        "integration-test-secret-key-0123456789abcdef".to_string(),
        "voterbase-dashboard".to_string(),
        "voterbase-api".to_string(),
        Duration::from_secs(900),
        Duration::from_secs(86_400),
    );
    Arc::new(AuthService::new(config, db))
}

pub fn super_admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        name: Some("Root".to_string()),
        role: Role::SuperAdmin,
        scope: AccessScope::default(),
        token_id: Uuid::new_v4().to_string(),
    }
}

/// An upazila admin anchored at u1 of the sample tree.
pub fn upazila_admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        name: Some("Upazila One".to_string()),
        role: Role::UpazilaAdmin,
        scope: AccessScope {
            division_id: Some("d1".to_string()),
            district_id: Some("t1".to_string()),
            upazila_id: Some("u1".to_string()),
            ..Default::default()
        },
        token_id: Uuid::new_v4().to_string(),
    }
}

/// A village admin anchored at v2 of the sample tree.
pub fn village_admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        name: Some("Village Two".to_string()),
        role: Role::VillageAdmin,
        scope: AccessScope {
            division_id: Some("d2".to_string()),
            district_id: Some("t2".to_string()),
            upazila_id: Some("u2".to_string()),
            union_id: Some("n2".to_string()),
            village_id: Some("v2".to_string()),
        },
        token_id: Uuid::new_v4().to_string(),
    }
}
