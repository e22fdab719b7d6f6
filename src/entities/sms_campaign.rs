use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_QUEUED: &str = "queued";
pub const STATUS_DISPATCHED: &str = "dispatched";
pub const STATUS_FAILED: &str = "failed";

/// An outbound SMS campaign. The target columns snapshot the sender's
/// resolved scope at creation time, so the recipient set is auditable
/// even if the sender's scope is later reassigned.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sms_campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub message: String,
    pub created_by: Uuid,

    pub target_level: Option<String>,
    pub target_anchor_id: Option<String>,

    pub status: String,
    pub recipient_count: i32,
    pub delivered_count: i32,
    pub failed_count: i32,

    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
