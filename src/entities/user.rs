use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::access::AccessScope;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";

/// A dashboard user. `role` and the scope columns stay NULL until an
/// administrator approves the registration and assigns them together.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    #[sea_orm(unique)]
    #[validate(length(min = 11, max = 14, message = "Phone must be 11 to 14 digits"))]
    pub phone: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Option<String>,
    pub division_id: Option<String>,
    pub district_id: Option<String>,
    pub upazila_id: Option<String>,
    pub union_id: Option<String>,
    pub village_id: Option<String>,

    pub approval_status: String,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn access_scope(&self) -> AccessScope {
        AccessScope {
            division_id: self.division_id.clone(),
            district_id: self.district_id.clone(),
            upazila_id: self.upazila_id.clone(),
            union_id: self.union_id.clone(),
            village_id: self.village_id.clone(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.approval_status == STATUS_APPROVED
    }
}
