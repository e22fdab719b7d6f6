use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::access::Located;
use crate::locations::LocationLevel;

/// A voter record. Every row stores the complete five-level location
/// chain, denormalized, so scoped queries never need to walk the tree.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "voters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

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

    pub division_id: String,
    pub district_id: String,
    pub upazila_id: String,
    pub union_id: String,
    pub village_id: String,

    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Located for Model {
    fn location_id(&self, level: LocationLevel) -> Option<&str> {
        let id = match level {
            LocationLevel::Division => &self.division_id,
            LocationLevel::District => &self.district_id,
            LocationLevel::Upazila => &self.upazila_id,
            LocationLevel::Union => &self.union_id,
            LocationLevel::Village => &self.village_id,
        };
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }
}
