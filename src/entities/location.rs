use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One node of the administrative tree. Ids are the official reference
/// codes, stable across re-imports, so they double as foreign keys in
/// voter rows and access scopes.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub bn_name: String,
    pub level: String,
    pub parent_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
