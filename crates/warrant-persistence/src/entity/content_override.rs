//! `SeaORM` Entity for content_override table
//!
//! Consumer and environment overrides share one table. `override_kind`
//! tells them apart and exactly one of `consumer_id` / `environment_id` is set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_override")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub override_kind: String,
    #[sea_orm(indexed)]
    pub consumer_id: Option<String>,
    #[sea_orm(indexed)]
    pub environment_id: Option<String>,
    pub content_label: String,
    pub name: String,
    pub value: String,
    pub created_time: i64,
    pub modified_time: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
