//! `SeaORM` Entity for consumer table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consumer")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub uuid: String,
    #[sea_orm(indexed)]
    pub owner_id: String,
    pub name: String,
    pub last_checkin: Option<i64>,
    pub created_time: i64,
    pub modified_time: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::owner::Entity",
        from = "Column::OwnerId",
        to = "super::owner::Column::Id"
    )]
    Owner,
    #[sea_orm(has_many = "super::consumer_environment::Entity")]
    ConsumerEnvironment,
}

impl Related<super::owner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::consumer_environment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConsumerEnvironment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
