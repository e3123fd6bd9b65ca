use sea_orm::entity::prelude::*;

/// Last observed activity of a member in a guild. One row per (guild_id, member_id).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "member_activity")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub guild_id: i64,
    pub member_id: i64,
    pub member_name: String,
    pub last_active: DateTimeWithTimeZone,
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
