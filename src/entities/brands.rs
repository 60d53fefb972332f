use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "brands")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub name: String,
    pub alias: Option<String>,
    pub active: bool,
    pub sort_order: Option<i32>,
    pub name_folded: String,
    pub alias_folded: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vehicle_models::Entity")]
    VehicleModels,
}

impl Related<super::vehicle_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VehicleModels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
