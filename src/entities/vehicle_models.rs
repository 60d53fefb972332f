use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "vehicle_models")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub brand_id: i32,
    pub name: String,
    pub full_name: Option<String>,
    pub alias: Option<String>,
    pub active: bool,
    pub name_folded: String,
    pub full_name_folded: Option<String>,
    pub alias_folded: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::brands::Entity",
        from = "Column::BrandId",
        to = "super::brands::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Brands,
    #[sea_orm(has_many = "super::engine_variants::Entity")]
    EngineVariants,
}

impl Related<super::brands::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Brands.def()
    }
}

impl Related<super::engine_variants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EngineVariants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
