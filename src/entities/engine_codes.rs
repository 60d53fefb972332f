use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "engine_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub engine_variant_id: i32,
    /// `motor`, `mine` or `cnit`
    pub kind: String,
    pub code: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::engine_variants::Entity",
        from = "Column::EngineVariantId",
        to = "super::engine_variants::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    EngineVariants,
}

impl Related<super::engine_variants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EngineVariants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
