use sea_orm::entity::prelude::*;

/// One engine/type row of a model. `year_to = NULL` means still in production.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "engine_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub model_id: i32,
    /// Denormalized from the model so compatibility sweeps filter one table.
    pub brand_id: i32,
    pub name: String,
    pub fuel: Option<String>,
    pub power_kw: Option<i32>,
    pub power_hp: Option<i32>,
    pub year_from: i32,
    pub month_from: Option<i32>,
    pub year_to: Option<i32>,
    pub month_to: Option<i32>,
    pub active: bool,
    /// Lowercased copies of `name` and `fuel` for substring search.
    pub name_folded: String,
    pub fuel_folded: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vehicle_models::Entity",
        from = "Column::ModelId",
        to = "super::vehicle_models::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    VehicleModels,
    #[sea_orm(has_many = "super::engine_codes::Entity")]
    EngineCodes,
}

impl Related<super::vehicle_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VehicleModels.def()
    }
}

impl Related<super::engine_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EngineCodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
