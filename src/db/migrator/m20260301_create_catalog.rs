use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Brands)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(VehicleModels)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(EngineVariants)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(EngineCodes)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_vehicle_models_brand")
                    .table(VehicleModelsIden::Table)
                    .col(VehicleModelsIden::BrandId)
                    .to_owned(),
            )
            .await?;

        // Compatibility sweeps filter on (brand_id, year_from).
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_engine_variants_brand_year")
                    .table(EngineVariantsIden::Table)
                    .col(EngineVariantsIden::BrandId)
                    .col(EngineVariantsIden::YearFrom)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_engine_variants_model")
                    .table(EngineVariantsIden::Table)
                    .col(EngineVariantsIden::ModelId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_engine_codes_variant")
                    .table(EngineCodesIden::Table)
                    .col(EngineCodesIden::EngineVariantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EngineCodesIden::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EngineVariantsIden::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VehicleModelsIden::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BrandsIden::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BrandsIden {
    #[sea_orm(iden = "brands")]
    Table,
}

#[derive(DeriveIden)]
enum VehicleModelsIden {
    #[sea_orm(iden = "vehicle_models")]
    Table,
    BrandId,
}

#[derive(DeriveIden)]
enum EngineVariantsIden {
    #[sea_orm(iden = "engine_variants")]
    Table,
    BrandId,
    ModelId,
    YearFrom,
}

#[derive(DeriveIden)]
enum EngineCodesIden {
    #[sea_orm(iden = "engine_codes")]
    Table,
    EngineVariantId,
}
