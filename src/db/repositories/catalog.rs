use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::ProductionWindow;
use crate::entities::{brands, engine_codes, engine_variants, prelude::*, vehicle_models};
use crate::models::EngineCodeKind;
use crate::rows::fold_case;

/// Bulk catalog payload accepted by `import`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogImport {
    pub brands: Vec<BrandRecord>,
    pub models: Vec<ModelRecord>,
    pub engine_variants: Vec<EngineVariantRecord>,
    pub engine_codes: Vec<EngineCodeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandRecord {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: i32,
    pub brand_id: i32,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineVariantRecord {
    pub id: i32,
    pub model_id: i32,
    pub brand_id: i32,
    pub name: String,
    #[serde(default)]
    pub fuel: Option<String>,
    #[serde(default)]
    pub power_kw: Option<i32>,
    #[serde(default)]
    pub power_hp: Option<i32>,
    pub year_from: i32,
    #[serde(default)]
    pub month_from: Option<i32>,
    #[serde(default)]
    pub year_to: Option<i32>,
    #[serde(default)]
    pub month_to: Option<i32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineCodeRecord {
    pub engine_variant_id: i32,
    pub kind: EngineCodeKind,
    pub code: String,
}

const fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub brands: usize,
    pub models: usize,
    pub engine_variants: usize,
    pub engine_codes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub brands: u64,
    pub models: u64,
    pub engine_variants: u64,
    pub engine_codes: u64,
}

impl CatalogImport {
    /// Rejects payloads the read side could not map back.
    pub fn validate(&self) -> Result<()> {
        for variant in &self.engine_variants {
            let window = ProductionWindow {
                year_from: variant.year_from,
                month_from: variant.month_from,
                year_to: variant.year_to,
                month_to: variant.month_to,
            };
            if !window.is_well_formed() {
                anyhow::bail!(
                    "Engine variant {} ends ({:?}) before it starts ({})",
                    variant.id,
                    variant.year_to,
                    variant.year_from
                );
            }
        }

        for code in &self.engine_codes {
            if code.code.trim().is_empty() {
                anyhow::bail!(
                    "Empty {} code for engine variant {}",
                    code.kind.as_str(),
                    code.engine_variant_id
                );
            }
        }

        Ok(())
    }
}

pub struct CatalogRepository {
    conn: DatabaseConnection,
}

impl CatalogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Upserts every record by id inside one transaction. Codes of the imported
    /// variants are replaced wholesale.
    pub async fn import(&self, import: &CatalogImport) -> Result<ImportSummary> {
        import.validate()?;

        let txn = self.conn.begin().await?;

        for brand in &import.brands {
            Brands::insert(brands::ActiveModel {
                id: Set(brand.id),
                name: Set(brand.name.clone()),
                alias: Set(brand.alias.clone()),
                active: Set(brand.active),
                sort_order: Set(brand.sort_order),
                name_folded: Set(fold_case(&brand.name)),
                alias_folded: Set(brand.alias.as_deref().map(fold_case)),
            })
            .on_conflict(
                OnConflict::column(brands::Column::Id)
                    .update_columns([
                        brands::Column::Name,
                        brands::Column::Alias,
                        brands::Column::Active,
                        brands::Column::SortOrder,
                        brands::Column::NameFolded,
                        brands::Column::AliasFolded,
                    ])
                    .to_owned(),
            )
            .exec(&txn)
            .await
            .with_context(|| format!("Failed to import brand {}", brand.id))?;
        }

        for model in &import.models {
            VehicleModels::insert(vehicle_models::ActiveModel {
                id: Set(model.id),
                brand_id: Set(model.brand_id),
                name: Set(model.name.clone()),
                full_name: Set(model.full_name.clone()),
                alias: Set(model.alias.clone()),
                active: Set(model.active),
                name_folded: Set(fold_case(&model.name)),
                full_name_folded: Set(model.full_name.as_deref().map(fold_case)),
                alias_folded: Set(model.alias.as_deref().map(fold_case)),
            })
            .on_conflict(
                OnConflict::column(vehicle_models::Column::Id)
                    .update_columns([
                        vehicle_models::Column::BrandId,
                        vehicle_models::Column::Name,
                        vehicle_models::Column::FullName,
                        vehicle_models::Column::Alias,
                        vehicle_models::Column::Active,
                        vehicle_models::Column::NameFolded,
                        vehicle_models::Column::FullNameFolded,
                        vehicle_models::Column::AliasFolded,
                    ])
                    .to_owned(),
            )
            .exec(&txn)
            .await
            .with_context(|| format!("Failed to import model {}", model.id))?;
        }

        for variant in &import.engine_variants {
            EngineVariants::insert(engine_variants::ActiveModel {
                id: Set(variant.id),
                model_id: Set(variant.model_id),
                brand_id: Set(variant.brand_id),
                name: Set(variant.name.clone()),
                fuel: Set(variant.fuel.clone()),
                power_kw: Set(variant.power_kw),
                power_hp: Set(variant.power_hp),
                year_from: Set(variant.year_from),
                month_from: Set(variant.month_from),
                year_to: Set(variant.year_to),
                month_to: Set(variant.month_to),
                active: Set(variant.active),
                name_folded: Set(fold_case(&variant.name)),
                fuel_folded: Set(variant.fuel.as_deref().map(fold_case)),
            })
            .on_conflict(
                OnConflict::column(engine_variants::Column::Id)
                    .update_columns([
                        engine_variants::Column::ModelId,
                        engine_variants::Column::BrandId,
                        engine_variants::Column::Name,
                        engine_variants::Column::Fuel,
                        engine_variants::Column::PowerKw,
                        engine_variants::Column::PowerHp,
                        engine_variants::Column::YearFrom,
                        engine_variants::Column::MonthFrom,
                        engine_variants::Column::YearTo,
                        engine_variants::Column::MonthTo,
                        engine_variants::Column::Active,
                        engine_variants::Column::NameFolded,
                        engine_variants::Column::FuelFolded,
                    ])
                    .to_owned(),
            )
            .exec(&txn)
            .await
            .with_context(|| format!("Failed to import engine variant {}", variant.id))?;
        }

        let mut replaced: Vec<i32> = import
            .engine_codes
            .iter()
            .map(|c| c.engine_variant_id)
            .collect();
        replaced.sort_unstable();
        replaced.dedup();

        if !replaced.is_empty() {
            EngineCodes::delete_many()
                .filter(engine_codes::Column::EngineVariantId.is_in(replaced))
                .exec(&txn)
                .await?;

            let codes = import
                .engine_codes
                .iter()
                .map(|code| engine_codes::ActiveModel {
                    engine_variant_id: Set(code.engine_variant_id),
                    kind: Set(code.kind.as_str().to_string()),
                    code: Set(code.code.trim().to_string()),
                    ..Default::default()
                });
            EngineCodes::insert_many(codes).exec(&txn).await?;
        }

        txn.commit().await?;

        let summary = ImportSummary {
            brands: import.brands.len(),
            models: import.models.len(),
            engine_variants: import.engine_variants.len(),
            engine_codes: import.engine_codes.len(),
        };
        info!(
            brands = summary.brands,
            models = summary.models,
            engine_variants = summary.engine_variants,
            engine_codes = summary.engine_codes,
            "Imported catalog"
        );
        Ok(summary)
    }

    pub async fn counts(&self) -> Result<TableCounts> {
        Ok(TableCounts {
            brands: Brands::find().count(&self.conn).await?,
            models: VehicleModels::find().count(&self.conn).await?,
            engine_variants: EngineVariants::find().count(&self.conn).await?,
            engine_codes: EngineCodes::find().count(&self.conn).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_payload_defaults_optional_fields() {
        let json = r#"{
            "brands": [{ "id": 1, "name": "Renault" }],
            "engine_variants": [{
                "id": 10, "model_id": 5, "brand_id": 1, "name": "1.5 dCi", "year_from": 2012
            }],
            "engine_codes": [{ "engine_variant_id": 10, "kind": "motor", "code": "K9K" }]
        }"#;
        let import: CatalogImport = serde_json::from_str(json).unwrap();
        assert!(import.brands[0].active);
        assert!(import.models.is_empty());
        assert_eq!(import.engine_variants[0].year_to, None);
        assert_eq!(import.engine_codes[0].kind, EngineCodeKind::Motor);
        assert!(import.validate().is_ok());
    }

    #[test]
    fn import_rejects_inverted_window() {
        let import = CatalogImport {
            engine_variants: vec![EngineVariantRecord {
                id: 1,
                model_id: 1,
                brand_id: 1,
                name: "x".to_string(),
                fuel: None,
                power_kw: None,
                power_hp: None,
                year_from: 2010,
                month_from: None,
                year_to: Some(2005),
                month_to: None,
                active: true,
            }],
            ..Default::default()
        };
        assert!(import.validate().is_err());
    }
}
