//! Typed catalog records.
//!
//! Raw rows from the store are converted here, immediately on receipt, through
//! [`FromRow`]. Nothing above this module sees an untyped row.

use serde::{Deserialize, Serialize};

use crate::domain::{BrandId, EngineVariantId, ModelId, ProductionWindow};
use crate::rows::{FromRow, MappingError, Row, Table};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub alias: String,
    pub active: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleModel {
    pub id: ModelId,
    pub brand_id: BrandId,
    pub name: String,
    pub full_name: Option<String>,
    pub alias: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineVariant {
    pub id: EngineVariantId,
    pub model_id: ModelId,
    pub brand_id: BrandId,
    pub name: String,
    pub fuel: Option<String>,
    pub power_kw: Option<i32>,
    pub power_hp: Option<i32>,
    pub production: ProductionWindow,
    pub active: bool,
    /// Filled by the engine-code lookup; empty straight out of the store.
    #[serde(default)]
    pub codes: Vec<EngineCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCodeKind {
    Motor,
    Mine,
    Cnit,
}

impl EngineCodeKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Motor => "motor",
            Self::Mine => "mine",
            Self::Cnit => "cnit",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "motor" => Some(Self::Motor),
            "mine" => Some(Self::Mine),
            "cnit" => Some(Self::Cnit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCode {
    pub engine_variant_id: EngineVariantId,
    pub kind: EngineCodeKind,
    pub code: String,
}

/// One entry of a free-text search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum SearchHit {
    Brand(Brand),
    Model(VehicleModel),
    EngineVariant(EngineVariant),
}

impl FromRow for Brand {
    const TABLE: Table = Table::Brands;

    fn from_row(row: &Row) -> Result<Self, MappingError> {
        Ok(Self {
            id: BrandId::new(row.int32(Self::TABLE, "id")?),
            name: row.text(Self::TABLE, "name")?,
            alias: row.opt_text(Self::TABLE, "alias")?.unwrap_or_default(),
            active: row.boolean(Self::TABLE, "active")?,
            sort_order: row.opt_int32(Self::TABLE, "sort_order")?.unwrap_or_default(),
        })
    }
}

impl FromRow for VehicleModel {
    const TABLE: Table = Table::VehicleModels;

    fn from_row(row: &Row) -> Result<Self, MappingError> {
        Ok(Self {
            id: ModelId::new(row.int32(Self::TABLE, "id")?),
            brand_id: BrandId::new(row.int32(Self::TABLE, "brand_id")?),
            name: row.text(Self::TABLE, "name")?,
            full_name: row.opt_text(Self::TABLE, "full_name")?,
            alias: row.opt_text(Self::TABLE, "alias")?,
            active: row.boolean(Self::TABLE, "active")?,
        })
    }
}

impl FromRow for EngineVariant {
    const TABLE: Table = Table::EngineVariants;

    fn from_row(row: &Row) -> Result<Self, MappingError> {
        let production = ProductionWindow {
            year_from: row.int32(Self::TABLE, "year_from")?,
            month_from: row.opt_int32(Self::TABLE, "month_from")?,
            year_to: row.opt_int32(Self::TABLE, "year_to")?,
            month_to: row.opt_int32(Self::TABLE, "month_to")?,
        };
        if !production.is_well_formed() {
            return Err(MappingError {
                table: Self::TABLE,
                column: "year_to",
                reason: format!(
                    "production window ends ({:?}) before it starts ({})",
                    production.year_to, production.year_from
                ),
            });
        }

        Ok(Self {
            id: EngineVariantId::new(row.int32(Self::TABLE, "id")?),
            model_id: ModelId::new(row.int32(Self::TABLE, "model_id")?),
            brand_id: BrandId::new(row.int32(Self::TABLE, "brand_id")?),
            name: row.text(Self::TABLE, "name")?,
            fuel: row.opt_text(Self::TABLE, "fuel")?,
            power_kw: row.opt_int32(Self::TABLE, "power_kw")?,
            power_hp: row.opt_int32(Self::TABLE, "power_hp")?,
            production,
            active: row.boolean(Self::TABLE, "active")?,
            codes: Vec::new(),
        })
    }
}

impl FromRow for EngineCode {
    const TABLE: Table = Table::EngineCodes;

    fn from_row(row: &Row) -> Result<Self, MappingError> {
        let raw_kind = row.text(Self::TABLE, "kind")?;
        let kind = EngineCodeKind::parse(&raw_kind).ok_or_else(|| MappingError {
            table: Self::TABLE,
            column: "kind",
            reason: format!("unknown code kind '{raw_kind}'"),
        })?;

        Ok(Self {
            engine_variant_id: EngineVariantId::new(row.int32(Self::TABLE, "engine_variant_id")?),
            kind,
            code: row.text(Self::TABLE, "code")?,
        })
    }
}

/// Maps a batch of rows, failing on the first row that does not fit.
pub fn map_rows<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, MappingError> {
    rows.iter().map(T::from_row).collect()
}
