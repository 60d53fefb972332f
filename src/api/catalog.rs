use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::validation::{validate_id, validate_search_text, validate_year};
use super::{
    ApiError, AppState, BrandListParams, ModelListParams, SearchParams, VariantListParams,
};
use crate::catalog::PageEnvelope;
use crate::domain::{BrandId, ModelId};
use crate::models::{Brand, EngineVariant, SearchHit, VehicleModel};

pub async fn list_brands(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BrandListParams>,
) -> Result<Json<PageEnvelope<Brand>>, ApiError> {
    let search = validate_search_text(params.search.as_deref())?;

    let envelope = state
        .orchestrator()
        .list_brands(search, params.page, params.limit)
        .await;
    Ok(Json(envelope))
}

pub async fn list_models(
    State(state): State<Arc<AppState>>,
    Path(brand_id): Path<i32>,
    Query(params): Query<ModelListParams>,
) -> Result<Json<PageEnvelope<VehicleModel>>, ApiError> {
    let brand_id = BrandId::new(validate_id("brand", brand_id)?);
    let year = validate_year(params.year)?;
    let search = validate_search_text(params.search.as_deref())?;

    let envelope = state
        .orchestrator()
        .list_models(brand_id, year, search, params.page, params.limit)
        .await;
    Ok(Json(envelope))
}

pub async fn list_engine_variants(
    State(state): State<Arc<AppState>>,
    Path(model_id): Path<i32>,
    Query(params): Query<VariantListParams>,
) -> Result<Json<PageEnvelope<EngineVariant>>, ApiError> {
    let model_id = ModelId::new(validate_id("model", model_id)?);
    let search = validate_search_text(params.search.as_deref())?;

    let envelope = state
        .orchestrator()
        .list_engine_variants(model_id, search, params.page, params.limit)
        .await;
    Ok(Json(envelope))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PageEnvelope<SearchHit>>, ApiError> {
    let scope = params.scope().map_err(ApiError::validation)?;
    let text = validate_search_text(Some(&params.q))?.unwrap_or_default();

    let envelope = state
        .orchestrator()
        .search_by_text(text, scope, params.page, params.limit)
        .await;
    Ok(Json(envelope))
}
