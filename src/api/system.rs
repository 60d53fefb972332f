use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, HealthStatus};

pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthStatus>>, ApiError> {
    let database = match state.store() {
        Some(store) => {
            store
                .ping()
                .await
                .map_err(|e| ApiError::unavailable(e.to_string()))?;
            "ok"
        }
        None => "detached",
    };

    Ok(Json(ApiResponse::success(HealthStatus {
        status: "ok",
        database,
        cache_entries: state.shared.cache.len(),
        started_at: state.started_at.to_rfc3339(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })))
}
