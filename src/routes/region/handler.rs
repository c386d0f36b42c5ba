use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{CreateRegionRequest, Region, RegionError, UpdateRegionRequest};

#[derive(Debug, Deserialize)]
pub struct ListRegionsQuery {
    pub state: Option<String>,
}

#[axum::debug_handler]
pub async fn create_region(
    State(state): State<AppState>,
    Json(req): Json<CreateRegionRequest>,
) -> impl IntoResponse {
    if req.state.trim().is_empty() || req.city.trim().is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "State and city are required".to_string(),
            ),
        );
    }

    match Region::create(&state.pool, &req).await {
        Ok(region) => (StatusCode::CREATED, success_to_api_response(region)),
        Err(e @ RegionError::Duplicate) => (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, e.to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to create region: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to create region".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn list_regions(
    State(state): State<AppState>,
    Query(query): Query<ListRegionsQuery>,
) -> impl IntoResponse {
    match Region::list(&state.pool, query.state.as_deref()).await {
        Ok(regions) => (StatusCode::OK, success_to_api_response(regions)),
        Err(e) => {
            tracing::error!("Failed to list regions: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to list regions".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn get_region(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match Region::find_by_id(&state.pool, id).await {
        Ok(Some(region)) => (StatusCode::OK, success_to_api_response(region)),
        Ok(None) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Region not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to load region {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn update_region(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRegionRequest>,
) -> impl IntoResponse {
    match Region::update(&state.pool, id, &req).await {
        Ok(Some(region)) => (StatusCode::OK, success_to_api_response(region)),
        Ok(None) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Region not found".to_string()),
        ),
        Err(e @ RegionError::Duplicate) => (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, e.to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to update region {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to update region".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn delete_region(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match Region::delete(&state.pool, id).await {
        Ok(true) => (StatusCode::OK, success_to_api_response(())),
        Ok(false) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Region not found".to_string()),
        ),
        Err(e @ RegionError::InUse) => (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, e.to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to delete region {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to delete region".to_string(),
                ),
            )
        }
    }
}
