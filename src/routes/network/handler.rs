use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{
    CreateDealerRequest, CreateFarmerRequest, CreateRetailerRequest, Dealer, Farmer,
    NetworkError, NetworkListQuery, Retailer, UpdateContactRequest,
};

fn network_error_code(e: &NetworkError) -> i32 {
    match e {
        NetworkError::ParentNotFound => error_codes::NOT_FOUND,
        NetworkError::HasChildren => error_codes::VALIDATION_ERROR,
        NetworkError::Database(_) => error_codes::INTERNAL_ERROR,
    }
}

#[axum::debug_handler]
pub async fn create_dealer(
    State(state): State<AppState>,
    Json(req): Json<CreateDealerRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, "Name is required".to_string()),
        );
    }
    match Dealer::create(&state.pool, &req).await {
        Ok(dealer) => (StatusCode::CREATED, success_to_api_response(dealer)),
        Err(e) => {
            tracing::error!("Failed to create dealer: {}", e);
            (
                StatusCode::OK,
                error_to_api_response(network_error_code(&e), e.to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn list_dealers(
    State(state): State<AppState>,
    Query(query): Query<NetworkListQuery>,
) -> impl IntoResponse {
    match Dealer::list(&state.pool, &query).await {
        Ok(dealers) => (StatusCode::OK, success_to_api_response(dealers)),
        Err(e) => {
            tracing::error!("Failed to list dealers: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to list dealers".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn update_dealer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateContactRequest>,
) -> impl IntoResponse {
    match Dealer::update(&state.pool, id, &req).await {
        Ok(Some(dealer)) => (StatusCode::OK, success_to_api_response(dealer)),
        Ok(None) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Dealer not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to update dealer {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn delete_dealer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match Dealer::delete(&state.pool, id).await {
        Ok(true) => (StatusCode::OK, success_to_api_response(())),
        Ok(false) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Dealer not found".to_string()),
        ),
        Err(e) => (
            StatusCode::OK,
            error_to_api_response(network_error_code(&e), e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn create_retailer(
    State(state): State<AppState>,
    Json(req): Json<CreateRetailerRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, "Name is required".to_string()),
        );
    }
    match Retailer::create(&state.pool, &req).await {
        Ok(retailer) => (StatusCode::CREATED, success_to_api_response(retailer)),
        Err(e) => {
            tracing::error!("Failed to create retailer: {}", e);
            (
                StatusCode::OK,
                error_to_api_response(network_error_code(&e), e.to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn list_retailers(
    State(state): State<AppState>,
    Query(query): Query<NetworkListQuery>,
) -> impl IntoResponse {
    match Retailer::list(&state.pool, &query).await {
        Ok(retailers) => (StatusCode::OK, success_to_api_response(retailers)),
        Err(e) => {
            tracing::error!("Failed to list retailers: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to list retailers".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn update_retailer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateContactRequest>,
) -> impl IntoResponse {
    match Retailer::update(&state.pool, id, &req).await {
        Ok(Some(retailer)) => (StatusCode::OK, success_to_api_response(retailer)),
        Ok(None) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Retailer not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to update retailer {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn delete_retailer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match Retailer::delete(&state.pool, id).await {
        Ok(true) => (StatusCode::OK, success_to_api_response(())),
        Ok(false) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Retailer not found".to_string()),
        ),
        Err(e) => (
            StatusCode::OK,
            error_to_api_response(network_error_code(&e), e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn create_farmer(
    State(state): State<AppState>,
    Json(req): Json<CreateFarmerRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, "Name is required".to_string()),
        );
    }
    match Farmer::create(&state.pool, &req).await {
        Ok(farmer) => (StatusCode::CREATED, success_to_api_response(farmer)),
        Err(e) => {
            tracing::error!("Failed to create farmer: {}", e);
            (
                StatusCode::OK,
                error_to_api_response(network_error_code(&e), e.to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn list_farmers(
    State(state): State<AppState>,
    Query(query): Query<NetworkListQuery>,
) -> impl IntoResponse {
    match Farmer::list(&state.pool, &query).await {
        Ok(farmers) => (StatusCode::OK, success_to_api_response(farmers)),
        Err(e) => {
            tracing::error!("Failed to list farmers: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to list farmers".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn update_farmer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateContactRequest>,
) -> impl IntoResponse {
    match Farmer::update(&state.pool, id, &req).await {
        Ok(Some(farmer)) => (StatusCode::OK, success_to_api_response(farmer)),
        Ok(None) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Farmer not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to update farmer {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn delete_farmer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match Farmer::delete(&state.pool, id).await {
        Ok(true) => (StatusCode::OK, success_to_api_response(())),
        Ok(false) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Farmer not found".to_string()),
        ),
        Err(e) => (
            StatusCode::OK,
            error_to_api_response(network_error_code(&e), e.to_string()),
        ),
    }
}
