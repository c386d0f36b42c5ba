use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    utils::{
        error_codes, error_to_api_response,
        geo::{
            self, AccuracyLevel, LocationQuality, RawLocation, accuracy_level,
            analyze_location_quality, validate_location,
        },
        success_to_api_response,
    },
};

#[derive(Debug, Deserialize)]
pub struct CoordinateQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct ReverseGeocodeResponse {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct QualityResponse {
    pub validation_errors: Vec<String>,
    pub accuracy: AccuracyLevel,
    pub quality: LocationQuality,
}

#[axum::debug_handler]
pub async fn reverse_geocode(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> impl IntoResponse {
    let address =
        geo::reverse_geocode(&state.http, &state.config, query.latitude, query.longitude).await;
    (
        StatusCode::OK,
        success_to_api_response(ReverseGeocodeResponse { address }),
    )
}

#[axum::debug_handler]
pub async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    match geo::geocode(&state.http, &state.config, &query.q).await {
        Some(result) => (StatusCode::OK, success_to_api_response(result)),
        None => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "No match for the query".to_string()),
        ),
    }
}

/// Pre-flight check a client can call before committing to a check-in.
#[axum::debug_handler]
pub async fn location_quality(Query(location): Query<RawLocation>) -> impl IntoResponse {
    let validation = validate_location(&location);
    (
        StatusCode::OK,
        success_to_api_response(QualityResponse {
            validation_errors: validation.errors,
            accuracy: accuracy_level(location.accuracy),
            quality: analyze_location_quality(&location),
        }),
    )
}
