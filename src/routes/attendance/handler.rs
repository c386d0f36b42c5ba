use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    storage::PhotoKind,
    utils::{
        Claims, error_codes, error_to_api_response,
        geo::{RawLocation, reverse_geocode, validate_location},
        success_to_api_response,
    },
};

use super::model::{
    AttendanceError, AttendanceRecord, ListRecordsQuery, PathPoint, map_attendance_status,
    verification_status,
};

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub location: RawLocation,
    pub selfie: String,
    pub battery_level: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    pub location: RawLocation,
    pub selfie: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmergencyCheckOutRequest {
    pub last_known_location: Option<RawLocation>,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationUpdateRequest {
    pub location: RawLocation,
    pub battery_level: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct LocationUpdateResponse {
    pub updated: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub employee_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub date: NaiveDate,
    pub status: &'static str,
    pub record: Option<AttendanceRecord>,
}

#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    pub status: String,
    pub note: Option<String>,
}

fn caller_id(claims: &Claims) -> Option<Uuid> {
    Uuid::parse_str(&claims.sub).ok()
}

#[axum::debug_handler]
pub async fn check_in(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<CheckInRequest>,
) -> impl IntoResponse {
    let Some(employee_id) = caller_id(&claims) else {
        return (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(error_codes::AUTH_FAILED, "Invalid token subject".to_string()),
        );
    };

    let validation = validate_location(&req.location);
    if !validation.is_valid {
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, validation.errors.join("; ")),
        );
    }

    let today = Utc::now().date_naive();
    let selfie = match state
        .storage
        .upload_photo(&claims.employee_id, &req.selfie, today, PhotoKind::CheckIn)
        .await
    {
        Ok(upload) => upload,
        Err(e) => {
            return (
                StatusCode::OK,
                error_to_api_response(error_codes::VALIDATION_ERROR, e.to_string()),
            );
        }
    };

    let address = reverse_geocode(
        &state.http,
        &state.config,
        req.location.latitude,
        req.location.longitude,
    )
    .await;

    match AttendanceRecord::check_in(
        &state.pool,
        employee_id,
        today,
        &req.location,
        Some(address),
        &selfie.url,
    )
    .await
    {
        Ok(record) => {
            tracing::info!("{} checked in", claims.employee_id);
            (StatusCode::OK, success_to_api_response(record))
        }
        Err(e @ AttendanceError::AlreadyCheckedOut) => (
            StatusCode::OK,
            error_to_api_response(error_codes::ALREADY_CHECKED_OUT, e.to_string()),
        ),
        Err(e) => {
            tracing::error!("Check-in failed for {}: {}", claims.employee_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Check-in failed".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn check_out(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<CheckOutRequest>,
) -> impl IntoResponse {
    let Some(employee_id) = caller_id(&claims) else {
        return (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(error_codes::AUTH_FAILED, "Invalid token subject".to_string()),
        );
    };

    let validation = validate_location(&req.location);
    if !validation.is_valid {
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, validation.errors.join("; ")),
        );
    }

    let today = Utc::now().date_naive();
    let selfie_url = match &req.selfie {
        Some(data) => {
            match state
                .storage
                .upload_photo(&claims.employee_id, data, today, PhotoKind::CheckOut)
                .await
            {
                Ok(upload) => Some(upload.url),
                Err(e) => {
                    return (
                        StatusCode::OK,
                        error_to_api_response(error_codes::VALIDATION_ERROR, e.to_string()),
                    );
                }
            }
        }
        None => None,
    };

    match AttendanceRecord::check_out(&state.pool, employee_id, today, &req.location, selfie_url)
        .await
    {
        Ok(record) => {
            tracing::info!("{} checked out", claims.employee_id);
            (StatusCode::OK, success_to_api_response(record))
        }
        Err(e @ (AttendanceError::NoCheckIn | AttendanceError::AlreadyCheckedOut)) => {
            let code = match e {
                AttendanceError::NoCheckIn => error_codes::NO_CHECK_IN,
                _ => error_codes::ALREADY_CHECKED_OUT,
            };
            (StatusCode::OK, error_to_api_response(code, e.to_string()))
        }
        Err(e) => {
            tracing::error!("Check-out failed for {}: {}", claims.employee_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Check-out failed".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn emergency_check_out(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<EmergencyCheckOutRequest>,
) -> impl IntoResponse {
    let Some(employee_id) = caller_id(&claims) else {
        return (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(error_codes::AUTH_FAILED, "Invalid token subject".to_string()),
        );
    };
    if req.reason.trim().is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "A reason is required for emergency check-out".to_string(),
            ),
        );
    }

    let today = Utc::now().date_naive();
    match AttendanceRecord::emergency_check_out(
        &state.pool,
        employee_id,
        today,
        req.last_known_location.as_ref(),
        req.reason.trim(),
    )
    .await
    {
        Ok(record) => {
            tracing::warn!(
                "{} emergency-checked out: {}",
                claims.employee_id,
                req.reason.trim()
            );
            (StatusCode::OK, success_to_api_response(record))
        }
        Err(e @ (AttendanceError::NoCheckIn | AttendanceError::AlreadyCheckedOut)) => {
            let code = match e {
                AttendanceError::NoCheckIn => error_codes::NO_CHECK_IN,
                _ => error_codes::ALREADY_CHECKED_OUT,
            };
            (StatusCode::OK, error_to_api_response(code, e.to_string()))
        }
        Err(e) => {
            tracing::error!("Emergency check-out failed for {}: {}", claims.employee_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Emergency check-out failed".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn update_location(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(req): Json<LocationUpdateRequest>,
) -> impl IntoResponse {
    let Some(employee_id) = caller_id(&claims) else {
        return (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(error_codes::AUTH_FAILED, "Invalid token subject".to_string()),
        );
    };

    let point = PathPoint {
        latitude: req.location.latitude,
        longitude: req.location.longitude,
        timestamp: req.location.timestamp.unwrap_or_else(Utc::now),
        accuracy: req.location.accuracy,
        battery_level: req.battery_level,
    };

    let today = Utc::now().date_naive();
    match AttendanceRecord::append_path_point(&state.pool, employee_id, today, point).await {
        Ok(updated) => (
            StatusCode::OK,
            success_to_api_response(LocationUpdateResponse { updated }),
        ),
        Err(e) => {
            tracing::error!("Location update failed for {}: {}", claims.employee_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Location update failed".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn get_status(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> impl IntoResponse {
    let employee_id = match query.employee_id.or_else(|| caller_id(&claims)) {
        Some(id) => id,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response(
                    error_codes::AUTH_FAILED,
                    "Invalid token subject".to_string(),
                ),
            );
        }
    };

    let today = Utc::now().date_naive();
    match AttendanceRecord::find_by_date(&state.pool, employee_id, today).await {
        Ok(record) => {
            let status = match &record {
                Some(r) => map_attendance_status(r.check_in_time, r.check_out_time),
                None => "ABSENT",
            };
            (
                StatusCode::OK,
                success_to_api_response(StatusResponse {
                    date: today,
                    status,
                    record,
                }),
            )
        }
        Err(e) => {
            tracing::error!("Status lookup failed for {}: {}", employee_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to load attendance status".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListRecordsQuery>,
) -> impl IntoResponse {
    match AttendanceRecord::list(&state.pool, &query).await {
        Ok(list) => (StatusCode::OK, success_to_api_response(list)),
        Err(e) => {
            tracing::error!("Failed to list attendance records: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to list attendance records".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn update_verification(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(req): Json<VerificationRequest>,
) -> impl IntoResponse {
    let status = req.status.trim().to_uppercase();
    if !verification_status::is_known(&status) {
        return (
            StatusCode::OK,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                format!("Unknown verification status: {}", status),
            ),
        );
    }

    match AttendanceRecord::update_verification(&state.pool, record_id, &status, req.note.as_deref())
        .await
    {
        Ok(Some(record)) => (StatusCode::OK, success_to_api_response(record)),
        Ok(None) => (
            StatusCode::OK,
            error_to_api_response(
                error_codes::NOT_FOUND,
                "Attendance record not found".to_string(),
            ),
        ),
        Err(e) => {
            tracing::error!("Verification update failed for {}: {}", record_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to update verification".to_string(),
                ),
            )
        }
    }
}
