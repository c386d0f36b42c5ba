use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    storage::PhotoKind,
    utils::{
        employment_status, error_codes, error_to_api_response, success_to_api_response,
    },
};

use super::model::{
    ChangeStatusRequest, CreateEmployeeError, CreateEmployeeRequest, Employee,
    ListEmployeesQuery, ReplaceRegionsRequest, ResetPasswordRequest, UpdateEmployeeRequest,
    generate_employee_id, is_email_taken, is_employee_id_taken, is_phone_taken,
};

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeIdQuery {
    pub employee_id: String,
}

#[derive(Debug, Serialize)]
pub struct TakenResponse {
    pub taken: bool,
}

#[derive(Debug, Serialize)]
pub struct RegionAssignmentResponse {
    pub employee_id: Uuid,
    pub region_ids: Vec<Uuid>,
}

#[axum::debug_handler]
pub async fn create_employee(
    State(state): State<AppState>,
    Json(req): Json<CreateEmployeeRequest>,
) -> impl IntoResponse {
    if req.password.is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "Password is required".to_string(),
            ),
        );
    }
    if req.full_name.trim().is_empty() || req.email.trim().is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "Name and email are required".to_string(),
            ),
        );
    }
    let status = req
        .employment_status
        .clone()
        .unwrap_or_else(|| employment_status::ACTIVE.to_string());
    if !employment_status::is_known(&status) {
        return (
            StatusCode::OK,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                format!("Unknown employment status: {}", status),
            ),
        );
    }

    let employee_id = generate_employee_id(&state.pool).await;

    // The reference photo is uploaded before any row is written so a storage
    // failure cannot leave a half-created employee behind.
    let reference_photo_url = match &req.reference_photo {
        Some(data) => {
            let date = chrono::Utc::now().date_naive();
            match state
                .storage
                .upload_photo(&employee_id, data, date, PhotoKind::Reference)
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

    match Employee::create(&state.pool, &req, &employee_id, &status, reference_photo_url).await {
        Ok(employee) => {
            if let Some(region_ids) = &req.region_ids {
                if let Err(e) = Employee::replace_regions(&state.pool, employee.id, region_ids).await
                {
                    // The employee row stands; region assignment can be retried.
                    tracing::warn!("Region assignment failed for {}: {}", employee.id, e);
                }
            }
            (StatusCode::CREATED, success_to_api_response(employee))
        }
        Err(CreateEmployeeError::EmailExists) => (
            StatusCode::OK,
            error_to_api_response(
                error_codes::EMPLOYEE_EXISTS,
                CreateEmployeeError::EmailExists.to_string(),
            ),
        ),
        Err(CreateEmployeeError::DataInconsistency) => (
            StatusCode::OK,
            error_to_api_response(
                error_codes::DATA_INCONSISTENCY,
                CreateEmployeeError::DataInconsistency.to_string(),
            ),
        ),
        Err(e) => {
            tracing::error!("Failed to create employee: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to create employee".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn list_employees(
    State(state): State<AppState>,
    Query(query): Query<ListEmployeesQuery>,
) -> impl IntoResponse {
    match Employee::list(&state.pool, &query).await {
        Ok(list) => (StatusCode::OK, success_to_api_response(list)),
        Err(e) => {
            tracing::error!("Failed to list employees: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to list employees".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match Employee::find_by_id(&state.pool, id).await {
        Ok(Some(employee)) => (StatusCode::OK, success_to_api_response(employee)),
        Ok(None) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Employee not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to load employee {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> impl IntoResponse {
    match Employee::update_profile(&state.pool, id, &req).await {
        Ok(Some(employee)) => (StatusCode::OK, success_to_api_response(employee)),
        Ok(None) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Employee not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to update employee {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn change_employment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> impl IntoResponse {
    let status = req.employment_status.trim().to_uppercase();
    if !employment_status::is_known(&status) {
        return (
            StatusCode::OK,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                format!("Unknown employment status: {}", status),
            ),
        );
    }

    match Employee::change_employment_status(&state.pool, id, &status).await {
        Ok(Some(employee)) => (StatusCode::OK, success_to_api_response(employee)),
        Ok(None) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "Employee not found".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to change status for {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn replace_regions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplaceRegionsRequest>,
) -> impl IntoResponse {
    match Employee::find_by_id(&state.pool, id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::OK,
                error_to_api_response(error_codes::NOT_FOUND, "Employee not found".to_string()),
            );
        }
        Err(e) => {
            tracing::error!("Failed to load employee {}: {}", id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            );
        }
    }

    match Employee::replace_regions(&state.pool, id, &req.region_ids).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(RegionAssignmentResponse {
                employee_id: id,
                region_ids: req.region_ids,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to replace regions for {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to update region assignments".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResetPasswordRequest>,
) -> impl IntoResponse {
    if req.new_password.is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "Password is required".to_string(),
            ),
        );
    }

    let employee = match Employee::find_by_id(&state.pool, id).await {
        Ok(Some(employee)) => employee,
        Ok(None) => {
            return (
                StatusCode::OK,
                error_to_api_response(error_codes::NOT_FOUND, "Employee not found".to_string()),
            );
        }
        Err(e) => {
            tracing::error!("Password reset lookup failed for {}: {}", id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "An unexpected error occurred".to_string(),
                ),
            );
        }
    };

    match Employee::reset_password(&state.pool, employee.id, &req.new_password).await {
        Ok(()) => (StatusCode::OK, success_to_api_response(())),
        Err(e) => {
            // Callers get one generic message regardless of the failure.
            tracing::error!("Password reset failed for {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "An unexpected error occurred".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn check_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> impl IntoResponse {
    let taken = is_email_taken(&state.pool, &query.email).await;
    (StatusCode::OK, success_to_api_response(TakenResponse { taken }))
}

#[axum::debug_handler]
pub async fn check_phone(
    State(state): State<AppState>,
    Query(query): Query<PhoneQuery>,
) -> impl IntoResponse {
    let taken = is_phone_taken(&state.pool, &query.phone).await;
    (StatusCode::OK, success_to_api_response(TakenResponse { taken }))
}

#[axum::debug_handler]
pub async fn check_employee_id(
    State(state): State<AppState>,
    Query(query): Query<EmployeeIdQuery>,
) -> impl IntoResponse {
    let taken = is_employee_id_taken(&state.pool, &query.employee_id).await;
    (StatusCode::OK, success_to_api_response(TakenResponse { taken }))
}

#[axum::debug_handler]
pub async fn get_assigned_regions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match Employee::assigned_region_ids(&state.pool, id).await {
        Ok(region_ids) => (
            StatusCode::OK,
            success_to_api_response(RegionAssignmentResponse {
                employee_id: id,
                region_ids,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to load regions for {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            )
        }
    }
}
