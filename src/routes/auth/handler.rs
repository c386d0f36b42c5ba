use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    routes::employee::Employee,
    utils::{
        Claims, employment_status, error_codes, error_to_api_response, generate_token,
        success_to_api_response, verify_password,
    },
};

use super::model::{LoginRequest, LoginResponse, LogoutResponse, RefreshTokenResponse};

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let employee = match Employee::find_for_login(&state.pool, &req.email).await {
        Ok(Some(employee)) => employee,
        Ok(None) => {
            return (
                StatusCode::OK,
                error_to_api_response(
                    error_codes::AUTH_FAILED,
                    "Invalid email or password".to_string(),
                ),
            );
        }
        Err(e) => {
            tracing::error!("Login lookup failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            );
        }
    };

    if !employee.can_login {
        let msg = if employee.employment_status == employment_status::SUSPENDED {
            "Your account is suspended. Contact your administrator.".to_string()
        } else {
            "Your account is not permitted to log in.".to_string()
        };
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::PERMISSION_DENIED, msg),
        );
    }

    match verify_password(&req.password, &employee.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::OK,
                error_to_api_response(
                    error_codes::AUTH_FAILED,
                    "Invalid email or password".to_string(),
                ),
            );
        }
        Err(e) => {
            tracing::error!("Password verification failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "Database error".to_string()),
            );
        }
    }

    match generate_token(
        &employee.id.to_string(),
        &employee.employee_id,
        &employee.employment_status,
        &state.config,
    ) {
        Ok(token) => (
            StatusCode::OK,
            success_to_api_response(LoginResponse {
                token,
                employee_id: employee.employee_id,
                employment_status: employee.employment_status,
            }),
        ),
        Err(e) => {
            tracing::error!("Token generation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to generate token".to_string(),
                ),
            )
        }
    }
}

/// Reissues a token from claims the auth middleware already validated. The
/// employment status is taken from the token; status changes take effect at
/// the next full login.
#[axum::debug_handler]
pub async fn refresh_token(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match generate_token(
        &claims.sub,
        &claims.employee_id,
        &claims.employment_status,
        &state.config,
    ) {
        Ok(token) => (
            StatusCode::OK,
            success_to_api_response(RefreshTokenResponse { token }),
        ),
        Err(e) => {
            tracing::error!("Token refresh failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to refresh token".to_string(),
                ),
            )
        }
    }
}

/// Tokens are stateless, so logout is an acknowledged no-op once the
/// presented token has passed the auth middleware.
#[axum::debug_handler]
pub async fn logout(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    tracing::info!("{} logged out", claims.employee_id);
    (StatusCode::OK, success_to_api_response(LogoutResponse {}))
}
