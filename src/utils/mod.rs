use axum::Json;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;

pub mod geo;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// Employment statuses an employee record can carry.
pub mod employment_status {
    pub const ACTIVE: &str = "ACTIVE";
    pub const SUSPENDED: &str = "SUSPENDED";
    pub const RESIGNED: &str = "RESIGNED";
    pub const TERMINATED: &str = "TERMINATED";
    pub const ON_LEAVE: &str = "ON_LEAVE";

    pub const ALL: &[&str] = &[ACTIVE, SUSPENDED, RESIGNED, TERMINATED, ON_LEAVE];

    pub fn is_known(status: &str) -> bool {
        ALL.contains(&status)
    }
}

/// Single authority for the `can_login` derivation. Both the auth routes and
/// the employee directory call this; the flag is never set independently.
pub fn is_login_eligible(status: &str) -> bool {
    matches!(
        status,
        employment_status::ACTIVE | employment_status::ON_LEAVE
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Internal employee UUID
    pub sub: String,
    /// Human-readable sequential ID (PGN-<year>-NNNN)
    pub employee_id: String,
    pub employment_status: String,
    pub can_login: bool,
    pub exp: i64,
    pub iat: i64,
}

pub fn generate_token(
    internal_id: &str,
    employee_id: &str,
    employment_status: &str,
    config: &Config,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::seconds(config.jwt_expiration().as_secs() as i64))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: internal_id.to_string(),
        employee_id: employee_id.to_string(),
        employment_status: employment_status.to_string(),
        can_login: is_login_eligible(employment_status),
        exp: expiration,
        iat: Utc::now().timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 0 on success, a non-zero error code otherwise
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_data: Option<T>,
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const EMPLOYEE_EXISTS: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const ALREADY_CHECKED_OUT: i32 = 1006;
    pub const NO_CHECK_IN: i32 = 1007;
    pub const DATA_INCONSISTENCY: i32 = 1008;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_eligibility_follows_employment_status() {
        assert!(is_login_eligible(employment_status::ACTIVE));
        assert!(is_login_eligible(employment_status::ON_LEAVE));
        assert!(!is_login_eligible(employment_status::SUSPENDED));
        assert!(!is_login_eligible(employment_status::RESIGNED));
        assert!(!is_login_eligible(employment_status::TERMINATED));
        assert!(!is_login_eligible("NONSENSE"));
    }

    #[test]
    fn error_envelope_omits_resp_data() {
        let Json(response) = error_to_api_response::<()>(
            error_codes::NOT_FOUND,
            "Employee not found".to_string(),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], 1004);
        assert_eq!(json["msg"], "Employee not found");
        assert!(json.get("resp_data").is_none());

        let Json(response) = success_to_api_response(42);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["resp_data"], 42);
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let config = test_config();
        let token =
            generate_token("abc-123", "PGN-2026-0042", employment_status::ACTIVE, &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "abc-123");
        assert_eq!(claims.employee_id, "PGN-2026-0042");
        assert!(claims.can_login);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = test_config();
        let token =
            generate_token("abc-123", "PGN-2026-0042", employment_status::ACTIVE, &config).unwrap();
        let mut other = test_config();
        other.jwt_secret = "different-secret".into();
        assert!(verify_token(&token, &other).is_err());
    }

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            redis_url: String::new(),
            jwt_secret: "test-secret".into(),
            jwt_expiration_secs: 3600,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
            server_host: "127.0.0.1".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
            storage_url: "http://localhost:9000".into(),
            storage_bucket: "attendance".into(),
            storage_api_key: "key".into(),
            geocoding_url: "https://nominatim.openstreetmap.org".into(),
        }
    }
}
