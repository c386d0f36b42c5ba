use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::utils::{hash_password, is_login_eligible};

#[derive(Debug, Serialize, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub employee_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub employment_status: String,
    pub can_login: bool,
    pub reference_photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Employee row joined with its auth identity, used by the login flow.
#[derive(Debug, FromRow)]
pub struct EmployeeWithCredentials {
    pub id: Uuid,
    pub employee_id: String,
    pub employment_status: String,
    pub can_login: bool,
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub employment_status: Option<String>,
    pub region_ids: Option<Vec<Uuid>>,
    pub reference_photo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub employment_status: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceRegionsRequest {
    pub region_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListEmployeesQuery {
    pub search: Option<String>,
    /// Comma-separated employment statuses
    pub status: Option<String>,
    pub region_id: Option<Uuid>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EmployeeList {
    pub employees: Vec<Employee>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateEmployeeError {
    #[error("An employee with this email already exists")]
    EmailExists,
    #[error(
        "An auth identity exists for this email without an employee record; manual resolution required"
    )]
    DataInconsistency,
    #[error("Failed to hash password")]
    Hash,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const EMPLOYEE_COLUMNS: &str = "id, employee_id, full_name, email, phone, employment_status, \
                                can_login, reference_photo_url, created_at, updated_at";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Last 10 digits of the number, or None when fewer than 10 digits remain.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 10 {
        return None;
    }
    Some(digits[digits.len() - 10..].to_string())
}

/// Next sequence number for a year given the already-issued IDs. Malformed
/// IDs are skipped; an empty set starts the year at 1.
pub fn next_sequence(existing_ids: &[String], year: i32) -> u32 {
    let prefix = format!("PGN-{}-", year);
    existing_ids
        .iter()
        .filter_map(|id| id.strip_prefix(&prefix))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .map_or(1, |max| max + 1)
}

pub fn format_employee_id(year: i32, sequence: u32) -> String {
    format!("PGN-{}-{:04}", year, sequence)
}

/// Human-readable sequential ID for the current year. Never fails: a query
/// error falls back to the year's first sequence.
pub async fn generate_employee_id(pool: &PgPool) -> String {
    let year = Utc::now().year();
    let ids: Vec<String> = sqlx::query_scalar::<_, String>(
        "SELECT employee_id FROM employees WHERE employee_id LIKE $1",
    )
    .bind(format!("PGN-{}-%", year))
    .fetch_all(pool)
    .await
    .unwrap_or_else(|e| {
        tracing::warn!("Employee ID lookup failed, starting sequence at 1: {}", e);
        Vec::new()
    });

    format_employee_id(year, next_sequence(&ids, year))
}

impl Employee {
    /// Creates the auth identity first, then the employee row. A failure
    /// after the identity is created is not rolled back; the next attempt
    /// surfaces it as a data inconsistency for manual resolution.
    pub async fn create(
        pool: &PgPool,
        req: &CreateEmployeeRequest,
        employee_id: &str,
        employment_status: &str,
        reference_photo_url: Option<String>,
    ) -> Result<Self, CreateEmployeeError> {
        let email = normalize_email(&req.email);

        let existing: Option<Uuid> =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM auth_users WHERE email = $1")
                .bind(&email)
                .fetch_optional(pool)
                .await?;

        if let Some(auth_id) = existing {
            let employee_exists: Option<Uuid> =
                sqlx::query_scalar::<_, Uuid>("SELECT id FROM employees WHERE id = $1")
                    .bind(auth_id)
                    .fetch_optional(pool)
                    .await?;
            return match employee_exists {
                Some(_) => Err(CreateEmployeeError::EmailExists),
                None => Err(CreateEmployeeError::DataInconsistency),
            };
        }

        let password_hash = hash_password(&req.password).map_err(|_| CreateEmployeeError::Hash)?;
        let auth_id = Uuid::new_v4();
        sqlx::query("INSERT INTO auth_users (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(auth_id)
            .bind(&email)
            .bind(&password_hash)
            .execute(pool)
            .await?;

        let employee = sqlx::query_as::<_, Employee>(&format!(
            "INSERT INTO employees \
             (id, employee_id, full_name, email, phone, employment_status, can_login, reference_photo_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {EMPLOYEE_COLUMNS}"
        ))
        .bind(auth_id)
        .bind(employee_id)
        .bind(req.full_name.trim())
        .bind(&email)
        .bind(req.phone.trim())
        .bind(employment_status)
        .bind(is_login_eligible(employment_status))
        .bind(reference_photo_url)
        .fetch_one(pool)
        .await?;

        Ok(employee)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_for_login(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<EmployeeWithCredentials>, sqlx::Error> {
        sqlx::query_as::<_, EmployeeWithCredentials>(
            "SELECT e.id, e.employee_id, e.employment_status, e.can_login, a.password_hash \
             FROM employees e JOIN auth_users a ON a.id = e.id \
             WHERE e.email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
    }

    pub async fn list(pool: &PgPool, query: &ListEmployeesQuery) -> Result<EmployeeList, sqlx::Error> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let statuses: Vec<String> = query
            .status
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM employees e");
        push_filters(&mut count_query, query, &statuses);
        let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

        let mut list_query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees e"
        ));
        push_filters(&mut list_query, query, &statuses);
        list_query.push(format!(
            " ORDER BY e.{} {}",
            sort_column(query.sort_by.as_deref()),
            sort_direction(query.sort_dir.as_deref())
        ));
        list_query.push(" LIMIT ");
        list_query.push_bind(limit);
        list_query.push(" OFFSET ");
        list_query.push_bind((page - 1) * limit);

        let employees = list_query
            .build_query_as::<Employee>()
            .fetch_all(pool)
            .await?;

        Ok(EmployeeList {
            employees,
            total,
            page,
            limit,
            has_more: has_more(page, limit, total),
        })
    }

    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateEmployeeRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&format!(
            "UPDATE employees SET \
             full_name = COALESCE($2, full_name), \
             phone = COALESCE($3, phone), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING {EMPLOYEE_COLUMNS}"
        ))
        .bind(id)
        .bind(req.full_name.as_deref().map(str::trim))
        .bind(req.phone.as_deref().map(str::trim))
        .fetch_optional(pool)
        .await
    }

    /// Single write path for employment status. `can_login` is always
    /// recomputed here, never accepted from the caller.
    pub async fn change_employment_status(
        pool: &PgPool,
        id: Uuid,
        status: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&format!(
            "UPDATE employees SET employment_status = $2, can_login = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {EMPLOYEE_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(is_login_eligible(status))
        .fetch_optional(pool)
        .await
    }

    /// Full replace of the employee's region links.
    pub async fn replace_regions(
        pool: &PgPool,
        id: Uuid,
        region_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM employee_regions WHERE employee_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for region_id in region_ids {
            sqlx::query("INSERT INTO employee_regions (employee_id, region_id) VALUES ($1, $2)")
                .bind(id)
                .bind(region_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }

    pub async fn assigned_region_ids(pool: &PgPool, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT region_id FROM employee_regions WHERE employee_id = $1",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }

    pub async fn reset_password(
        pool: &PgPool,
        id: Uuid,
        new_password: &str,
    ) -> Result<(), sqlx::Error> {
        let password_hash = hash_password(new_password)
            .map_err(|e| sqlx::Error::Protocol(format!("Failed to hash password: {}", e)))?;
        let updated = sqlx::query("UPDATE auth_users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    query: &ListEmployeesQuery,
    statuses: &[String],
) {
    builder.push(" WHERE TRUE");

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        builder.push(" AND (e.full_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR e.email ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR e.phone ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR e.employee_id ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if !statuses.is_empty() {
        builder.push(" AND e.employment_status = ANY(");
        builder.push_bind(statuses.to_vec());
        builder.push(")");
    }

    if let Some(region_id) = query.region_id {
        builder.push(
            " AND EXISTS (SELECT 1 FROM employee_regions er \
             WHERE er.employee_id = e.id AND er.region_id = ",
        );
        builder.push_bind(region_id);
        builder.push(")");
    }
}

fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("full_name") => "full_name",
        Some("email") => "email",
        Some("employee_id") => "employee_id",
        Some("employment_status") => "employment_status",
        _ => "created_at",
    }
}

fn sort_direction(requested: Option<&str>) -> &'static str {
    match requested {
        Some(dir) if dir.eq_ignore_ascii_case("asc") => "ASC",
        _ => "DESC",
    }
}

pub fn has_more(page: i64, limit: i64, total: i64) -> bool {
    (page - 1) * limit + limit < total
}

/// Duplicate checks deliberately fail open: a database error reads as "not
/// taken" so a transient outage never blocks form validation.
pub async fn is_email_taken(pool: &PgPool, email: &str) -> bool {
    let email = normalize_email(email);
    if email.is_empty() {
        return false;
    }
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM employees WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap_or(false)
}

pub async fn is_phone_taken(pool: &PgPool, phone: &str) -> bool {
    let Some(digits) = normalize_phone(phone) else {
        return false;
    };
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE RIGHT(REGEXP_REPLACE(phone, '\\D', '', 'g'), 10) = $1)",
    )
    .bind(digits)
    .fetch_one(pool)
    .await
    .unwrap_or(false)
}

pub async fn is_employee_id_taken(pool: &PgPool, employee_id: &str) -> bool {
    if employee_id.trim().is_empty() {
        return false;
    }
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM employees WHERE employee_id = $1)")
        .bind(employee_id.trim())
        .fetch_one(pool)
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_starts_at_one_for_an_empty_year() {
        assert_eq!(next_sequence(&[], 2026), 1);
        assert_eq!(format_employee_id(2026, 1), "PGN-2026-0001");
    }

    #[test]
    fn sequence_increments_past_the_maximum() {
        let ids = vec![
            "PGN-2026-0001".to_string(),
            "PGN-2026-0412".to_string(),
            "PGN-2026-0007".to_string(),
        ];
        assert_eq!(next_sequence(&ids, 2026), 413);
        assert_eq!(format_employee_id(2026, 413), "PGN-2026-0413");
    }

    #[test]
    fn sequence_grows_beyond_four_digits_without_wrapping() {
        let ids = vec!["PGN-2026-9999".to_string()];
        assert_eq!(next_sequence(&ids, 2026), 10000);
        assert_eq!(format_employee_id(2026, 10000), "PGN-2026-10000");
    }

    #[test]
    fn malformed_ids_fall_back_to_the_first_sequence() {
        let ids = vec!["PGN-2026-XYZ".to_string(), "garbage".to_string()];
        assert_eq!(next_sequence(&ids, 2026), 1);
    }

    #[test]
    fn other_years_do_not_affect_the_sequence() {
        let ids = vec!["PGN-2025-0500".to_string(), "PGN-2026-0002".to_string()];
        assert_eq!(next_sequence(&ids, 2026), 3);
    }

    #[test]
    fn phone_normalization_keeps_last_ten_digits() {
        assert_eq!(
            normalize_phone("(987) 654-3210"),
            Some("9876543210".to_string())
        );
        assert_eq!(
            normalize_phone("+91 98765 43210"),
            Some("9876543210".to_string())
        );
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn email_normalization_lowercases_and_trims() {
        assert_eq!(normalize_email("  Ravi@Example.COM "), "ravi@example.com");
    }

    #[test]
    fn has_more_follows_the_page_arithmetic() {
        assert!(has_more(1, 20, 21));
        assert!(!has_more(1, 20, 20));
        assert!(has_more(2, 20, 41));
        assert!(!has_more(3, 20, 60));
    }

    #[test]
    fn sort_whitelist_rejects_unknown_columns() {
        assert_eq!(sort_column(Some("full_name")), "full_name");
        assert_eq!(sort_column(Some("password_hash; DROP TABLE")), "created_at");
        assert_eq!(sort_column(None), "created_at");
        assert_eq!(sort_direction(Some("asc")), "ASC");
        assert_eq!(sort_direction(Some("evil")), "DESC");
    }
}
