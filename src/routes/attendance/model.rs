use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use crate::utils::geo::{MOVEMENT_THRESHOLD_METERS, RawLocation, has_significant_movement};

pub mod verification_status {
    pub const PENDING: &str = "PENDING";
    pub const VERIFIED: &str = "VERIFIED";
    pub const REJECTED: &str = "REJECTED";
    pub const FLAGGED: &str = "FLAGGED";

    pub const ALL: &[&str] = &[PENDING, VERIFIED, REJECTED, FLAGGED];

    pub fn is_known(status: &str) -> bool {
        ALL.contains(&status)
    }
}

/// One GPS sample retained in a record's movement log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub accuracy: f64,
    pub battery_level: Option<f64>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_in_latitude: Option<f64>,
    pub check_in_longitude: Option<f64>,
    pub check_in_accuracy: Option<f64>,
    pub check_in_address: Option<String>,
    pub check_in_selfie_url: Option<String>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,
    pub check_out_accuracy: Option<f64>,
    pub check_out_selfie_url: Option<String>,
    pub work_hours: Option<f64>,
    pub path: Json<Vec<PathPoint>>,
    pub verification_status: String,
    pub verification_note: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("No check-in found for today")]
    NoCheckIn,
    #[error("Already checked out for today")]
    AlreadyCheckedOut,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRecordsQuery {
    pub employee_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecordList {
    pub records: Vec<AttendanceRecord>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

const RECORD_COLUMNS: &str = "id, employee_id, date, \
    check_in_time, check_in_latitude, check_in_longitude, check_in_accuracy, \
    check_in_address, check_in_selfie_url, \
    check_out_time, check_out_latitude, check_out_longitude, check_out_accuracy, \
    check_out_selfie_url, work_hours, path, verification_status, verification_note";

/// Derived purely from which timestamps are present.
pub fn map_attendance_status(
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
) -> &'static str {
    match (check_in, check_out) {
        (Some(_), Some(_)) => "CHECKED_OUT",
        (Some(_), None) => "CHECKED_IN",
        _ => "ABSENT",
    }
}

/// Elapsed hours between check-in and check-out, rounded to 2 decimals.
pub fn compute_work_hours(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> f64 {
    let hours = (check_out - check_in).num_milliseconds() as f64 / 3_600_000.0;
    (hours * 100.0).round() / 100.0
}

/// A point joins the path when it is the first sample or has moved at least
/// the threshold distance since the last one.
pub fn should_append_point(path: &[PathPoint], point: &PathPoint) -> bool {
    match path.last() {
        None => true,
        Some(last) => has_significant_movement(
            last.latitude,
            last.longitude,
            point.latitude,
            point.longitude,
            MOVEMENT_THRESHOLD_METERS,
        ),
    }
}

impl AttendanceRecord {
    pub async fn find_by_date(
        pool: &PgPool,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM daily_attendance WHERE employee_id = $1 AND date = $2"
        ))
        .bind(employee_id)
        .bind(date)
        .fetch_optional(pool)
        .await
    }

    /// Creates or overwrites today's check-in. Re-check-in is deliberate:
    /// a crashed client retries and simply overwrites the check-in fields of
    /// the same row. The path and verification status restart with it. A row
    /// that is already checked out is final.
    pub async fn check_in(
        pool: &PgPool,
        employee_id: Uuid,
        date: NaiveDate,
        location: &RawLocation,
        address: Option<String>,
        selfie_url: &str,
    ) -> Result<Self, AttendanceError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "INSERT INTO daily_attendance \
             (id, employee_id, date, check_in_time, check_in_latitude, check_in_longitude, \
              check_in_accuracy, check_in_address, check_in_selfie_url, path, verification_status) \
             VALUES ($1, $2, $3, NOW(), $4, $5, $6, $7, $8, '[]'::jsonb, 'PENDING') \
             ON CONFLICT (employee_id, date) DO UPDATE SET \
               check_in_time = NOW(), \
               check_in_latitude = EXCLUDED.check_in_latitude, \
               check_in_longitude = EXCLUDED.check_in_longitude, \
               check_in_accuracy = EXCLUDED.check_in_accuracy, \
               check_in_address = EXCLUDED.check_in_address, \
               check_in_selfie_url = EXCLUDED.check_in_selfie_url, \
               path = '[]'::jsonb, \
               verification_status = 'PENDING' \
             WHERE daily_attendance.check_out_time IS NULL \
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind(date)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.accuracy)
        .bind(address)
        .bind(selfie_url)
        .fetch_optional(pool)
        .await?;

        // The conditional upsert returns no row when the day is already
        // checked out.
        record.ok_or(AttendanceError::AlreadyCheckedOut)
    }

    pub async fn check_out(
        pool: &PgPool,
        employee_id: Uuid,
        date: NaiveDate,
        location: &RawLocation,
        selfie_url: Option<String>,
    ) -> Result<Self, AttendanceError> {
        let record = Self::find_by_date(pool, employee_id, date)
            .await?
            .ok_or(AttendanceError::NoCheckIn)?;
        let check_in_time = record.check_in_time.ok_or(AttendanceError::NoCheckIn)?;
        if record.check_out_time.is_some() {
            return Err(AttendanceError::AlreadyCheckedOut);
        }

        let now = Utc::now();
        let work_hours = compute_work_hours(check_in_time, now);

        let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "UPDATE daily_attendance SET \
               check_out_time = $2, \
               check_out_latitude = $3, \
               check_out_longitude = $4, \
               check_out_accuracy = $5, \
               check_out_selfie_url = $6, \
               work_hours = $7, \
               verification_status = 'PENDING' \
             WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(record.id)
        .bind(now)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.accuracy)
        .bind(selfie_url)
        .bind(work_hours)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Check-out without the usual preconditions, for clients that lost
    /// connectivity or battery mid-shift. Falls back to the stored check-in
    /// coordinates at accuracy 100 when no last-known location is supplied.
    /// The record is FLAGGED for review rather than auto-verified.
    pub async fn emergency_check_out(
        pool: &PgPool,
        employee_id: Uuid,
        date: NaiveDate,
        last_known: Option<&RawLocation>,
        reason: &str,
    ) -> Result<Self, AttendanceError> {
        let record = Self::find_by_date(pool, employee_id, date)
            .await?
            .ok_or(AttendanceError::NoCheckIn)?;
        let check_in_time = record.check_in_time.ok_or(AttendanceError::NoCheckIn)?;
        if record.check_out_time.is_some() {
            return Err(AttendanceError::AlreadyCheckedOut);
        }

        let (latitude, longitude, accuracy) = match last_known {
            Some(loc) => (loc.latitude, loc.longitude, loc.accuracy),
            None => (
                record.check_in_latitude.unwrap_or(0.0),
                record.check_in_longitude.unwrap_or(0.0),
                100.0,
            ),
        };

        let now = Utc::now();
        let work_hours = compute_work_hours(check_in_time, now);
        let note = format!("Emergency check-out: {}", reason);

        let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "UPDATE daily_attendance SET \
               check_out_time = $2, \
               check_out_latitude = $3, \
               check_out_longitude = $4, \
               check_out_accuracy = $5, \
               work_hours = $6, \
               verification_status = 'FLAGGED', \
               verification_note = $7 \
             WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(record.id)
        .bind(now)
        .bind(latitude)
        .bind(longitude)
        .bind(accuracy)
        .bind(work_hours)
        .bind(note)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Appends a path point when movement warrants it. Returns false, without
    /// erroring, when there is no open record to track against or the point
    /// is within the movement threshold.
    pub async fn append_path_point(
        pool: &PgPool,
        employee_id: Uuid,
        date: NaiveDate,
        point: PathPoint,
    ) -> Result<bool, sqlx::Error> {
        let record = match Self::find_by_date(pool, employee_id, date).await? {
            Some(r) if r.check_in_time.is_some() && r.check_out_time.is_none() => r,
            _ => return Ok(false),
        };

        if !should_append_point(&record.path.0, &point) {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE daily_attendance SET path = path || $2::jsonb WHERE id = $1",
        )
        .bind(record.id)
        .bind(Json(&point))
        .execute(pool)
        .await?;

        Ok(true)
    }

    pub async fn list(pool: &PgPool, query: &ListRecordsQuery) -> Result<RecordList, sqlx::Error> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);

        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM daily_attendance");
        push_filters(&mut count_query, query);
        let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

        let mut list_query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RECORD_COLUMNS} FROM daily_attendance"
        ));
        push_filters(&mut list_query, query);
        list_query.push(" ORDER BY date DESC, check_in_time DESC");
        list_query.push(" LIMIT ");
        list_query.push_bind(limit);
        list_query.push(" OFFSET ");
        list_query.push_bind((page - 1) * limit);

        let records = list_query
            .build_query_as::<AttendanceRecord>()
            .fetch_all(pool)
            .await?;

        Ok(RecordList {
            records,
            total,
            page,
            limit,
            has_more: crate::routes::employee::has_more(page, limit, total),
        })
    }

    pub async fn update_verification(
        pool: &PgPool,
        record_id: Uuid,
        status: &str,
        note: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(&format!(
            "UPDATE daily_attendance SET verification_status = $2, verification_note = $3 \
             WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(record_id)
        .bind(status)
        .bind(note)
        .fetch_optional(pool)
        .await
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ListRecordsQuery) {
    builder.push(" WHERE TRUE");
    if let Some(employee_id) = query.employee_id {
        builder.push(" AND employee_id = ");
        builder.push_bind(employee_id);
    }
    if let Some(from) = query.from {
        builder.push(" AND date >= ");
        builder.push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND date <= ");
        builder.push_bind(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(latitude: f64, longitude: f64) -> PathPoint {
        PathPoint {
            latitude,
            longitude,
            timestamp: Utc::now(),
            accuracy: 10.0,
            battery_level: Some(0.8),
        }
    }

    #[test]
    fn status_is_derived_from_timestamp_presence() {
        let now = Utc::now();
        assert_eq!(map_attendance_status(None, None), "ABSENT");
        assert_eq!(map_attendance_status(Some(now), None), "CHECKED_IN");
        assert_eq!(map_attendance_status(Some(now), Some(now)), "CHECKED_OUT");
        // A dangling check-out without a check-in still reads as absent
        assert_eq!(map_attendance_status(None, Some(now)), "ABSENT");
    }

    #[test]
    fn work_hours_round_to_two_decimals() {
        let check_in = Utc.with_ymd_and_hms(2026, 3, 7, 9, 0, 0).unwrap();
        let check_out = Utc.with_ymd_and_hms(2026, 3, 7, 17, 30, 0).unwrap();
        assert_eq!(compute_work_hours(check_in, check_out), 8.5);

        let check_out = Utc.with_ymd_and_hms(2026, 3, 7, 9, 50, 0).unwrap();
        assert_eq!(compute_work_hours(check_in, check_out), 0.83);

        assert_eq!(compute_work_hours(check_in, check_in), 0.0);
    }

    #[test]
    fn first_point_always_joins_the_path() {
        assert!(should_append_point(&[], &point(12.0, 77.0)));
    }

    #[test]
    fn points_within_the_threshold_are_dropped() {
        let path = vec![point(12.0, 77.0)];
        // ~11m north
        assert!(!should_append_point(&path, &point(12.0001, 77.0)));
        // ~110m north
        assert!(should_append_point(&path, &point(12.001, 77.0)));
    }

    #[test]
    fn only_the_last_point_sets_the_threshold() {
        let path = vec![point(12.0, 77.0), point(12.01, 77.0)];
        // far from the first point, but adjacent to the last
        assert!(!should_append_point(&path, &point(12.0101, 77.0)));
    }

    #[test]
    fn verification_status_whitelist() {
        for s in ["PENDING", "VERIFIED", "REJECTED", "FLAGGED"] {
            assert!(verification_status::is_known(s));
        }
        assert!(!verification_status::is_known("APPROVED"));
        assert!(!verification_status::is_known("pending"));
    }
}
