use std::str::FromStr;

use actix_web::{HttpResponse, web};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::{
    attendance::PunchKind,
    error::{AppError, AppResult},
    model::time_record::{TimeRecord, TimeRecordView, check_sequence, current_shift},
    utils::{
        db_utils::{Filters, SqlValue},
        period::{Period, parse_optional_date},
    },
};

const HISTORY_LIMIT: i64 = 30;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PunchRequest {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = json!(-23.5614))]
    pub latitude: Option<f64>,
    #[schema(example = json!(-46.6559))]
    pub longitude: Option<f64>,
    #[schema(example = "https://files.example.com/punches/7-0804.jpg")]
    pub photo_url: Option<String>,
}

impl PunchRequest {
    fn validate(&self) -> AppResult<()> {
        if self.latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
            return Err(AppError::validation("latitude must be between -90 and 90"));
        }
        if self.longitude.is_some_and(|lon| !(-180.0..=180.0).contains(&lon)) {
            return Err(AppError::validation("longitude must be between -180 and 180"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeParam {
    pub employee_id: u64,
}

/// Today's punches, one slot per kind.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct DayStatus {
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub arrival: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub lunch_start: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub lunch_end: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub departure: Option<DateTime<Utc>>,
}

impl DayStatus {
    fn from_records(employee_id: u64, date: NaiveDate, records: &[TimeRecord]) -> Self {
        let mut status = DayStatus {
            employee_id,
            date,
            ..Default::default()
        };
        for record in records {
            let Ok(kind) = PunchKind::from_str(&record.record_type) else {
                continue;
            };
            let slot = match kind {
                PunchKind::Arrival => &mut status.arrival,
                PunchKind::LunchStart => &mut status.lunch_start,
                PunchKind::LunchEnd => &mut status.lunch_end,
                PunchKind::Departure => &mut status.departure,
            };
            slot.get_or_insert(record.timestamp);
        }
        status
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TimeRecordQuery {
    pub employee_id: Option<u64>,
    /// YYYY-MM-DD, inclusive
    pub start_date: Option<String>,
    /// YYYY-MM-DD, inclusive
    pub end_date: Option<String>,
    pub limit: Option<u32>,
}

async fn records_between(
    executor: impl sqlx::MySqlExecutor<'_>,
    employee_id: u64,
    day: NaiveDate,
) -> Result<Vec<TimeRecord>, sqlx::Error> {
    let (from, until) = Period { start: day, end: day }.bounds();
    sqlx::query_as::<_, TimeRecord>(
        r#"
        SELECT id, employee_id, timestamp, record_type, latitude, longitude, photo_url
        FROM time_records
        WHERE employee_id = ? AND timestamp >= ? AND timestamp < ?
        ORDER BY timestamp
        "#,
    )
    .bind(employee_id)
    .bind(from)
    .bind(until)
    .fetch_all(executor)
    .await
}

fn kinds_of(records: &[TimeRecord]) -> Vec<PunchKind> {
    records
        .iter()
        .filter_map(|r| PunchKind::from_str(&r.record_type).ok())
        .collect()
}

/// Locks the employee row, checks the current shift's sequence and inserts the punch.
async fn record_punch(
    pool: &MySqlPool,
    request: PunchRequest,
    kind: PunchKind,
) -> AppResult<HttpResponse> {
    request.validate()?;

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    // Serializes concurrent punches of the same employee
    sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE id = ? FOR UPDATE")
        .bind(request.employee_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    let day = now.date_naive();
    let today = kinds_of(&records_between(&mut *tx, request.employee_id, day).await?);

    // a shift opened yesterday may still be running
    let previous_day = if kind != PunchKind::Arrival && !today.contains(&PunchKind::Arrival) {
        kinds_of(&records_between(&mut *tx, request.employee_id, day - Duration::days(1)).await?)
    } else {
        Vec::new()
    };

    let shift = current_shift(&previous_day, &today, kind);
    if let Err(e) = check_sequence(&shift, kind) {
        warn!(employee_id = request.employee_id, record_type = %kind, error = %e, "Punch rejected");
        return Err(e);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO time_records (employee_id, timestamp, record_type, latitude, longitude, photo_url)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(request.employee_id)
    .bind(now)
    .bind(kind.as_ref())
    .bind(request.latitude)
    .bind(request.longitude)
    .bind(&request.photo_url)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let record_id = result.last_insert_id();
    info!(employee_id = request.employee_id, record_id, record_type = %kind, "Punch recorded");

    Ok(HttpResponse::Created().json(json!({
        "message": "Time record created",
        "record_id": record_id,
        "record_type": kind,
        "timestamp": now
    })))
}

/// Record arrival
#[utoipa::path(
    post,
    path = "/api/record/arrival",
    request_body = PunchRequest,
    responses(
        (status = 201, description = "Arrival recorded", body = Object, example = json!({
            "message": "Time record created",
            "record_id": 101,
            "record_type": "arrival",
            "timestamp": "2024-03-04T08:02:11Z"
        })),
        (status = 400, description = "Arrival already recorded today"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Records"
)]
pub async fn arrival(
    pool: web::Data<MySqlPool>,
    body: web::Json<PunchRequest>,
) -> AppResult<HttpResponse> {
    record_punch(pool.get_ref(), body.into_inner(), PunchKind::Arrival).await
}

/// Record lunch start
#[utoipa::path(
    post,
    path = "/api/record/lunch-start",
    request_body = PunchRequest,
    responses(
        (status = 201, description = "Lunch start recorded"),
        (status = 400, description = "No arrival yet, lunch already started or day closed"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Records"
)]
pub async fn lunch_start(
    pool: web::Data<MySqlPool>,
    body: web::Json<PunchRequest>,
) -> AppResult<HttpResponse> {
    record_punch(pool.get_ref(), body.into_inner(), PunchKind::LunchStart).await
}

/// Record lunch end
#[utoipa::path(
    post,
    path = "/api/record/lunch-end",
    request_body = PunchRequest,
    responses(
        (status = 201, description = "Lunch end recorded"),
        (status = 400, description = "Lunch not started, already ended or day closed"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Records"
)]
pub async fn lunch_end(
    pool: web::Data<MySqlPool>,
    body: web::Json<PunchRequest>,
) -> AppResult<HttpResponse> {
    record_punch(pool.get_ref(), body.into_inner(), PunchKind::LunchEnd).await
}

/// Record departure
#[utoipa::path(
    post,
    path = "/api/record/departure",
    request_body = PunchRequest,
    responses(
        (status = 201, description = "Departure recorded"),
        (status = 400, description = "No open shift or departure already recorded"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Records"
)]
pub async fn departure(
    pool: web::Data<MySqlPool>,
    body: web::Json<PunchRequest>,
) -> AppResult<HttpResponse> {
    record_punch(pool.get_ref(), body.into_inner(), PunchKind::Departure).await
}

#[utoipa::path(
    get,
    path = "/api/record/status",
    params(EmployeeParam),
    responses(
        (status = 200, description = "Today's punches", body = DayStatus),
        (status = 404, description = "Employee not found")
    ),
    tag = "Records"
)]
pub async fn status(
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeParam>,
) -> AppResult<HttpResponse> {
    let employee_id = query.employee_id;
    ensure_employee(pool.get_ref(), employee_id).await?;

    let today = Utc::now().date_naive();
    let records = records_between(pool.get_ref(), employee_id, today).await?;

    Ok(HttpResponse::Ok().json(DayStatus::from_records(employee_id, today, &records)))
}

#[utoipa::path(
    get,
    path = "/api/record/history",
    params(EmployeeParam),
    responses(
        (status = 200, description = "Last 30 punches, newest first", body = [TimeRecord]),
        (status = 404, description = "Employee not found")
    ),
    tag = "Records"
)]
pub async fn history(
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeParam>,
) -> AppResult<HttpResponse> {
    let employee_id = query.employee_id;
    ensure_employee(pool.get_ref(), employee_id).await?;

    let records = sqlx::query_as::<_, TimeRecord>(
        r#"
        SELECT id, employee_id, timestamp, record_type, latitude, longitude, photo_url
        FROM time_records
        WHERE employee_id = ?
        ORDER BY timestamp DESC
        LIMIT ?
        "#,
    )
    .bind(employee_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(records))
}

/// List time records (admin)
#[utoipa::path(
    get,
    path = "/api/admin/time-records",
    params(TimeRecordQuery),
    responses(
        (status = 200, description = "Time records, newest first", body = [TimeRecordView]),
        (status = 400, description = "Malformed date")
    ),
    tag = "Records"
)]
pub async fn list_time_records(
    pool: web::Data<MySqlPool>,
    query: web::Query<TimeRecordQuery>,
) -> AppResult<HttpResponse> {
    let start = parse_optional_date("start_date", query.start_date.as_deref())?;
    let end = parse_optional_date("end_date", query.end_date.as_deref())?;
    let limit = query.limit.unwrap_or(500).clamp(1, 5000);

    let mut filters = Filters::new();
    filters
        .push_opt("t.employee_id = ?", query.employee_id, SqlValue::U64)
        .push_opt("t.timestamp >= ?", start, |d| {
            SqlValue::Timestamp(Period { start: d, end: d }.bounds().0)
        })
        .push_opt("t.timestamp < ?", end, |d| {
            SqlValue::Timestamp(Period { start: d, end: d }.bounds().1)
        });

    let sql = format!(
        r#"
        SELECT t.id, t.employee_id, e.name AS employee_name, t.timestamp, t.record_type,
               t.latitude, t.longitude, t.photo_url
        FROM time_records t
        JOIN employees e ON e.id = t.employee_id
        {}
        ORDER BY t.timestamp DESC
        LIMIT ?
        "#,
        filters.where_clause()
    );

    let records = filters
        .bind(sqlx::query_as::<_, TimeRecordView>(&sql))
        .bind(limit as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(records))
}

async fn ensure_employee(pool: &MySqlPool, employee_id: u64) -> AppResult<()> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
            .bind(employee_id)
            .fetch_one(pool)
            .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::not_found("Employee not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: u64, hour: u32, record_type: &str) -> TimeRecord {
        TimeRecord {
            id,
            employee_id: 7,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap(),
            record_type: record_type.to_string(),
            latitude: None,
            longitude: None,
            photo_url: None,
        }
    }

    #[test]
    fn status_slots_follow_record_types() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let records = [
            record(1, 8, "arrival"),
            record(2, 12, "lunch_start"),
            record(3, 13, "legacy_kind"),
        ];

        let status = DayStatus::from_records(7, date, &records);

        assert_eq!(status.arrival, Some(records[0].timestamp));
        assert_eq!(status.lunch_start, Some(records[1].timestamp));
        assert_eq!(status.lunch_end, None);
        assert_eq!(status.departure, None);
    }

    #[test]
    fn coordinates_out_of_range_are_rejected() {
        let request = PunchRequest {
            employee_id: 1,
            latitude: Some(91.0),
            longitude: Some(0.0),
            photo_url: None,
        };
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));

        let request = PunchRequest {
            employee_id: 1,
            latitude: Some(-23.5),
            longitude: Some(-46.6),
            photo_url: None,
        };
        assert!(request.validate().is_ok());
    }
}
