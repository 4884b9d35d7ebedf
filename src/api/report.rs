//! Lateness, hours-worked and absence reports, as JSON or rendered PDF.

use std::collections::HashMap;
use std::str::FromStr;

use actix_web::{HttpResponse, http::header, web};
use chrono::{NaiveDate, Utc};
use futures_util::future::try_join;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use strum_macros::EnumString;
use tracing::{debug, info};
use utoipa::IntoParams;

use crate::{
    api::employee::EMPLOYEE_COLUMNS,
    attendance::{
        ScheduleExpectation, calculate_worked_hours_with, compute_lateness_with, determine_absences,
        sorted,
    },
    config::Config,
    error::{AppError, AppResult},
    model::{
        employee::Employee,
        time_record::{TimeRecord, to_punches},
    },
    render::{DocumentRenderer, ReportTemplate},
    utils::{
        db_utils::{Filters, SqlValue},
        period::{Period, resolve_period},
    },
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// YYYY-MM-DD, defaults to the first day of the current month
    pub start_date: Option<String>,
    /// YYYY-MM-DD, defaults to the last day of the start month
    pub end_date: Option<String>,
    pub employee_id: Option<u64>,
    /// `json` (default) or `pdf`
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReportFormat {
    #[default]
    Json,
    Pdf,
}

impl ReportFormat {
    fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(str::trim).filter(|r| !r.is_empty()) {
            None => Ok(ReportFormat::Json),
            Some(r) => ReportFormat::from_str(r)
                .map_err(|_| AppError::validation(format!("Unknown format '{r}'. Use json or pdf"))),
        }
    }
}

/// Report row carrying the employee's display name.
#[derive(Debug, Serialize)]
pub struct Named<T> {
    pub employee_name: String,
    #[serde(flatten)]
    pub record: T,
}

#[derive(Debug, Serialize)]
struct ReportBody<T> {
    start_date: NaiveDate,
    end_date: NaiveDate,
    records: Vec<Named<T>>,
}

/// Payload handed to the document renderer.
#[derive(Debug, Serialize)]
struct ReportDocument<'a, T> {
    start_date: String,
    end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    employee_name: Option<&'a str>,
    generated_at: String,
    records: &'a [Named<T>],
}

struct ReportInput {
    period: Period,
    format: ReportFormat,
    roster: Vec<Employee>,
    records: Vec<TimeRecord>,
}

impl ReportInput {
    fn schedules(&self) -> Vec<ScheduleExpectation> {
        self.roster.iter().map(Employee::schedule).collect()
    }

    fn names(&self) -> HashMap<u64, String> {
        self.roster.iter().map(|e| (e.id, e.name.clone())).collect()
    }
}

async fn load_roster(pool: &MySqlPool, employee_id: Option<u64>) -> Result<Vec<Employee>, sqlx::Error> {
    let mut filters = Filters::new();
    filters.push_opt("id = ?", employee_id, SqlValue::U64);

    let sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees {} ORDER BY name",
        filters.where_clause()
    );
    filters
        .bind(sqlx::query_as::<_, Employee>(&sql))
        .fetch_all(pool)
        .await
}

async fn load_records(
    pool: &MySqlPool,
    employee_id: Option<u64>,
    period: Period,
) -> Result<Vec<TimeRecord>, sqlx::Error> {
    let (from, until) = period.bounds();
    let mut filters = Filters::new();
    filters
        .push("timestamp >= ?", SqlValue::Timestamp(from))
        .push("timestamp < ?", SqlValue::Timestamp(until))
        .push_opt("employee_id = ?", employee_id, SqlValue::U64);

    let sql = format!(
        r#"
        SELECT id, employee_id, timestamp, record_type, latitude, longitude, photo_url
        FROM time_records
        {}
        ORDER BY timestamp
        "#,
        filters.where_clause()
    );
    filters
        .bind(sqlx::query_as::<_, TimeRecord>(&sql))
        .fetch_all(pool)
        .await
}

/// Resolves the query and loads roster and punches concurrently.
async fn load_input(pool: &MySqlPool, query: &ReportQuery) -> AppResult<ReportInput> {
    let format = ReportFormat::parse(query.format.as_deref())?;
    let period = resolve_period(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        Utc::now().date_naive(),
    )?;

    let (roster, records) = try_join(
        load_roster(pool, query.employee_id),
        load_records(pool, query.employee_id, period),
    )
    .await?;

    if query.employee_id.is_some() && roster.is_empty() {
        return Err(AppError::not_found("Employee not found"));
    }

    debug!(
        start = %period.start,
        end = %period.end,
        employees = roster.len(),
        records = records.len(),
        "Report input loaded"
    );

    Ok(ReportInput {
        period,
        format,
        roster,
        records,
    })
}

fn attach_names<T>(
    rows: Vec<T>,
    names: &HashMap<u64, String>,
    employee_of: impl Fn(&T) -> u64,
) -> Vec<Named<T>> {
    rows.into_iter()
        .map(|record| Named {
            employee_name: names.get(&employee_of(&record)).cloned().unwrap_or_default(),
            record,
        })
        .collect()
}

async fn respond<T: Serialize>(
    renderer: &DocumentRenderer,
    template: ReportTemplate,
    input: &ReportInput,
    employee_name: Option<&str>,
    records: Vec<Named<T>>,
) -> AppResult<HttpResponse> {
    let Period { start, end } = input.period;
    info!(report = %template, %start, %end, rows = records.len(), "Report generated");

    match input.format {
        ReportFormat::Json => Ok(HttpResponse::Ok().json(ReportBody {
            start_date: start,
            end_date: end,
            records,
        })),
        ReportFormat::Pdf => {
            let document = ReportDocument {
                start_date: start.format("%d/%m/%Y").to_string(),
                end_date: end.format("%d/%m/%Y").to_string(),
                employee_name,
                generated_at: Utc::now().format("%d/%m/%Y %H:%M").to_string(),
                records: &records,
            };
            let pdf = renderer.render(template, &document).await?;

            Ok(HttpResponse::Ok()
                .content_type("application/pdf")
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", template.file_name(start, end)),
                ))
                .body(pdf))
        }
    }
}

/// Lateness report
#[utoipa::path(
    get,
    path = "/api/admin/reports/lateness",
    params(ReportQuery),
    responses(
        (status = 200, description = "Late arrivals in the period (JSON or PDF)", body = Object, example = json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-31",
            "records": [{
                "employee_name": "Maria Souza",
                "employee_id": 7,
                "date": "2024-03-04",
                "arrival_time": "08:06:00",
                "lateness_minutes": 6,
                "expected_arrival_time": "08:00:00"
            }]
        })),
        (status = 400, description = "Malformed date or format"),
        (status = 404, description = "Employee not found"),
        (status = 503, description = "No document renderer configured")
    ),
    tag = "Reports"
)]
pub async fn lateness_report(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    renderer: web::Data<DocumentRenderer>,
    query: web::Query<ReportQuery>,
) -> AppResult<HttpResponse> {
    let input = load_input(pool.get_ref(), &query).await?;

    let events = sorted(to_punches(&input.records));
    let late = compute_lateness_with(&events, &input.schedules(), &config.lateness);
    let rows = attach_names(late, &input.names(), |r| r.employee_id);

    respond(renderer.get_ref(), ReportTemplate::ReportLateness, &input, None, rows).await
}

/// Hours-worked report
#[utoipa::path(
    get,
    path = "/api/admin/reports/hours-worked",
    params(ReportQuery),
    responses(
        (status = 200, description = "Weekly worked, overtime and night-shift totals for one employee", body = Object, example = json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-31",
            "records": [{
                "employee_name": "Maria Souza",
                "employee_id": 7,
                "week_key": "2024-10",
                "week_start": "2024-03-04",
                "week_end": "2024-03-10",
                "total_worked_seconds": 162000,
                "total_overtime_seconds": 3600,
                "total_night_shift_seconds": 0,
                "days_worked": ["2024-03-04", "2024-03-05"]
            }]
        })),
        (status = 400, description = "employee_id missing or malformed date"),
        (status = 404, description = "Employee not found"),
        (status = 503, description = "No document renderer configured")
    ),
    tag = "Reports"
)]
pub async fn hours_worked_report(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    renderer: web::Data<DocumentRenderer>,
    query: web::Query<ReportQuery>,
) -> AppResult<HttpResponse> {
    if query.employee_id.is_none() {
        return Err(AppError::validation("employee_id is required"));
    }

    let input = load_input(pool.get_ref(), &query).await?;

    let events = sorted(to_punches(&input.records));
    let weeks = calculate_worked_hours_with(&events, &config.shift);
    let rows = attach_names(weeks, &input.names(), |w| w.employee_id);

    let employee_name = input.roster.first().map(|e| e.name.as_str());
    respond(
        renderer.get_ref(),
        ReportTemplate::ReportHoursWorked,
        &input,
        employee_name,
        rows,
    )
    .await
}

/// Absence report
#[utoipa::path(
    get,
    path = "/api/admin/reports/absences",
    params(ReportQuery),
    responses(
        (status = 200, description = "Expected working days without any punch", body = Object, example = json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-31",
            "records": [{
                "employee_name": "Maria Souza",
                "employee_id": 7,
                "date": "2024-03-06",
                "justification": null
            }]
        })),
        (status = 400, description = "Malformed date or format"),
        (status = 404, description = "Employee not found"),
        (status = 503, description = "No document renderer configured")
    ),
    tag = "Reports"
)]
pub async fn absences_report(
    pool: web::Data<MySqlPool>,
    renderer: web::Data<DocumentRenderer>,
    query: web::Query<ReportQuery>,
) -> AppResult<HttpResponse> {
    let input = load_input(pool.get_ref(), &query).await?;

    let events = to_punches(&input.records);
    let absences = determine_absences(
        input.period.start,
        input.period.end,
        &input.schedules(),
        &events,
    );
    let rows = attach_names(absences, &input.names(), |a| a.employee_id);

    respond(renderer.get_ref(), ReportTemplate::ReportAbsences, &input, None, rows).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AbsenceRecord;
    use serde_json::json;

    #[test]
    fn format_defaults_to_json_and_ignores_case() {
        assert_eq!(ReportFormat::parse(None).unwrap(), ReportFormat::Json);
        assert_eq!(ReportFormat::parse(Some("")).unwrap(), ReportFormat::Json);
        assert_eq!(ReportFormat::parse(Some("PDF")).unwrap(), ReportFormat::Pdf);
        assert!(matches!(
            ReportFormat::parse(Some("xlsx")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn named_rows_flatten_the_record() {
        let names = HashMap::from([(7, "Maria Souza".to_string())]);
        let absences = vec![
            AbsenceRecord {
                employee_id: 7,
                date: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
                justification: None,
            },
            AbsenceRecord {
                employee_id: 99,
                date: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
                justification: None,
            },
        ];

        let rows = attach_names(absences, &names, |a| a.employee_id);

        assert_eq!(
            serde_json::to_value(&rows[0]).unwrap(),
            json!({
                "employee_name": "Maria Souza",
                "employee_id": 7,
                "date": "2024-03-06",
                "justification": null
            })
        );
        assert_eq!(rows[1].employee_name, "");
    }
}
