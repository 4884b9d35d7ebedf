use std::str::FromStr;

use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::employee::require_employee,
    error::{AppError, AppResult},
    model::{
        employee::Employee,
        role::Role,
        supervisor::{CorrectionRequest, CorrectionStatus, SupervisorCheckin},
    },
    utils::db_utils::{Filters, SqlValue},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCheckin {
    #[schema(example = 3)]
    pub supervisor_id: u64,
    #[schema(example = "https://files.example.com/checkins/81.jpg")]
    pub photo_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[schema(example = "Residencial Jardim")]
    pub location_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateQuestionnaire {
    #[schema(example = 3)]
    pub supervisor_id: u64,
    /// Check-in the answers refer to
    pub checkin_id: Option<u64>,
    pub strengths_text: Option<String>,
    pub strengths_photo_url: Option<String>,
    pub improvements_text: Option<String>,
    pub employee_wellbeing_text: Option<String>,
    pub observations_text: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCorrectionRequest {
    #[schema(example = 3)]
    pub supervisor_id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    pub time_record_id: Option<u64>,
    #[schema(example = "arrival_time")]
    pub requested_change_type: String,
    #[schema(example = "08:17")]
    pub original_value: Option<String>,
    #[schema(example = "08:00")]
    pub requested_value: String,
    #[schema(example = "Bus strike, supervisor confirmed arrival on site")]
    pub reason: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CorrectionFilter {
    /// pending, approved or rejected
    pub status: Option<String>,
    pub employee_id: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewCorrection {
    #[schema(example = 1)]
    pub admin_id: u64,
    pub admin_notes: Option<String>,
}

/// Loads the employee and checks that they may act as a supervisor.
async fn require_supervisor(pool: &MySqlPool, supervisor_id: u64) -> AppResult<Employee> {
    let supervisor = require_employee(pool, supervisor_id, "Supervisor").await?;
    ensure_role(&supervisor, Role::can_supervise, "Employee is not a supervisor")?;
    Ok(supervisor)
}

fn ensure_role(employee: &Employee, allowed: impl Fn(Role) -> bool, msg: &str) -> AppResult<()> {
    match Role::from_str(&employee.role) {
        Ok(role) if allowed(role) => Ok(()),
        _ => {
            warn!(employee_id = employee.id, role = %employee.role, "Role not allowed");
            Err(AppError::validation(msg))
        }
    }
}

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// Supervisor site check-in
#[utoipa::path(
    post,
    path = "/api/supervisor/checkin",
    request_body = CreateCheckin,
    responses(
        (status = 201, description = "Check-in recorded", body = Object, example = json!({
            "message": "Supervisor check-in recorded",
            "checkin_id": 81
        })),
        (status = 400, description = "Missing photo_url or employee is not a supervisor"),
        (status = 404, description = "Supervisor not found")
    ),
    tag = "Supervisor"
)]
pub async fn create_checkin(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCheckin>,
) -> AppResult<HttpResponse> {
    require_text("photo_url", &payload.photo_url)?;
    require_supervisor(pool.get_ref(), payload.supervisor_id).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO supervisor_checkins
        (supervisor_id, timestamp, latitude, longitude, photo_url, location_name)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.supervisor_id)
    .bind(Utc::now())
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.photo_url.trim())
    .bind(&payload.location_name)
    .execute(pool.get_ref())
    .await?;

    let checkin_id = result.last_insert_id();
    info!(supervisor_id = payload.supervisor_id, checkin_id, "Supervisor check-in recorded");

    Ok(HttpResponse::Created().json(json!({
        "message": "Supervisor check-in recorded",
        "checkin_id": checkin_id
    })))
}

#[utoipa::path(
    get,
    path = "/api/supervisor/checkins/{supervisor_id}",
    params(("supervisor_id", Path, description = "Supervisor ID")),
    responses(
        (status = 200, description = "Check-ins, newest first", body = [SupervisorCheckin]),
        (status = 404, description = "Supervisor not found")
    ),
    tag = "Supervisor"
)]
pub async fn list_checkins(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let supervisor_id = path.into_inner();
    require_employee(pool.get_ref(), supervisor_id, "Supervisor").await?;

    let checkins = sqlx::query_as::<_, SupervisorCheckin>(
        r#"
        SELECT id, supervisor_id, timestamp, latitude, longitude, photo_url, location_name
        FROM supervisor_checkins
        WHERE supervisor_id = ?
        ORDER BY timestamp DESC
        LIMIT 100
        "#,
    )
    .bind(supervisor_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(checkins))
}

/// Supervisor questionnaire
#[utoipa::path(
    post,
    path = "/api/supervisor/questionnaire",
    request_body = CreateQuestionnaire,
    responses(
        (status = 201, description = "Questionnaire stored", body = Object, example = json!({
            "message": "Questionnaire response recorded",
            "response_id": 12
        })),
        (status = 404, description = "Supervisor or check-in not found")
    ),
    tag = "Supervisor"
)]
pub async fn submit_questionnaire(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateQuestionnaire>,
) -> AppResult<HttpResponse> {
    require_supervisor(pool.get_ref(), payload.supervisor_id).await?;

    if let Some(checkin_id) = payload.checkin_id {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM supervisor_checkins WHERE id = ?)",
        )
        .bind(checkin_id)
        .fetch_one(pool.get_ref())
        .await?;

        if !exists {
            return Err(AppError::not_found("Check-in not found"));
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO supervisor_questionnaire_responses
        (supervisor_id, checkin_id, timestamp, strengths_text, strengths_photo_url,
         improvements_text, employee_wellbeing_text, observations_text)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.supervisor_id)
    .bind(payload.checkin_id)
    .bind(Utc::now())
    .bind(&payload.strengths_text)
    .bind(&payload.strengths_photo_url)
    .bind(&payload.improvements_text)
    .bind(&payload.employee_wellbeing_text)
    .bind(&payload.observations_text)
    .execute(pool.get_ref())
    .await?;

    let response_id = result.last_insert_id();
    info!(supervisor_id = payload.supervisor_id, response_id, "Questionnaire recorded");

    Ok(HttpResponse::Created().json(json!({
        "message": "Questionnaire response recorded",
        "response_id": response_id
    })))
}

/// File a correction request
#[utoipa::path(
    post,
    path = "/api/supervisor/correction-requests",
    request_body = CreateCorrectionRequest,
    responses(
        (status = 201, description = "Correction request filed", body = Object, example = json!({
            "message": "Correction request submitted",
            "request_id": 5
        })),
        (status = 400, description = "Missing required fields"),
        (status = 404, description = "Supervisor, employee or time record not found")
    ),
    tag = "Supervisor"
)]
pub async fn create_correction_request(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCorrectionRequest>,
) -> AppResult<HttpResponse> {
    require_text("requested_change_type", &payload.requested_change_type)?;
    require_text("requested_value", &payload.requested_value)?;
    require_text("reason", &payload.reason)?;

    require_supervisor(pool.get_ref(), payload.supervisor_id).await?;
    require_employee(pool.get_ref(), payload.employee_id, "Employee").await?;

    if let Some(time_record_id) = payload.time_record_id {
        let owner = sqlx::query_scalar::<_, u64>("SELECT employee_id FROM time_records WHERE id = ?")
            .bind(time_record_id)
            .fetch_optional(pool.get_ref())
            .await?
            .ok_or_else(|| AppError::not_found("Time record not found"))?;

        if owner != payload.employee_id {
            return Err(AppError::validation("Time record belongs to another employee"));
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO supervisor_correction_requests
        (supervisor_id, employee_id, time_record_id, request_timestamp, requested_change_type,
         original_value, requested_value, reason, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.supervisor_id)
    .bind(payload.employee_id)
    .bind(payload.time_record_id)
    .bind(Utc::now())
    .bind(payload.requested_change_type.trim())
    .bind(&payload.original_value)
    .bind(payload.requested_value.trim())
    .bind(payload.reason.trim())
    .bind(CorrectionStatus::Pending.as_ref())
    .execute(pool.get_ref())
    .await?;

    let request_id = result.last_insert_id();
    info!(
        supervisor_id = payload.supervisor_id,
        employee_id = payload.employee_id,
        request_id,
        "Correction request filed"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Correction request submitted",
        "request_id": request_id
    })))
}

/// List correction requests (admin)
#[utoipa::path(
    get,
    path = "/api/admin/correction-requests",
    params(CorrectionFilter),
    responses(
        (status = 200, description = "Correction requests, newest first", body = [CorrectionRequest]),
        (status = 400, description = "Unknown status")
    ),
    tag = "Supervisor"
)]
pub async fn list_correction_requests(
    pool: web::Data<MySqlPool>,
    query: web::Query<CorrectionFilter>,
) -> AppResult<HttpResponse> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            CorrectionStatus::from_str(s)
                .map_err(|_| AppError::validation(format!("Unknown status '{s}'")))
        })
        .transpose()?;

    let mut filters = Filters::new();
    filters
        .push_opt("status = ?", status, |s| SqlValue::String(s.as_ref().to_string()))
        .push_opt("employee_id = ?", query.employee_id, SqlValue::U64);

    let sql = format!(
        r#"
        SELECT id, supervisor_id, employee_id, time_record_id, request_timestamp,
               requested_change_type, original_value, requested_value, reason, status,
               admin_notes, reviewed_at, reviewed_by_admin_id
        FROM supervisor_correction_requests
        {}
        ORDER BY request_timestamp DESC
        "#,
        filters.where_clause()
    );

    let requests = filters
        .bind(sqlx::query_as::<_, CorrectionRequest>(&sql))
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(requests))
}

/// Moves a pending request to `outcome`; reviewed requests are left untouched.
async fn review(
    pool: &MySqlPool,
    request_id: u64,
    decision: ReviewCorrection,
    outcome: CorrectionStatus,
) -> AppResult<HttpResponse> {
    let admin = require_employee(pool, decision.admin_id, "Admin").await?;
    ensure_role(&admin, |r| r == Role::Admin, "Only admins can review correction requests")?;

    let result = sqlx::query(
        r#"
        UPDATE supervisor_correction_requests
        SET status = ?, admin_notes = ?, reviewed_at = ?, reviewed_by_admin_id = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(outcome.as_ref())
    .bind(&decision.admin_notes)
    .bind(Utc::now())
    .bind(decision.admin_id)
    .bind(request_id)
    .bind(CorrectionStatus::Pending.as_ref())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let current = sqlx::query_scalar::<_, String>(
            "SELECT status FROM supervisor_correction_requests WHERE id = ?",
        )
        .bind(request_id)
        .fetch_optional(pool)
        .await?;

        return match current {
            None => Err(AppError::not_found("Correction request not found")),
            Some(status) => Err(AppError::validation(format!(
                "Correction request already {status}"
            ))),
        };
    }

    info!(request_id, admin_id = decision.admin_id, status = outcome.as_ref(), "Correction request reviewed");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Correction request {}", outcome.as_ref()),
        "request_id": request_id,
        "status": outcome
    })))
}

#[utoipa::path(
    put,
    path = "/api/admin/correction-requests/{request_id}/approve",
    params(("request_id", Path, description = "Correction request ID")),
    request_body = ReviewCorrection,
    responses(
        (status = 200, description = "Request approved"),
        (status = 400, description = "Request already reviewed or reviewer is not an admin"),
        (status = 404, description = "Request or admin not found")
    ),
    tag = "Supervisor"
)]
pub async fn approve_correction(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ReviewCorrection>,
) -> AppResult<HttpResponse> {
    review(pool.get_ref(), path.into_inner(), body.into_inner(), CorrectionStatus::Approved).await
}

#[utoipa::path(
    put,
    path = "/api/admin/correction-requests/{request_id}/reject",
    params(("request_id", Path, description = "Correction request ID")),
    request_body = ReviewCorrection,
    responses(
        (status = 200, description = "Request rejected"),
        (status = 400, description = "Request already reviewed or reviewer is not an admin"),
        (status = 404, description = "Request or admin not found")
    ),
    tag = "Supervisor"
)]
pub async fn reject_correction(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ReviewCorrection>,
) -> AppResult<HttpResponse> {
    review(pool.get_ref(), path.into_inner(), body.into_inner(), CorrectionStatus::Rejected).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee_with_role(role: &str) -> Employee {
        Employee {
            id: 3,
            name: "Carla Dias".into(),
            email: "carla@company.com".into(),
            phone_number: None,
            role: role.into(),
            status: "active".into(),
            admission_date: None,
            work_schedule: None,
            contract_type: None,
            expected_arrival_time: None,
            expected_departure_time: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn supervisors_and_admins_pass_the_supervisor_check() {
        assert!(ensure_role(&employee_with_role("supervisor"), Role::can_supervise, "no").is_ok());
        assert!(ensure_role(&employee_with_role("admin"), Role::can_supervise, "no").is_ok());
        assert!(matches!(
            ensure_role(&employee_with_role("employee"), Role::can_supervise, "no"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn unknown_stored_roles_are_refused() {
        assert!(ensure_role(&employee_with_role("janitor"), Role::can_supervise, "no").is_err());
    }

    #[test]
    fn blank_required_text_is_rejected() {
        assert!(require_text("reason", "   ").is_err());
        assert!(require_text("reason", "late bus").is_ok());
    }
}
