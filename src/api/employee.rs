use std::str::FromStr;

use crate::{
    error::{AppError, AppResult},
    model::{employee::Employee, role::Role},
    utils::{
        db_utils::{Filters, SqlValue, build_update_sql, execute_update},
        period::{parse_date, parse_optional_date, parse_optional_time, parse_time_of_day},
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::{MySqlExecutor, MySqlPool};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

pub(crate) const EMPLOYEE_COLUMNS: &str = r#"
    id, name, email, phone_number, role, status, admission_date, work_schedule,
    contract_type, expected_arrival_time, expected_departure_time, created_at, updated_at
"#;

/// Columns an update payload may touch
const UPDATABLE: &[&str] = &[
    "name",
    "email",
    "phone_number",
    "role",
    "status",
    "admission_date",
    "work_schedule",
    "contract_type",
    "expected_arrival_time",
    "expected_departure_time",
];

pub(crate) async fn find_employee<'e>(
    executor: impl MySqlExecutor<'e>,
    employee_id: u64,
) -> Result<Option<Employee>, sqlx::Error> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn require_employee<'e>(
    executor: impl MySqlExecutor<'e>,
    employee_id: u64,
    what: &str,
) -> AppResult<Employee> {
    find_employee(executor, employee_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{what} not found")))
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[schema(example = "maria.souza@company.com", format = "email")]
    pub email: String,
    pub role: Role,
    #[schema(example = "+5511988887777")]
    pub phone_number: Option<String>,
    #[schema(example = "2024-01-15", format = "date")]
    pub admission_date: Option<String>,
    #[schema(example = "Mon-Fri 08:00-17:00")]
    pub work_schedule: Option<String>,
    #[schema(example = "CLT")]
    pub contract_type: Option<String>,
    #[schema(example = "08:00")]
    pub expected_arrival_time: Option<String>,
    #[schema(example = "17:00")]
    pub expected_departure_time: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub role: Option<String>,
    pub status: Option<String>,
    /// Search by name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/admin/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "message": "Employee created successfully",
            "employee_id": 12
        })),
        (status = 400, description = "Missing or malformed fields"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    let name = payload.name.trim();
    let email = payload.email.trim();
    if name.is_empty() || email.is_empty() {
        return Err(AppError::validation("name and email are required"));
    }

    let admission_date = parse_optional_date("admission_date", payload.admission_date.as_deref())?;
    let expected_arrival =
        parse_optional_time("expected_arrival_time", payload.expected_arrival_time.as_deref())?;
    let expected_departure =
        parse_optional_time("expected_departure_time", payload.expected_departure_time.as_deref())?;

    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE email = ? LIMIT 1)",
    )
    .bind(email)
    .fetch_one(pool.get_ref())
    .await?;

    if taken {
        return Err(AppError::integrity("Email already registered"));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (name, email, phone_number, role, admission_date, work_schedule, contract_type,
         expected_arrival_time, expected_departure_time)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(&payload.phone_number)
    .bind(payload.role.as_ref())
    .bind(admission_date)
    .bind(&payload.work_schedule)
    .bind(&payload.contract_type)
    .bind(expected_arrival)
    .bind(expected_departure)
    .execute(pool.get_ref())
    .await?;

    let employee_id = result.last_insert_id();
    info!(employee_id, "Employee created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Employee created successfully",
        "employee_id": employee_id
    })))
}

#[utoipa::path(
    get,
    path = "/api/admin/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee"
)]
pub async fn list_employees(
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut filters = Filters::new();
    filters
        .push_opt("role = ?", query.role.clone(), SqlValue::String)
        .push_opt("status = ?", query.status.clone(), SqlValue::String);

    if let Some(search) = &query.search {
        let like = SqlValue::String(format!("%{}%", search));
        filters.push_all("(name LIKE ? OR email LIKE ?)", [like.clone(), like]);
    }

    let where_clause = filters.where_clause();

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees {}", where_clause);
    debug!(sql = %count_sql, filters = ?filters, "Counting employees");

    let (total,) = filters
        .clone()
        .bind(sqlx::query_as::<_, (i64,)>(&count_sql))
        .fetch_one(pool.get_ref())
        .await?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees {} ORDER BY name LIMIT ? OFFSET ?",
        where_clause
    );

    let employees = filters
        .bind(sqlx::query_as::<_, Employee>(&data_sql))
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/admin/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee = require_employee(pool.get_ref(), path.into_inner(), "Employee").await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/admin/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body(
        content = Object,
        description = "Partial update; any of name, email, phone_number, role, status, admission_date, work_schedule, contract_type, expected_arrival_time, expected_departure_time",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Employee updated successfully"),
        (status = 400, description = "Unknown field or malformed value"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee"
)]
pub async fn update_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();

    validate_update(&body)?;
    let update = build_update_sql("employees", &body, UPDATABLE, "id", employee_id)?;

    let affected = execute_update(pool.get_ref(), update).await?;

    // MySQL reports 0 affected rows when nothing changed, so check existence
    if affected == 0 && find_employee(pool.get_ref(), employee_id).await?.is_none() {
        return Err(AppError::not_found("Employee not found"));
    }

    info!(employee_id, "Employee updated");
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee updated successfully" })))
}

fn validate_update(body: &Value) -> AppResult<()> {
    if let Some(role) = body.get("role").and_then(Value::as_str) {
        Role::from_str(role).map_err(|_| AppError::validation(format!("Unknown role '{role}'")))?;
    }
    if let Some(status) = body.get("status").and_then(Value::as_str) {
        if !matches!(status, "active" | "inactive") {
            return Err(AppError::validation("status must be active or inactive"));
        }
    }
    if let Some(name) = body.get("name") {
        if name.as_str().is_none_or(|n| n.trim().is_empty()) {
            return Err(AppError::validation("name cannot be empty"));
        }
    }
    if let Some(raw) = text_field(body, "admission_date")? {
        parse_date("admission_date", raw)?;
    }
    for field in ["expected_arrival_time", "expected_departure_time"] {
        if let Some(raw) = text_field(body, field)? {
            parse_time_of_day(field, raw)?;
        }
    }
    Ok(())
}

/// Non-null values of `field` must be strings.
fn text_field<'a>(body: &'a Value, field: &str) -> AppResult<Option<&'a str>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(AppError::validation(format!("{field} must be a string"))),
    }
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/admin/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee still has time records, deliveries or requests")
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Employee not found"));
    }

    info!(employee_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_rejects_unknown_role_and_status() {
        assert!(validate_update(&json!({ "role": "ceo" })).is_err());
        assert!(validate_update(&json!({ "status": "on_vacation" })).is_err());
        assert!(validate_update(&json!({ "name": "  " })).is_err());
        assert!(validate_update(&json!({ "role": "supervisor", "status": "inactive" })).is_ok());
    }

    #[test]
    fn update_rejects_malformed_dates_and_times() {
        let rejected = [
            json!({ "admission_date": "15/01/2024" }),
            json!({ "admission_date": "" }),
            json!({ "admission_date": 20240115 }),
            json!({ "expected_arrival_time": "8h" }),
            json!({ "expected_departure_time": "25:00" }),
        ];
        for body in rejected {
            assert!(
                matches!(validate_update(&body), Err(AppError::Validation(_))),
                "{body} should be rejected"
            );
        }

        let accepted = json!({
            "admission_date": "2024-01-15",
            "expected_arrival_time": "08:00",
            "expected_departure_time": null
        });
        assert!(validate_update(&accepted).is_ok());

        let update = build_update_sql("employees", &accepted, UPDATABLE, "id", 1).unwrap();
        assert!(matches!(update.values[0], SqlValue::Date(_)));
        assert!(matches!(update.values[1], SqlValue::Time(_)));
    }
}
