use actix_web::{HttpResponse, web};
use chrono::{NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::employee::require_employee,
    error::{AppError, AppResult},
    model::material::{MaterialLogView, MaterialType, replacement_date},
    utils::{
        db_utils::{Filters, SqlValue, build_update_sql, execute_update},
        period::{Period, parse_optional_date},
    },
};

const UPDATABLE: &[&str] = &["name", "description", "expected_duration_days", "category"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMaterialType {
    #[schema(example = "Safety boots")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 180)]
    pub expected_duration_days: Option<i32>,
    #[schema(example = "PPE")]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMaterialLog {
    #[schema(example = 2)]
    pub material_type_id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    /// Defaults to 1
    #[schema(example = 1)]
    pub quantity: Option<i32>,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
    /// Check-in during which the delivery happened
    pub checkin_id: Option<u64>,
    /// YYYY-MM-DD, defaults to today
    #[schema(example = "2024-03-04")]
    pub delivery_date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MaterialLogQuery {
    pub employee_id: Option<u64>,
    pub material_type_id: Option<u64>,
    /// YYYY-MM-DD, inclusive
    pub start_date: Option<String>,
    /// YYYY-MM-DD, inclusive
    pub end_date: Option<String>,
}

fn validate_duration(days: Option<i32>) -> AppResult<()> {
    if days.is_some_and(|d| d < 0) {
        return Err(AppError::validation("expected_duration_days cannot be negative"));
    }
    Ok(())
}

fn validate_type_update(body: &Value) -> AppResult<()> {
    match body.get("expected_duration_days") {
        None | Some(Value::Null) => {}
        Some(days) => {
            let days = days.as_i64().ok_or_else(|| {
                AppError::validation("expected_duration_days must be a whole number")
            })?;
            let days = i32::try_from(days)
                .map_err(|_| AppError::validation("expected_duration_days is out of range"))?;
            validate_duration(Some(days))?;
        }
    }
    if body
        .get("name")
        .is_some_and(|n| n.as_str().is_none_or(|n| n.trim().is_empty()))
    {
        return Err(AppError::validation("name cannot be empty"));
    }
    Ok(())
}

async fn find_material_type(pool: &MySqlPool, type_id: u64) -> AppResult<MaterialType> {
    sqlx::query_as::<_, MaterialType>(
        "SELECT id, name, description, expected_duration_days, category FROM material_types WHERE id = ?",
    )
    .bind(type_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Material type not found"))
}

#[utoipa::path(
    post,
    path = "/api/admin/materials/types",
    request_body = CreateMaterialType,
    responses(
        (status = 201, description = "Material type created", body = Object, example = json!({
            "message": "Material type created",
            "material_type_id": 2
        })),
        (status = 400, description = "Missing name"),
        (status = 409, description = "Material type already exists")
    ),
    tag = "Materials"
)]
pub async fn create_material_type(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateMaterialType>,
) -> AppResult<HttpResponse> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    validate_duration(payload.expected_duration_days)?;

    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM material_types WHERE name = ?)",
    )
    .bind(name)
    .fetch_one(pool.get_ref())
    .await?;

    if taken {
        return Err(AppError::integrity("Material type already exists"));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO material_types (name, description, expected_duration_days, category)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(&payload.description)
    .bind(payload.expected_duration_days)
    .bind(&payload.category)
    .execute(pool.get_ref())
    .await?;

    let material_type_id = result.last_insert_id();
    info!(material_type_id, name, "Material type created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Material type created",
        "material_type_id": material_type_id
    })))
}

#[utoipa::path(
    get,
    path = "/api/admin/materials/types",
    responses(
        (status = 200, description = "Material types ordered by name", body = [MaterialType])
    ),
    tag = "Materials"
)]
pub async fn list_material_types(pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let types = sqlx::query_as::<_, MaterialType>(
        "SELECT id, name, description, expected_duration_days, category FROM material_types ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(types))
}

#[utoipa::path(
    put,
    path = "/api/admin/materials/types/{type_id}",
    params(("type_id", Path, description = "Material type ID")),
    request_body(
        content = Object,
        description = "Partial update; any of name, description, expected_duration_days, category",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Material type updated"),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Material type not found"),
        (status = 409, description = "Name already used by another type")
    ),
    tag = "Materials"
)]
pub async fn update_material_type(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let type_id = path.into_inner();
    find_material_type(pool.get_ref(), type_id).await?;

    validate_type_update(&body)?;

    let update = build_update_sql("material_types", &body, UPDATABLE, "id", type_id)?;
    execute_update(pool.get_ref(), update).await?;

    info!(material_type_id = type_id, "Material type updated");
    Ok(HttpResponse::Ok().json(json!({ "message": "Material type updated" })))
}

#[utoipa::path(
    delete,
    path = "/api/admin/materials/types/{type_id}",
    params(("type_id", Path, description = "Material type ID")),
    responses(
        (status = 200, description = "Material type deleted"),
        (status = 404, description = "Material type not found"),
        (status = 409, description = "Deliveries still reference this type")
    ),
    tag = "Materials"
)]
pub async fn delete_material_type(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let type_id = path.into_inner();

    let result = sqlx::query("DELETE FROM material_types WHERE id = ?")
        .bind(type_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Integrity(_) => AppError::integrity(
                "Cannot delete: deliveries are recorded for this material type",
            ),
            other => other,
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Material type not found"));
    }

    info!(material_type_id = type_id, "Material type deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Material type deleted" })))
}

/// Log a material delivery
#[utoipa::path(
    post,
    path = "/api/admin/materials/logs",
    request_body = CreateMaterialLog,
    responses(
        (status = 201, description = "Delivery logged", body = Object, example = json!({
            "message": "Material delivery logged",
            "log_id": 40,
            "expected_replacement_date": "2024-08-31"
        })),
        (status = 400, description = "Invalid quantity or delivery_date"),
        (status = 404, description = "Material type or employee not found")
    ),
    tag = "Materials"
)]
pub async fn create_material_log(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateMaterialLog>,
) -> AppResult<HttpResponse> {
    let quantity = payload.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(AppError::validation("quantity must be at least 1"));
    }

    let delivered_on = parse_optional_date("delivery_date", payload.delivery_date.as_deref())?
        .unwrap_or_else(|| Utc::now().date_naive());

    let material_type = find_material_type(pool.get_ref(), payload.material_type_id).await?;
    require_employee(pool.get_ref(), payload.employee_id, "Employee").await?;

    let expected_replacement = replacement_date(delivered_on, material_type.expected_duration_days);

    let result = sqlx::query(
        r#"
        INSERT INTO material_logs
        (material_type_id, employee_id, delivery_date, quantity, photo_url, notes, checkin_id,
         expected_replacement_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.material_type_id)
    .bind(payload.employee_id)
    .bind(delivered_on.and_time(NaiveTime::MIN).and_utc())
    .bind(quantity)
    .bind(&payload.photo_url)
    .bind(&payload.notes)
    .bind(payload.checkin_id)
    .bind(expected_replacement)
    .execute(pool.get_ref())
    .await?;

    let log_id = result.last_insert_id();
    info!(
        log_id,
        material_type_id = payload.material_type_id,
        employee_id = payload.employee_id,
        quantity,
        "Material delivery logged"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Material delivery logged",
        "log_id": log_id,
        "expected_replacement_date": expected_replacement
    })))
}

#[utoipa::path(
    get,
    path = "/api/admin/materials/logs",
    params(MaterialLogQuery),
    responses(
        (status = 200, description = "Deliveries, newest first", body = [MaterialLogView]),
        (status = 400, description = "Malformed date")
    ),
    tag = "Materials"
)]
pub async fn list_material_logs(
    pool: web::Data<MySqlPool>,
    query: web::Query<MaterialLogQuery>,
) -> AppResult<HttpResponse> {
    let start = parse_optional_date("start_date", query.start_date.as_deref())?;
    let end = parse_optional_date("end_date", query.end_date.as_deref())?;

    let mut filters = Filters::new();
    filters
        .push_opt("l.employee_id = ?", query.employee_id, SqlValue::U64)
        .push_opt("l.material_type_id = ?", query.material_type_id, SqlValue::U64)
        .push_opt("l.delivery_date >= ?", start, |d| {
            SqlValue::Timestamp(Period { start: d, end: d }.bounds().0)
        })
        .push_opt("l.delivery_date < ?", end, |d| {
            SqlValue::Timestamp(Period { start: d, end: d }.bounds().1)
        });

    let sql = format!(
        r#"
        SELECT l.id, l.material_type_id, m.name AS material_type_name, l.employee_id,
               e.name AS employee_name, l.delivery_date, l.quantity, l.photo_url, l.notes,
               l.checkin_id, l.expected_replacement_date
        FROM material_logs l
        JOIN material_types m ON m.id = l.material_type_id
        JOIN employees e ON e.id = l.employee_id
        {}
        ORDER BY l.delivery_date DESC, l.id DESC
        "#,
        filters.where_clause()
    );

    let logs = filters
        .bind(sqlx::query_as::<_, MaterialLogView>(&sql))
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_durations_are_rejected() {
        assert!(validate_duration(Some(-3)).is_err());
        assert!(validate_duration(Some(0)).is_ok());
        assert!(validate_duration(None).is_ok());
    }

    #[test]
    fn type_update_needs_whole_day_counts() {
        for body in [
            json!({ "expected_duration_days": "abc" }),
            json!({ "expected_duration_days": 1.5 }),
            json!({ "expected_duration_days": -1 }),
            json!({ "expected_duration_days": 3_000_000_000i64 }),
            json!({ "name": "" }),
        ] {
            assert!(
                matches!(validate_type_update(&body), Err(AppError::Validation(_))),
                "{body} should be rejected"
            );
        }

        assert!(validate_type_update(&json!({ "expected_duration_days": 90 })).is_ok());
        assert!(validate_type_update(&json!({ "expected_duration_days": null })).is_ok());
    }
}
