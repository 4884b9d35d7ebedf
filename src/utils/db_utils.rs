use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use sqlx::{
    MySql, MySqlPool,
    mysql::MySqlArguments,
    query::{Query, QueryAs},
};

use crate::error::{AppError, AppResult};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Builds `UPDATE <table> SET a = ?, b = ? WHERE <id_column> = ?` from a JSON
/// object. Only keys listed in `allowed` may be updated.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> AppResult<SqlUpdate> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::validation("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(AppError::validation("No fields provided for update"));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(AppError::validation(format!("Field '{unknown}' cannot be updated")));
    }

    // Build SET clause
    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values = Vec::with_capacity(obj.len() + 1);

    // Convert JSON values → SqlValue
    for value in obj.values() {
        match value {
            Value::String(s) => values.push(string_value(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(AppError::validation("Unsupported JSON value type")),
        }
    }

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// Dates (`YYYY-MM-DD`) and times of day (`HH:MM[:SS]`) bind as their SQL types.
fn string_value(s: &str) -> SqlValue {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        SqlValue::Date(d)
    } else if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
        SqlValue::Time(t)
    } else if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M") {
        SqlValue::Time(t)
    } else {
        SqlValue::String(s.to_string())
    }
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(
    pool: &MySqlPool,
    update: SqlUpdate,
) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = bind_value(query, value);
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::String(v) => query.bind(v),
        SqlValue::I64(v) => query.bind(v),
        SqlValue::U64(v) => query.bind(v),
        SqlValue::F64(v) => query.bind(v),
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::Date(v) => query.bind(v),
        SqlValue::Time(v) => query.bind(v),
        SqlValue::Timestamp(v) => query.bind(v),
        SqlValue::Null => query.bind(None::<String>),
    }
}

/// ===============================
/// Optional WHERE filters for listings
/// ===============================
#[derive(Debug, Clone, Default)]
pub struct Filters {
    conditions: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// `condition` holds exactly one `?` placeholder.
    pub fn push(&mut self, condition: &'static str, value: SqlValue) -> &mut Self {
        self.conditions.push(condition);
        self.values.push(value);
        self
    }

    /// `condition` holds one `?` per value, bound in order.
    pub fn push_all(
        &mut self,
        condition: &'static str,
        values: impl IntoIterator<Item = SqlValue>,
    ) -> &mut Self {
        self.conditions.push(condition);
        self.values.extend(values);
        self
    }

    pub fn push_opt<T>(
        &mut self,
        condition: &'static str,
        value: Option<T>,
        wrap: impl FnOnce(T) -> SqlValue,
    ) -> &mut Self {
        if let Some(v) = value {
            self.push(condition, wrap(v));
        }
        self
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn bind<'q, O>(
        self,
        mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    ) -> QueryAs<'q, MySql, O, MySqlArguments> {
        for value in self.values {
            query = match value {
                SqlValue::String(v) => query.bind(v),
                SqlValue::I64(v) => query.bind(v),
                SqlValue::U64(v) => query.bind(v),
                SqlValue::F64(v) => query.bind(v),
                SqlValue::Bool(v) => query.bind(v),
                SqlValue::Date(v) => query.bind(v),
                SqlValue::Time(v) => query.bind(v),
                SqlValue::Timestamp(v) => query.bind(v),
                SqlValue::Null => query.bind(None::<String>),
            };
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EMPLOYEE_COLUMNS: &[&str] = &["name", "admission_date", "expected_arrival_time", "status"];

    #[test]
    fn builds_set_clause_with_typed_values() {
        let payload = json!({
            "admission_date": "2024-01-15",
            "expected_arrival_time": "08:00",
            "name": "Maria Souza",
        });

        let update = build_update_sql("employees", &payload, EMPLOYEE_COLUMNS, "id", 9).unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET admission_date = ?, expected_arrival_time = ?, name = ? WHERE id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
                SqlValue::Time(NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
                SqlValue::String("Maria Souza".into()),
                SqlValue::U64(9),
            ]
        );
    }

    #[test]
    fn rejects_columns_outside_the_whitelist() {
        let payload = json!({ "id": 3 });
        let err = build_update_sql("employees", &payload, EMPLOYEE_COLUMNS, "id", 9).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql("employees", &json!({}), EMPLOYEE_COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("employees", &json!([1]), EMPLOYEE_COLUMNS, "id", 1).is_err());
        assert!(
            build_update_sql("employees", &json!({ "name": ["x"] }), EMPLOYEE_COLUMNS, "id", 1)
                .is_err()
        );
    }

    #[test]
    fn filters_join_conditions_in_order() {
        let mut filters = Filters::new();
        filters
            .push_opt("t.employee_id = ?", Some(4u64), SqlValue::U64)
            .push_opt("t.record_type = ?", None::<String>, SqlValue::String)
            .push("t.timestamp >= ?", SqlValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));

        assert_eq!(
            filters.where_clause(),
            "WHERE t.employee_id = ? AND t.timestamp >= ?"
        );
        assert_eq!(filters.values.len(), 2);
        assert_eq!(Filters::new().where_clause(), "");
    }

    #[test]
    fn multi_placeholder_conditions_keep_value_order() {
        let like = SqlValue::String("%souza%".to_string());
        let mut filters = Filters::new();
        filters
            .push("role = ?", SqlValue::String("supervisor".to_string()))
            .push_all("(name LIKE ? OR email LIKE ?)", [like.clone(), like.clone()]);

        assert_eq!(
            filters.where_clause(),
            "WHERE role = ? AND (name LIKE ? OR email LIKE ?)"
        );
        assert_eq!(
            filters.values,
            vec![SqlValue::String("supervisor".to_string()), like.clone(), like]
        );
    }

    #[test]
    fn null_clears_a_column() {
        let update =
            build_update_sql("employees", &json!({ "status": null }), EMPLOYEE_COLUMNS, "id", 1)
                .unwrap();
        assert_eq!(update.values[0], SqlValue::Null);
    }
}
