use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of material handed out to employees (uniform piece, PPE, cleaning kit...).
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct MaterialType {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Safety boots")]
    pub name: String,
    #[schema(nullable = true)]
    pub description: Option<String>,
    /// Days until a delivered item is due for replacement
    #[schema(example = 180, nullable = true)]
    pub expected_duration_days: Option<i32>,
    #[schema(example = "PPE", nullable = true)]
    pub category: Option<String>,
}

/// Delivery log joined with the material and employee names.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct MaterialLogView {
    #[schema(example = 12)]
    pub id: u64,
    pub material_type_id: u64,
    #[schema(example = "Safety boots")]
    pub material_type_name: String,
    pub employee_id: u64,
    #[schema(example = "Maria Souza")]
    pub employee_name: String,
    #[schema(value_type = String, format = "date-time")]
    pub delivery_date: DateTime<Utc>,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(nullable = true)]
    pub photo_url: Option<String>,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(nullable = true)]
    pub checkin_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date")]
    pub expected_replacement_date: Option<NaiveDate>,
}

/// Delivery date plus the type's expected duration; no duration, no date.
pub fn replacement_date(delivered_on: NaiveDate, expected_duration_days: Option<i32>) -> Option<NaiveDate> {
    expected_duration_days
        .filter(|days| *days > 0)
        .and_then(|days| delivered_on.checked_add_signed(Duration::days(days as i64)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn replacement_follows_expected_duration() {
        assert_eq!(replacement_date(date(2024, 1, 31), Some(30)), Some(date(2024, 3, 1)));
    }

    #[test]
    fn no_replacement_without_duration() {
        assert_eq!(replacement_date(date(2024, 1, 31), None), None);
        assert_eq!(replacement_date(date(2024, 1, 31), Some(0)), None);
    }
}
