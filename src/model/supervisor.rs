use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SupervisorCheckin {
    pub id: u64,
    pub supervisor_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[schema(example = "https://files.example.com/checkins/81.jpg")]
    pub photo_url: String,
    #[schema(example = "Residencial Jardim", nullable = true)]
    pub location_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct CorrectionRequest {
    pub id: u64,
    pub supervisor_id: u64,
    pub employee_id: u64,
    pub time_record_id: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub request_timestamp: DateTime<Utc>,
    #[schema(example = "arrival_time")]
    pub requested_change_type: String,
    pub original_value: Option<String>,
    #[schema(example = "08:00")]
    pub requested_value: String,
    pub reason: String,
    #[schema(example = "pending")]
    pub status: String,
    pub admin_notes: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by_admin_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CorrectionStatus {
    Pending,
    Approved,
    Rejected,
}
