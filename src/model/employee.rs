use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::attendance::ScheduleExpectation;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Maria Souza",
        "email": "maria.souza@company.com",
        "phone_number": "+5511988887777",
        "role": "employee",
        "status": "active",
        "admission_date": "2024-01-15",
        "work_schedule": "Mon-Fri 08:00-17:00; Sat 08:00-12:00",
        "contract_type": "CLT",
        "expected_arrival_time": "08:00:00",
        "expected_departure_time": "17:00:00"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Maria Souza")]
    pub name: String,

    #[schema(example = "maria.souza@company.com")]
    pub email: String,

    #[schema(example = "+5511988887777", nullable = true)]
    pub phone_number: Option<String>,

    #[schema(example = "employee")]
    pub role: String,

    #[schema(example = "active")]
    pub status: String,

    #[schema(example = "2024-01-15", value_type = Option<String>, format = "date")]
    pub admission_date: Option<NaiveDate>,

    #[schema(nullable = true)]
    pub work_schedule: Option<String>,

    #[schema(example = "CLT", nullable = true)]
    pub contract_type: Option<String>,

    #[schema(example = "08:00:00", value_type = Option<String>)]
    pub expected_arrival_time: Option<NaiveTime>,

    #[schema(example = "17:00:00", value_type = Option<String>)]
    pub expected_departure_time: Option<NaiveTime>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub updated_at: Option<DateTime<Utc>>,
}

pub const STATUS_ACTIVE: &str = "active";

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    pub fn schedule(&self) -> ScheduleExpectation {
        ScheduleExpectation {
            employee_id: self.id,
            expected_arrival_time: self.expected_arrival_time,
            expected_departure_time: self.expected_departure_time,
            admission_date: self.admission_date,
            active: self.is_active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_carries_roster_fields() {
        let employee = Employee {
            id: 4,
            name: "João Lima".into(),
            email: "joao@company.com".into(),
            phone_number: None,
            role: "employee".into(),
            status: "inactive".into(),
            admission_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            work_schedule: None,
            contract_type: None,
            expected_arrival_time: NaiveTime::from_hms_opt(7, 30, 0),
            expected_departure_time: None,
            created_at: None,
            updated_at: None,
        };

        let schedule = employee.schedule();

        assert_eq!(schedule.employee_id, 4);
        assert!(!schedule.active);
        assert_eq!(schedule.expected_arrival_time, NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(schedule.admission_date, NaiveDate::from_ymd_opt(2024, 1, 15));
    }
}
