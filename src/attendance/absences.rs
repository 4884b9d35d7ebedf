use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use super::{PunchEvent, ScheduleExpectation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AbsenceRecord {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "2024-03-06", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Always empty for now; there is no justification workflow yet.
    #[schema(nullable = true)]
    pub justification: Option<String>,
}

/// Working days (Monday to Saturday) in `[start_date, end_date]` on which an
/// active employee has no punch at all.
///
/// Results are ordered by date, then by the order of `employees`.
pub fn determine_absences(
    start_date: NaiveDate,
    end_date: NaiveDate,
    employees: &[ScheduleExpectation],
    events: &[PunchEvent],
) -> Vec<AbsenceRecord> {
    let punched: HashSet<(u64, NaiveDate)> =
        events.iter().map(|e| (e.employee_id, e.date())).collect();

    let mut absences = Vec::new();
    let mut date = start_date;

    while date <= end_date {
        if date.weekday() != Weekday::Sun {
            for employee in employees.iter().filter(|e| e.is_active_on(date)) {
                if !punched.contains(&(employee.employee_id, date)) {
                    absences.push(AbsenceRecord {
                        employee_id: employee.employee_id,
                        date,
                        justification: None,
                    });
                }
            }
        }

        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    absences
}
