use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::attendance::{PunchEvent, PunchKind};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TimeRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "2024-03-04T08:02:11Z", value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    #[schema(example = "arrival")]
    pub record_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[schema(nullable = true)]
    pub photo_url: Option<String>,
}

/// Time record joined with the employee's name, for admin listings.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct TimeRecordView {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "Maria Souza")]
    pub employee_name: String,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    #[schema(example = "lunch_start")]
    pub record_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo_url: Option<String>,
}

impl TimeRecord {
    /// Rows with an unknown `record_type` are not punches and yield `None`.
    pub fn to_punch(&self) -> Option<PunchEvent> {
        let kind = PunchKind::from_str(&self.record_type).ok()?;
        Some(PunchEvent::new(self.employee_id, self.timestamp, kind))
    }
}

/// Converts stored rows to punch events, dropping unknown kinds.
pub fn to_punches(records: &[TimeRecord]) -> Vec<PunchEvent> {
    let punches: Vec<PunchEvent> = records.iter().filter_map(TimeRecord::to_punch).collect();
    let skipped = records.len() - punches.len();
    if skipped > 0 {
        tracing::warn!(skipped, "Ignoring time records with unknown record_type");
    }
    punches
}

/// Punches `next` is sequenced against.
///
/// A shift stays open across midnight until its departure. While today has no
/// arrival, an open shift from the previous day (its last arrival with no
/// departure after it) is carried over, so an arrival at 23:30 can be closed
/// at 00:30. Once today has an arrival, only punches from it onwards count.
/// Arrivals are always checked against today alone.
pub fn current_shift(
    previous_day: &[PunchKind],
    today: &[PunchKind],
    next: PunchKind,
) -> Vec<PunchKind> {
    if next == PunchKind::Arrival {
        return today.to_vec();
    }
    if let Some(start) = today.iter().position(|k| *k == PunchKind::Arrival) {
        return today[start..].to_vec();
    }

    let carried = previous_day
        .iter()
        .rposition(|k| *k == PunchKind::Arrival)
        .map(|start| &previous_day[start..])
        .filter(|shift| !shift.contains(&PunchKind::Departure))
        .unwrap_or_default();

    carried.iter().chain(today).copied().collect()
}

/// Whether `next` may be recorded after the punches of the current shift.
///
/// One arrival opens the shift, an optional lunch start/end pair follows, and
/// a single departure closes it.
pub fn check_sequence(today: &[PunchKind], next: PunchKind) -> AppResult<()> {
    let has = |kind: PunchKind| today.contains(&kind);

    let problem = match next {
        PunchKind::Arrival if has(PunchKind::Arrival) => Some("Arrival already recorded today"),
        PunchKind::Arrival => None,
        _ if !has(PunchKind::Arrival) => Some("Record the arrival first"),
        _ if has(PunchKind::Departure) => Some("Workday already closed"),
        PunchKind::LunchStart if has(PunchKind::LunchStart) => {
            Some("Lunch start already recorded today")
        }
        PunchKind::LunchEnd if !has(PunchKind::LunchStart) => Some("Record the lunch start first"),
        PunchKind::LunchEnd if has(PunchKind::LunchEnd) => Some("Lunch end already recorded today"),
        _ => None,
    };

    match problem {
        Some(msg) => Err(AppError::validation(msg)),
        None => Ok(()),
    }
}
