//! Attendance aggregation over punch events.
//!
//! Everything in here works on plain data: the handlers load punches and the
//! roster from MySQL, build these types and hand them over. No pool, no I/O.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

pub mod absences;
pub mod hours;
pub mod lateness;

pub use absences::{AbsenceRecord, determine_absences};
pub use hours::{WeekSummary, calculate_worked_hours_with};
pub use lateness::{LatenessRecord, compute_lateness_with};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PunchKind {
    Arrival,
    LunchStart,
    LunchEnd,
    Departure,
}

impl PunchKind {
    /// Arrival and lunch end start a worked interval.
    pub fn opens_interval(self) -> bool {
        matches!(self, PunchKind::Arrival | PunchKind::LunchEnd)
    }

    /// Departure and lunch start close it.
    pub fn closes_interval(self) -> bool {
        matches!(self, PunchKind::Departure | PunchKind::LunchStart)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchEvent {
    pub employee_id: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: PunchKind,
}

impl PunchEvent {
    pub fn new(employee_id: u64, timestamp: DateTime<Utc>, kind: PunchKind) -> Self {
        Self {
            employee_id,
            timestamp,
            kind,
        }
    }

    /// Calendar date of the punch (UTC).
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Orders events by timestamp, keeping the relative order of equal instants.
///
/// The aggregation functions assume ascending input and do not sort on their
/// own; callers that cannot guarantee it pay O(n log n) here.
pub fn sorted(mut events: Vec<PunchEvent>) -> Vec<PunchEvent> {
    events.sort_by_key(|e| e.timestamp);
    events
}

/// Roster view of an employee used by absence and lateness detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleExpectation {
    pub employee_id: u64,
    pub expected_arrival_time: Option<NaiveTime>,
    pub expected_departure_time: Option<NaiveTime>,
    pub admission_date: Option<NaiveDate>,
    pub active: bool,
}

impl ScheduleExpectation {
    /// Active status set and admitted on or before `date` (no admission date counts as admitted).
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.active && self.admission_date.is_none_or(|admitted| admitted <= date)
    }
}

/// Weekly target and night window used by [`calculate_worked_hours_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPolicy {
    pub weekly_target: Duration,
    pub night_start: NaiveTime,
    pub night_end: NaiveTime,
}

pub const WEEKLY_TARGET_HOURS: i64 = 44;

impl Default for ShiftPolicy {
    fn default() -> Self {
        Self {
            weekly_target: Duration::hours(WEEKLY_TARGET_HOURS),
            night_start: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            night_end: NaiveTime::from_hms_opt(5, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Where lateness minutes are counted from once an arrival is past the grace boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatenessBasis {
    /// From the expected arrival time; 08:06 against 08:00 is 6 minutes late.
    #[default]
    ExpectedArrival,
    /// From expected arrival plus grace; 08:06 against 08:00 + 5min is 1 minute late.
    GraceBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatenessPolicy {
    pub grace_period: Duration,
    pub basis: LatenessBasis,
}

pub const DEFAULT_GRACE_MINUTES: i64 = 5;

impl Default for LatenessPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::minutes(DEFAULT_GRACE_MINUTES),
            basis: LatenessBasis::default(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    pub fn punch(employee_id: u64, ts: DateTime<Utc>, kind: PunchKind) -> PunchEvent {
        PunchEvent::new(employee_id, ts, kind)
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    pub fn employee(employee_id: u64, admission_date: Option<NaiveDate>) -> ScheduleExpectation {
        ScheduleExpectation {
            employee_id,
            expected_arrival_time: Some(time(8, 0)),
            expected_departure_time: Some(time(17, 0)),
            admission_date,
            active: true,
        }
    }
}
