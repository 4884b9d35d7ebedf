use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use super::{LatenessBasis, LatenessPolicy, PunchEvent, PunchKind, ScheduleExpectation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LatenessRecord {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "2024-03-04", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "08:06:00", value_type = String)]
    pub arrival_time: NaiveTime,
    #[schema(example = 6)]
    pub lateness_minutes: i64,
    #[schema(example = "08:00:00", value_type = String)]
    pub expected_arrival_time: NaiveTime,
}

/// Late arrivals measured from the expected arrival time
/// ([`LatenessBasis::ExpectedArrival`]): with 5 minutes of grace, 08:06
/// against 08:00 is 6 minutes late. Use [`compute_lateness_with`] and
/// [`LatenessBasis::GraceBoundary`] to count from the end of grace instead (1).
#[allow(dead_code)]
pub fn compute_lateness(
    events: &[PunchEvent],
    schedules: &[ScheduleExpectation],
    grace_period: Duration,
) -> Vec<LatenessRecord> {
    let policy = LatenessPolicy {
        grace_period,
        basis: LatenessBasis::ExpectedArrival,
    };
    compute_lateness_with(events, schedules, &policy)
}

/// An arrival is late when its time of day is strictly after the expected
/// arrival plus grace. Employees without an expected arrival are skipped.
///
/// Grace wraps within the day; a grace that crosses midnight is not handled.
pub fn compute_lateness_with(
    events: &[PunchEvent],
    schedules: &[ScheduleExpectation],
    policy: &LatenessPolicy,
) -> Vec<LatenessRecord> {
    let expected: HashMap<u64, NaiveTime> = schedules
        .iter()
        .filter_map(|s| s.expected_arrival_time.map(|t| (s.employee_id, t)))
        .collect();

    events
        .iter()
        .filter(|e| e.kind == PunchKind::Arrival)
        .filter_map(|event| {
            let expected_arrival = *expected.get(&event.employee_id)?;
            let (with_grace, _) = expected_arrival.overflowing_add_signed(policy.grace_period);

            let arrival = event.timestamp.naive_utc();
            if arrival.time() <= with_grace {
                return None;
            }

            let reference = match policy.basis {
                LatenessBasis::ExpectedArrival => expected_arrival,
                LatenessBasis::GraceBoundary => with_grace,
            };
            let lateness = arrival - arrival.date().and_time(reference);
            if lateness <= Duration::zero() {
                return None;
            }

            Some(LatenessRecord {
                employee_id: event.employee_id,
                date: arrival.date(),
                arrival_time: arrival.time(),
                lateness_minutes: lateness.num_minutes(),
                expected_arrival_time: expected_arrival,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::PunchKind::*;
    use super::super::fixtures::*;
    use super::*;

    fn five_minutes() -> Duration {
        Duration::minutes(5)
    }

    #[test]
    fn six_minutes_past_expected_is_late() {
        let schedules = vec![employee(1, None)];
        let events = vec![punch(1, at(2024, 3, 4, 8, 6), Arrival)];

        let late = compute_lateness(&events, &schedules, five_minutes());

        assert_eq!(
            late,
            vec![LatenessRecord {
                employee_id: 1,
                date: date(2024, 3, 4),
                arrival_time: time(8, 6),
                lateness_minutes: 6,
                expected_arrival_time: time(8, 0),
            }]
        );
    }

    #[test]
    fn grace_boundary_basis_counts_past_the_grace() {
        let schedules = vec![employee(1, None)];
        let events = vec![punch(1, at(2024, 3, 4, 8, 6), Arrival)];
        let policy = LatenessPolicy {
            grace_period: five_minutes(),
            basis: LatenessBasis::GraceBoundary,
        };

        let late = compute_lateness_with(&events, &schedules, &policy);

        assert_eq!(late.len(), 1);
        assert_eq!(late[0].lateness_minutes, 1);
    }

    #[test]
    fn arrival_on_the_grace_boundary_is_not_late() {
        let schedules = vec![employee(1, None)];
        let events = vec![punch(1, at(2024, 3, 4, 8, 5), Arrival)];

        assert!(compute_lateness(&events, &schedules, five_minutes()).is_empty());
    }

    #[test]
    fn only_arrivals_are_checked() {
        let schedules = vec![employee(1, None)];
        let events = vec![
            punch(1, at(2024, 3, 4, 7, 55), Arrival),
            punch(1, at(2024, 3, 4, 12, 0), LunchStart),
            punch(1, at(2024, 3, 4, 13, 0), LunchEnd),
        ];

        assert!(compute_lateness(&events, &schedules, five_minutes()).is_empty());
    }

    #[test]
    fn employees_without_schedule_are_skipped() {
        let mut unscheduled = employee(2, None);
        unscheduled.expected_arrival_time = None;
        let schedules = vec![employee(1, None), unscheduled];
        let events = vec![
            punch(2, at(2024, 3, 4, 11, 0), Arrival),
            punch(3, at(2024, 3, 4, 11, 0), Arrival),
        ];

        assert!(compute_lateness(&events, &schedules, five_minutes()).is_empty());
    }

    #[test]
    fn partial_minutes_are_floored() {
        let schedules = vec![employee(1, None)];
        let arrival = at(2024, 3, 4, 8, 10) + Duration::seconds(59);
        let events = vec![punch(1, arrival, Arrival)];

        let late = compute_lateness(&events, &schedules, five_minutes());
        assert_eq!(late[0].lateness_minutes, 10);
    }
}
