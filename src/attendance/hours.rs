use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use derive_more::Display;
use serde::Serialize;
use utoipa::ToSchema;

use super::{PunchEvent, ShiftPolicy};

/// ISO year and week, rendered as `YYYY-WW`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display(fmt = "{}-{:02}", year, week)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WeekSummary {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "2024-10")]
    pub week_key: String,
    #[schema(example = "2024-03-04", value_type = String, format = "date")]
    pub week_start: NaiveDate,
    #[schema(example = "2024-03-10", value_type = String, format = "date")]
    pub week_end: NaiveDate,
    pub total_worked_seconds: i64,
    pub total_overtime_seconds: i64,
    pub total_night_shift_seconds: i64,
    #[schema(value_type = Vec<String>)]
    pub days_worked: BTreeSet<NaiveDate>,
}

impl WeekSummary {
    fn empty(employee_id: u64, key: WeekKey, date: NaiveDate) -> Self {
        let week_start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
        Self {
            employee_id,
            week_key: key.to_string(),
            week_start,
            week_end: week_start + Duration::days(6),
            total_worked_seconds: 0,
            total_overtime_seconds: 0,
            total_night_shift_seconds: 0,
            days_worked: BTreeSet::new(),
        }
    }
}

/// Worked, overtime and night-shift seconds per employee and ISO week, using
/// the default 44h target and 22:00-05:00 night window.
#[allow(dead_code)]
pub fn calculate_worked_hours(events: &[PunchEvent]) -> Vec<WeekSummary> {
    calculate_worked_hours_with(events, &ShiftPolicy::default())
}

/// Pairs opening punches (arrival, lunch end) with closing ones (lunch start,
/// departure) and credits each positive interval to the week of the closing
/// punch. Events must be ascending by timestamp.
///
/// Punches that arrive in the wrong state are skipped without forcing a pair,
/// and every punch touches its own week so a week holding only a dangling
/// arrival still shows up with zero seconds. Pairing state is per employee.
pub fn calculate_worked_hours_with(events: &[PunchEvent], policy: &ShiftPolicy) -> Vec<WeekSummary> {
    let mut buckets: BTreeMap<(u64, WeekKey), WeekSummary> = BTreeMap::new();
    let mut open: HashMap<u64, DateTime<Utc>> = HashMap::new();

    for event in events {
        let date = event.date();
        let key = WeekKey::of(date);
        let summary = buckets
            .entry((event.employee_id, key))
            .or_insert_with(|| WeekSummary::empty(event.employee_id, key, date));

        match open.get(&event.employee_id).copied() {
            None if event.kind.opens_interval() => {
                open.insert(event.employee_id, event.timestamp);
            }
            Some(start) if event.kind.closes_interval() => {
                open.remove(&event.employee_id);

                let worked = (event.timestamp - start).num_seconds();
                if worked > 0 {
                    summary.total_worked_seconds += worked;
                    summary.total_night_shift_seconds +=
                        night_overlap(start, event.timestamp, policy).num_seconds();
                    summary.days_worked.insert(date);
                }
            }
            _ => {}
        }
    }

    let target = policy.weekly_target.num_seconds();
    buckets
        .into_values()
        .map(|mut summary| {
            summary.total_overtime_seconds = (summary.total_worked_seconds - target).max(0);
            summary
        })
        .collect()
}

/// Exact overlap between `[start, end)` and the policy's night window on every
/// calendar day the interval touches. A window with `night_start > night_end`
/// wraps past midnight; equal bounds mean no night window at all.
pub fn night_overlap(start: DateTime<Utc>, end: DateTime<Utc>, policy: &ShiftPolicy) -> Duration {
    if end <= start || policy.night_start == policy.night_end {
        return Duration::zero();
    }
    let wraps = policy.night_start > policy.night_end;

    let mut total = Duration::zero();
    // a wrapping window opened the evening before can still cover `start`
    let mut day = start.date_naive() - Duration::days(1);
    let last = end.date_naive();

    while day <= last {
        let window_start = day.and_time(policy.night_start).and_utc();
        let end_day = if wraps { day + Duration::days(1) } else { day };
        let window_end = end_day.and_time(policy.night_end).and_utc();

        let from = start.max(window_start);
        let to = end.min(window_end);
        if to > from {
            total = total + (to - from);
        }
        day = day + Duration::days(1);
    }

    total
}

#[cfg(test)]
mod tests {
    use super::super::PunchKind::*;
    use super::super::fixtures::*;
    use super::*;

    const HOUR: i64 = 3600;

    #[test]
    fn single_day_shift_is_nine_hours_without_overtime() {
        let events = vec![
            punch(1, at(2024, 3, 4, 8, 0), Arrival),
            punch(1, at(2024, 3, 4, 17, 0), Departure),
        ];

        let summaries = calculate_worked_hours(&events);

        assert_eq!(summaries.len(), 1);
        let week = &summaries[0];
        assert_eq!(week.total_worked_seconds, 9 * HOUR);
        assert_eq!(week.total_overtime_seconds, 0);
        assert_eq!(week.total_night_shift_seconds, 0);
        assert_eq!(week.week_key, "2024-10");
        assert_eq!(week.week_start, date(2024, 3, 4));
        assert_eq!(week.week_end, date(2024, 3, 10));
        assert!(week.days_worked.contains(&date(2024, 3, 4)));
    }

    #[test]
    fn lunch_break_is_not_worked() {
        let events = vec![
            punch(1, at(2024, 3, 4, 8, 0), Arrival),
            punch(1, at(2024, 3, 4, 12, 0), LunchStart),
            punch(1, at(2024, 3, 4, 13, 0), LunchEnd),
            punch(1, at(2024, 3, 4, 17, 0), Departure),
        ];

        let summaries = calculate_worked_hours(&events);
        assert_eq!(summaries[0].total_worked_seconds, 8 * HOUR);
    }

    #[test]
    fn dangling_arrival_contributes_nothing() {
        let events = vec![punch(1, at(2024, 3, 4, 8, 0), Arrival)];

        let summaries = calculate_worked_hours(&events);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_worked_seconds, 0);
        assert!(summaries[0].days_worked.is_empty());
    }

    #[test]
    fn out_of_order_punches_are_skipped() {
        let events = vec![
            punch(1, at(2024, 3, 4, 7, 0), Departure),
            punch(1, at(2024, 3, 4, 8, 0), Arrival),
            punch(1, at(2024, 3, 4, 9, 0), Arrival),
            punch(1, at(2024, 3, 4, 10, 0), Departure),
            punch(1, at(2024, 3, 4, 11, 0), Departure),
        ];

        let summaries = calculate_worked_hours(&events);
        // second arrival is ignored, the pair is 08:00-10:00
        assert_eq!(summaries[0].total_worked_seconds, 2 * HOUR);
    }

    #[test]
    fn zero_length_pair_is_dropped() {
        let events = vec![
            punch(1, at(2024, 3, 4, 8, 0), Arrival),
            punch(1, at(2024, 3, 4, 8, 0), Departure),
        ];

        let summaries = calculate_worked_hours(&events);
        assert_eq!(summaries[0].total_worked_seconds, 0);
        assert!(summaries[0].days_worked.is_empty());
    }

    #[test]
    fn overnight_shift_counts_as_night_and_lands_on_departure_day() {
        // Sunday 2024-03-10 23:30 -> Monday 2024-03-11 00:30
        let events = vec![
            punch(1, at(2024, 3, 10, 23, 30), Arrival),
            punch(1, at(2024, 3, 11, 0, 30), Departure),
        ];

        let summaries = calculate_worked_hours(&events);

        assert_eq!(summaries.len(), 2);
        let (sunday_week, monday_week) = (&summaries[0], &summaries[1]);
        assert_eq!(sunday_week.week_key, "2024-10");
        assert_eq!(sunday_week.total_worked_seconds, 0);
        assert_eq!(monday_week.week_key, "2024-11");
        assert_eq!(monday_week.total_worked_seconds, HOUR);
        assert_eq!(monday_week.total_night_shift_seconds, HOUR);
        assert_eq!(
            monday_week.days_worked.iter().copied().collect::<Vec<_>>(),
            vec![date(2024, 3, 11)]
        );
    }

    #[test]
    fn partial_night_overlap() {
        let events = vec![
            punch(1, at(2024, 3, 5, 18, 0), Arrival),
            punch(1, at(2024, 3, 5, 23, 15), Departure),
            punch(1, at(2024, 3, 6, 4, 0), Arrival),
            punch(1, at(2024, 3, 6, 9, 0), Departure),
        ];

        let summaries = calculate_worked_hours(&events);
        assert_eq!(summaries[0].total_night_shift_seconds, 75 * 60 + HOUR);
    }

    #[test]
    fn overtime_above_weekly_target() {
        let mut events = Vec::new();
        // five 10-hour days, Mon-Fri
        for day in 4..=8 {
            events.push(punch(1, at(2024, 3, day, 7, 0), Arrival));
            events.push(punch(1, at(2024, 3, day, 17, 0), Departure));
        }

        let summaries = calculate_worked_hours(&events);

        assert_eq!(summaries[0].total_worked_seconds, 50 * HOUR);
        assert_eq!(summaries[0].total_overtime_seconds, 6 * HOUR);
        assert_eq!(summaries[0].days_worked.len(), 5);
    }

    #[test]
    fn custom_policy_changes_target_and_window() {
        let policy = ShiftPolicy {
            weekly_target: Duration::hours(8),
            night_start: time(12, 0),
            night_end: time(14, 0),
        };
        let events = vec![
            punch(1, at(2024, 3, 4, 8, 0), Arrival),
            punch(1, at(2024, 3, 4, 17, 0), Departure),
        ];

        let summaries = calculate_worked_hours_with(&events, &policy);

        assert_eq!(summaries[0].total_overtime_seconds, HOUR);
        assert_eq!(summaries[0].total_night_shift_seconds, 2 * HOUR);
    }

    #[test]
    fn employees_are_paired_independently_and_sorted() {
        let events = vec![
            punch(2, at(2024, 3, 4, 8, 0), Arrival),
            punch(1, at(2024, 3, 4, 9, 0), Arrival),
            punch(2, at(2024, 3, 4, 12, 0), Departure),
            punch(1, at(2024, 3, 4, 15, 0), Departure),
        ];

        let summaries = calculate_worked_hours(&events);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].employee_id, 1);
        assert_eq!(summaries[0].total_worked_seconds, 6 * HOUR);
        assert_eq!(summaries[1].employee_id, 2);
        assert_eq!(summaries[1].total_worked_seconds, 4 * HOUR);
    }

    #[test]
    fn iso_year_is_used_at_year_boundary() {
        // Monday 2024-12-30 belongs to ISO week 2025-01
        let events = vec![
            punch(1, at(2024, 12, 30, 8, 0), Arrival),
            punch(1, at(2024, 12, 30, 16, 0), Departure),
        ];

        let summaries = calculate_worked_hours(&events);
        assert_eq!(summaries[0].week_key, "2025-01");
        assert_eq!(summaries[0].week_start, date(2024, 12, 30));
    }

    #[test]
    fn rerunning_yields_identical_summaries() {
        let events = vec![
            punch(1, at(2024, 3, 4, 22, 0), Arrival),
            punch(1, at(2024, 3, 5, 6, 0), Departure),
        ];

        assert_eq!(calculate_worked_hours(&events), calculate_worked_hours(&events));
    }

    #[test]
    fn night_overlap_without_wrap() {
        let policy = ShiftPolicy {
            weekly_target: Duration::hours(44),
            night_start: time(1, 0),
            night_end: time(4, 0),
        };
        let overlap = night_overlap(at(2024, 3, 4, 0, 0), at(2024, 3, 5, 2, 0), &policy);
        assert_eq!(overlap, Duration::hours(4));
    }
}
