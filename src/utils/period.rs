use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::{AppError, AppResult};

/// Inclusive date range used by listings and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// Half-open UTC bounds `[start 00:00, end + 1 day 00:00)` for timestamp filters.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = self.start.and_time(NaiveTime::MIN).and_utc();
        let until = (self.end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc();
        (from, until)
    }
}

pub fn parse_date(field: &str, raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid {field}. Use YYYY-MM-DD")))
}

pub fn parse_optional_date(field: &str, raw: Option<&str>) -> AppResult<Option<NaiveDate>> {
    raw.filter(|r| !r.trim().is_empty())
        .map(|r| parse_date(field, r))
        .transpose()
}

/// Time of day as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(field: &str, raw: &str) -> AppResult<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| AppError::validation(format!("Invalid {field}. Use HH:MM")))
}

pub fn parse_optional_time(field: &str, raw: Option<&str>) -> AppResult<Option<NaiveTime>> {
    raw.filter(|r| !r.trim().is_empty())
        .map(|r| parse_time_of_day(field, r))
        .transpose()
}

/// Missing start defaults to the first day of `today`'s month, missing end to
/// the last day of the start's month.
pub fn resolve_period(
    start_date: Option<&str>,
    end_date: Option<&str>,
    today: NaiveDate,
) -> AppResult<Period> {
    let start = parse_optional_date("start_date", start_date)?
        .unwrap_or_else(|| first_of_month(today));
    let end = match parse_optional_date("end_date", end_date)? {
        Some(end) => end,
        None => last_of_month(start),
    };

    if start > end {
        return Err(AppError::validation("start_date cannot be after end_date"));
    }

    Ok(Period { start, end })
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

fn last_of_month(date: NaiveDate) -> NaiveDate {
    // the 1st plus 31 days always lands in the next month
    let next_month = first_of_month(date) + Duration::days(31);
    first_of_month(next_month) - Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_to_current_month() {
        let period = resolve_period(None, None, date(2024, 2, 14)).unwrap();
        assert_eq!(period, Period { start: date(2024, 2, 1), end: date(2024, 2, 29) });
    }

    #[test]
    fn end_defaults_to_end_of_start_month() {
        let period = resolve_period(Some("2023-12-10"), None, date(2024, 5, 1)).unwrap();
        assert_eq!(period.end, date(2023, 12, 31));
    }

    #[test]
    fn explicit_range_is_kept() {
        let period = resolve_period(Some("2024-03-04"), Some("2024-03-10"), date(2024, 5, 1)).unwrap();
        assert_eq!(period, Period { start: date(2024, 3, 4), end: date(2024, 3, 10) });
    }

    #[test]
    fn malformed_or_inverted_dates_are_validation_errors() {
        let today = date(2024, 5, 1);
        assert!(matches!(
            resolve_period(Some("04/03/2024"), None, today),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            resolve_period(Some("2024-03-10"), Some("2024-03-04"), today),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn times_of_day_with_or_without_seconds() {
        assert_eq!(
            parse_time_of_day("expected_arrival_time", "08:00").unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(
            parse_optional_time("expected_departure_time", Some("17:30:00")).unwrap(),
            NaiveTime::from_hms_opt(17, 30, 0)
        );
        assert_eq!(parse_optional_time("expected_departure_time", Some(" ")).unwrap(), None);
        assert!(parse_time_of_day("expected_arrival_time", "8h").is_err());
    }

    #[test]
    fn bounds_cover_the_whole_last_day() {
        let period = Period { start: date(2024, 3, 4), end: date(2024, 3, 4) };
        let (from, until) = period.bounds();
        assert_eq!(until - from, Duration::days(1));
    }
}
