//! Calendar and ISO week utilities
//!
//! All dates are plain calendar dates (`NaiveDate`) interpreted in UTC. Weeks
//! follow ISO 8601: they start on Monday, and days are numbered 1 (Monday)
//! through 7 (Sunday).
//!
//! A weekly plan is anchored to the Monday returned by [`monday_of`]; the
//! dashboard calendar covers the whole ISO weeks returned by [`calendar_range`].

use chrono::{Datelike, Days, Duration, NaiveDate};
use serde::Serialize;

use crate::{Error, Result};

/// Day names indexed by ISO day of week minus one
const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const SHORT_DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Maximum number of week rows a month can span
pub const MAX_GRID_ROWS: usize = 6;

/// Parse a strict `YYYY-MM-DD` date string
///
/// Rejects anything that is not exactly four digits, dash, two digits, dash,
/// two digits, and anything that is not a real calendar date.
///
/// # Examples
///
/// ```
/// use mealplan_common::calendar::parse_iso_date;
///
/// assert!(parse_iso_date("2025-01-06").is_ok());
/// assert!(parse_iso_date("2025-1-6").is_err());
/// assert!(parse_iso_date("2025-02-30").is_err());
/// ```
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !shape_ok {
        return Err(Error::InvalidInput(format!(
            "Invalid date format: {} (expected YYYY-MM-DD)",
            value
        )));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("Invalid calendar date: {}", value)))
}

/// Format a date as `YYYY-MM-DD`
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Monday of the ISO week containing `date`
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// ISO day of week, 1 (Monday) through 7 (Sunday)
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// Whether `day` is a valid ISO day of week
pub fn is_valid_day_of_week(day: i64) -> bool {
    (1..=7).contains(&day)
}

/// The seven dates of the week starting at `monday`
pub fn week_dates(monday: NaiveDate) -> [NaiveDate; 7] {
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

/// Date of `day_of_week` in the week starting at `monday`
///
/// Returns `None` when `day_of_week` is outside 1..=7.
pub fn date_for(monday: NaiveDate, day_of_week: u8) -> Option<NaiveDate> {
    if !(1..=7).contains(&day_of_week) {
        return None;
    }
    Some(monday + Duration::days(day_of_week as i64 - 1))
}

/// Full day name ("Monday"), empty for out-of-range input
pub fn day_name(day_of_week: u8) -> &'static str {
    match day_of_week {
        1..=7 => DAY_NAMES[day_of_week as usize - 1],
        _ => "",
    }
}

/// Short day name ("Mon"), empty for out-of-range input
pub fn short_day_name(day_of_week: u8) -> &'static str {
    match day_of_week {
        1..=7 => SHORT_DAY_NAMES[day_of_week as usize - 1],
        _ => "",
    }
}

/// Full month name ("January"), empty for out-of-range input
pub fn month_name(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_NAMES[month as usize - 1],
        _ => "",
    }
}

/// Week range label
///
/// "Jan 1 - 7" when the week stays within one month, otherwise
/// "Jan 29 - Feb 4".
pub fn format_week_range(monday: NaiveDate) -> String {
    let end = monday + Duration::days(6);
    if monday.month() == end.month() {
        format!("{} - {}", monday.format("%b %-d"), end.day())
    } else {
        format!("{} - {}", monday.format("%b %-d"), end.format("%b %-d"))
    }
}

/// Day header label for a day within a week, e.g. "Wed, Nov 26"
pub fn format_day_header(monday: NaiveDate, day_of_week: u8) -> String {
    match date_for(monday, day_of_week) {
        Some(date) => format_short_date(date),
        None => String::new(),
    }
}

/// Short date label, e.g. "Mon, Jan 6"
pub fn format_short_date(date: NaiveDate) -> String {
    format!("{}, {}", short_day_name(day_of_week(date)), date.format("%b %-d"))
}

/// Long date label, e.g. "Wednesday, November 26, 2025"
pub fn format_date_long(date: NaiveDate) -> String {
    format!("{}, {}", day_name(day_of_week(date)), date.format("%B %-d, %Y"))
}

/// First and last day of a month
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        Error::InvalidInput(format!("Invalid year or month: {}-{}", year, month))
    })?;

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(|| {
        Error::InvalidInput(format!("Invalid year or month: {}-{}", year, month))
    })?;

    Ok((first, next_first - Duration::days(1)))
}

/// Date range shown by a month calendar
///
/// From the Monday of the week containing the first of the month to the Sunday
/// of the week containing its last day.
///
/// Months whose surrounding weeks fall outside the representable date range
/// are rejected as invalid input.
pub fn calendar_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let (first, last) = month_bounds(year, month)?;
    let start = first.checked_sub_days(Days::new(first.weekday().num_days_from_monday() as u64));
    let end = last.checked_add_days(Days::new(6 - last.weekday().num_days_from_monday() as u64));

    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(Error::InvalidInput(format!(
            "Calendar for {}-{} is out of range",
            year, month
        ))),
    }
}

/// One cell of a month calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub date_string: String,
    pub is_current_month: bool,
    pub day_number: u32,
    pub is_today: bool,
}

/// Month calendar laid out as ISO weeks (Monday first)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarGrid {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<[CalendarDay; 7]>,
}

impl CalendarGrid {
    /// All cells in display order
    pub fn days(&self) -> impl Iterator<Item = &CalendarDay> {
        self.weeks.iter().flat_map(|week| week.iter())
    }

    /// First and last date shown
    pub fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.weeks.first()?[0].date;
        let last = self.weeks.last()?[6].date;
        Some((first, last))
    }
}

/// Build the calendar grid for a month
///
/// Produces between 4 and [`MAX_GRID_ROWS`] rows of seven days; leading and
/// trailing cells belong to the adjacent months and are flagged
/// `is_current_month = false`.
pub fn calendar_grid(year: i32, month: u32, today: NaiveDate) -> Result<CalendarGrid> {
    let (start, end) = calendar_range(year, month)?;

    let mut weeks = Vec::with_capacity(MAX_GRID_ROWS);
    let mut monday = start;
    while monday <= end {
        let week = week_dates(monday).map(|date| CalendarDay {
            date,
            date_string: format_iso_date(date),
            is_current_month: date.year() == year && date.month() == month,
            day_number: date.day(),
            is_today: date == today,
        });
        weeks.push(week);
        match monday.checked_add_days(Days::new(7)) {
            Some(next) => monday = next,
            None => break,
        }
    }

    Ok(CalendarGrid { year, month, weeks })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_date_strict() {
        assert_eq!(parse_iso_date("2025-11-26").unwrap(), date(2025, 11, 26));
        assert!(parse_iso_date("2025-11-26T00:00:00Z").is_err());
        assert!(parse_iso_date("25-11-26").is_err());
        assert!(parse_iso_date("2025/11/26").is_err());
        assert!(parse_iso_date("2025-13-01").is_err());
        assert!(parse_iso_date("").is_err());
    }

    #[test]
    fn test_parse_leap_day() {
        assert!(parse_iso_date("2024-02-29").is_ok());
        assert!(parse_iso_date("2025-02-29").is_err());
    }

    #[test]
    fn test_monday_of() {
        // 2025-11-26 is a Wednesday
        assert_eq!(monday_of(date(2025, 11, 26)), date(2025, 11, 24));
        // Monday maps to itself
        assert_eq!(monday_of(date(2025, 11, 24)), date(2025, 11, 24));
        // Sunday belongs to the preceding Monday
        assert_eq!(monday_of(date(2025, 11, 30)), date(2025, 11, 24));
        // Across a year boundary
        assert_eq!(monday_of(date(2026, 1, 1)), date(2025, 12, 29));
    }

    #[test]
    fn test_day_of_week() {
        assert_eq!(day_of_week(date(2025, 11, 24)), 1);
        assert_eq!(day_of_week(date(2025, 11, 26)), 3);
        assert_eq!(day_of_week(date(2025, 11, 30)), 7);
    }

    #[test]
    fn test_week_dates_and_date_for() {
        let monday = date(2025, 12, 29);
        let dates = week_dates(monday);
        assert_eq!(dates[0], monday);
        assert_eq!(dates[6], date(2026, 1, 4));
        assert_eq!(date_for(monday, 4), Some(date(2026, 1, 1)));
        assert_eq!(date_for(monday, 0), None);
        assert_eq!(date_for(monday, 8), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(day_name(1), "Monday");
        assert_eq!(day_name(7), "Sunday");
        assert_eq!(day_name(0), "");
        assert_eq!(short_day_name(3), "Wed");
        assert_eq!(short_day_name(9), "");
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(13), "");
    }

    #[test]
    fn test_format_week_range() {
        assert_eq!(format_week_range(date(2025, 11, 3)), "Nov 3 - 9");
        assert_eq!(format_week_range(date(2025, 11, 24)), "Nov 24 - 30");
        assert_eq!(format_week_range(date(2025, 12, 29)), "Dec 29 - Jan 4");
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(format_day_header(date(2025, 11, 24), 3), "Wed, Nov 26");
        assert_eq!(format_day_header(date(2025, 11, 24), 8), "");
        assert_eq!(format_short_date(date(2025, 1, 6)), "Mon, Jan 6");
        assert_eq!(
            format_date_long(date(2025, 11, 26)),
            "Wednesday, November 26, 2025"
        );
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds(2024, 2).unwrap(),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
        assert_eq!(
            month_bounds(2025, 12).unwrap(),
            (date(2025, 12, 1), date(2025, 12, 31))
        );
        assert!(month_bounds(2025, 0).is_err());
        assert!(month_bounds(2025, 13).is_err());
    }

    #[test]
    fn test_calendar_range() {
        // November 2025: Sat 1st .. Sun 30th
        let (start, end) = calendar_range(2025, 11).unwrap();
        assert_eq!(start, date(2025, 10, 27));
        assert_eq!(end, date(2025, 11, 30));
    }

    #[test]
    fn test_grid_shape_six_rows() {
        // March 2025 starts on a Saturday and ends on a Monday: 6 rows
        let grid = calendar_grid(2025, 3, date(2025, 3, 15)).unwrap();
        assert_eq!(grid.weeks.len(), MAX_GRID_ROWS);
        for week in &grid.weeks {
            assert_eq!(day_of_week(week[0].date), 1);
            assert_eq!(day_of_week(week[6].date), 7);
        }
        assert_eq!(grid.range(), Some((date(2025, 2, 24), date(2025, 4, 6))));
    }

    #[test]
    fn test_grid_matches_calendar_range() {
        let grid = calendar_grid(2025, 11, date(2025, 11, 26)).unwrap();
        assert_eq!(grid.weeks.len(), 5);
        assert_eq!(grid.range(), Some(calendar_range(2025, 11).unwrap()));
    }

    #[test]
    fn test_grid_shape_four_rows() {
        // February 2021 starts on Monday and has 28 days: exactly 4 rows
        let grid = calendar_grid(2021, 2, date(2021, 2, 1)).unwrap();
        assert_eq!(grid.weeks.len(), 4);
        assert!(grid.days().all(|d| d.is_current_month));
    }

    #[test]
    fn test_grid_contains_each_month_day_once() {
        let grid = calendar_grid(2024, 2, date(2000, 1, 1)).unwrap();
        let in_month: Vec<u32> = grid
            .days()
            .filter(|d| d.is_current_month)
            .map(|d| d.day_number)
            .collect();
        assert_eq!(in_month, (1..=29).collect::<Vec<_>>());
        assert!(grid.days().all(|d| !d.is_today));
    }

    #[test]
    fn test_grid_marks_today() {
        let grid = calendar_grid(2025, 11, date(2025, 11, 26)).unwrap();
        let today: Vec<&CalendarDay> = grid.days().filter(|d| d.is_today).collect();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].date_string, "2025-11-26");
    }

    #[test]
    fn test_grid_rejects_invalid_month() {
        assert!(calendar_grid(2025, 0, date(2025, 1, 1)).is_err());
    }

    #[test]
    fn test_grid_rejects_years_at_date_limits() {
        let today = date(2025, 1, 1);
        // First representable day is a Friday; its Monday does not exist
        assert!(matches!(
            calendar_grid(NaiveDate::MIN.year(), 1, today),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            calendar_range(NaiveDate::MAX.year(), 12),
            Err(Error::InvalidInput(_))
        ));
        assert!(calendar_grid(-9999, 1, today).is_ok());
    }
}
