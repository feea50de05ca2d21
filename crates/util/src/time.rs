//! Time qualifier parsing.
//!
//! The time segment of a namepath is either a raw unix-seconds integer or
//! a truncated calendar stamp. Calendar stamps are read as digit runs in
//! year, month, day, hour, minute, second order with any non-digit
//! characters as separators, and omitted trailing components snap to the
//! end of the named period: `2029` is the last second of 2029, `2029-06`
//! the last second of June 2029.

use caldb_types::CaldbError;
use chrono::NaiveDate;

/// Digit count at which a single run is read as raw unix seconds rather
/// than a year. Bare years stay below this, real timestamps well above.
const UNIX_SECONDS_MIN_DIGITS: usize = 6;

/// Parses a time qualifier into unix seconds (UTC).
pub fn parse_time_token(raw: &str) -> Result<i64, CaldbError> {
    let token = raw.trim();
    let runs: Vec<&str> = token
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .collect();

    if runs.is_empty() {
        return Err(CaldbError::parse(format!(
            "time segment '{raw}' contains no digits"
        )));
    }
    if runs.len() == 1 && runs[0].len() >= UNIX_SECONDS_MIN_DIGITS {
        return runs[0]
            .parse()
            .map_err(|_| CaldbError::parse(format!("time segment '{raw}' is out of range")));
    }
    if runs.len() > 6 {
        return Err(CaldbError::parse(format!(
            "time segment '{raw}' has more than six components"
        )));
    }

    let bad = |what: &str| CaldbError::parse(format!("time segment '{raw}' has an invalid {what}"));

    let year: i32 = runs[0].parse().map_err(|_| bad("year"))?;
    let month: u32 = match runs.get(1) {
        Some(r) => r.parse().map_err(|_| bad("month"))?,
        None => 12,
    };
    if !(1..=12).contains(&month) {
        return Err(bad("month"));
    }
    let day: u32 = match runs.get(2) {
        Some(r) => r.parse().map_err(|_| bad("day"))?,
        None => last_day_of_month(year, month).ok_or_else(|| bad("year"))?,
    };
    let hour: u32 = match runs.get(3) {
        Some(r) => r.parse().map_err(|_| bad("hour"))?,
        None => 23,
    };
    let minute: u32 = match runs.get(4) {
        Some(r) => r.parse().map_err(|_| bad("minute"))?,
        None => 59,
    };
    let second: u32 = match runs.get(5) {
        Some(r) => r.parse().map_err(|_| bad("second"))?,
        None => 59,
    };

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| bad("date"))?;
    let datetime = date
        .and_hms_opt(hour, minute, second)
        .ok_or_else(|| bad("time of day"))?;
    Ok(datetime.and_utc().timestamp())
}

/// Last day of the month, or `None` when the year is out of chrono range.
fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next_month.pred_opt()?.signed_duration_since(first).num_days() as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().timestamp()
    }

    #[test]
    fn raw_unix_seconds_pass_through() {
        assert_eq!(parse_time_token("1700000000").unwrap(), 1_700_000_000);
    }

    #[test]
    fn bare_year_snaps_to_end_of_year() {
        assert_eq!(parse_time_token("2029").unwrap(), utc(2029, 12, 31, 23, 59, 59));
    }

    #[test]
    fn truncated_stamps_snap_to_period_end() {
        assert_eq!(parse_time_token("2029-06").unwrap(), utc(2029, 6, 30, 23, 59, 59));
        assert_eq!(parse_time_token("2029-06-15").unwrap(), utc(2029, 6, 15, 23, 59, 59));
        assert_eq!(
            parse_time_token("2029-06-15 12").unwrap(),
            utc(2029, 6, 15, 12, 59, 59)
        );
        assert_eq!(
            parse_time_token("2029.06.15-12.30.05").unwrap(),
            utc(2029, 6, 15, 12, 30, 5)
        );
    }

    #[test]
    fn february_snaps_to_its_real_end() {
        assert_eq!(parse_time_token("2028-02").unwrap(), utc(2028, 2, 29, 23, 59, 59));
        assert_eq!(parse_time_token("2029-02").unwrap(), utc(2029, 2, 28, 23, 59, 59));
    }

    #[test]
    fn rejects_garbage_tokens() {
        assert!(parse_time_token("soon").is_err());
        assert!(parse_time_token("2029-13").is_err());
        assert!(parse_time_token("2029-02-30").is_err());
        assert!(parse_time_token("2029-06-15 25").is_err());
        assert!(parse_time_token("1-2-3-4-5-6-7").is_err());
    }
}
