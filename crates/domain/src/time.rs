//! Time and timestamp helpers.
//!
//! Every instant the controller reasons about lives in the host's local zone:
//! clock-time markers are written in local wall-clock time and solar lookups
//! are converted on arrival.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};

/// Local timestamp used for rule windows, solar events and evaluation ticks.
pub type Timestamp = DateTime<Local>;

/// Return the current local time.
#[must_use]
pub fn now() -> Timestamp {
    Local::now()
}

/// Place a wall-clock time on a calendar date in the local zone.
///
/// Returns `None` when the time does not exist on that date (skipped by a
/// daylight-saving jump). Ambiguous times resolve to the earliest instant.
#[must_use]
pub fn at_local(date: NaiveDate, time: NaiveTime) -> Option<Timestamp> {
    Local.from_local_datetime(&date.and_time(time)).earliest()
}

/// Signed number of seconds from `since` to `until`, with millisecond precision.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn seconds_between(until: Timestamp, since: Timestamp) -> f64 {
    (until - since).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_local_time() {
        let before = Local::now();
        let ts = now();
        let after = Local::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_place_clock_time_on_given_date() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let time = NaiveTime::from_hms_opt(7, 30, 0).unwrap();
        let ts = at_local(date, time).unwrap();
        assert_eq!(ts.date_naive(), date);
        assert_eq!(ts.time(), time);
    }

    #[test]
    fn should_measure_signed_seconds() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let a = at_local(date, NaiveTime::from_hms_opt(1, 0, 0).unwrap()).unwrap();
        let b = at_local(date, NaiveTime::from_hms_opt(1, 30, 0).unwrap()).unwrap();
        assert!((seconds_between(b, a) - 1800.0).abs() < f64::EPSILON);
        assert!((seconds_between(a, b) + 1800.0).abs() < f64::EPSILON);
    }
}
