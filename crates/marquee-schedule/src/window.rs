//! Time window evaluation: is a window open now, and when does that change.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::ScheduleError;
use crate::recurrence::RecurrenceRule;

/// How far ahead the recurrence search looks for the next matching day.
/// The daily midnight re-check keeps eligibility correct even when a match
/// lies beyond this horizon.
const RECURRENCE_SEARCH_HORIZON_DAYS: u64 = 800;

/// A time-of-day plus date-range constraint on when an item (or the whole
/// schedule) is eligible.
///
/// `time_defined: false` means the window is permanently open and every
/// other field is ignored. Date and time fields arrive as strings from the
/// content service and are parsed lazily; a time-defined window with a
/// missing or unparsable field is logged and treated as never open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Window {
    pub time_defined: bool,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub recurrence_type: Option<String>,
    pub recurrence_frequency: u32,
    pub recurrence_absolute: bool,
    pub recurrence_days_of_week: Vec<String>,
    pub recurrence_day_of_week: u8,
    pub recurrence_day_of_month: u8,
    pub recurrence_week_of_month: u8,
    pub recurrence_month_of_year: u8,
}

impl Window {
    /// True when the window never constrains playback.
    pub fn is_unconstrained(&self) -> bool {
        !self.time_defined
    }

    /// Whether the window admits `now`.
    pub fn is_open(&self, now: NaiveDateTime) -> bool {
        match self.resolve() {
            Ok(None) => true,
            Ok(Some(resolved)) => resolved.admits(now),
            Err(err) => {
                error!(%err, "window treated as never open");
                false
            }
        }
    }

    /// Smallest delay until `is_open` would flip, or `None` when it never
    /// will (unconstrained windows, and unparsable windows that fail
    /// closed).
    pub fn next_boundary(&self, now: NaiveDateTime) -> Option<Duration> {
        self.resolve().ok().flatten()?.next_boundary(now)
    }

    fn resolve(&self) -> Result<Option<Resolved>, ScheduleError> {
        if !self.time_defined {
            return Ok(None);
        }
        let start = parse_field("startTime", &self.start_time)?.time();
        let end = parse_field("endTime", &self.end_time)?.time();
        let start_date = parse_field("startDate", &self.start_date)?.date();
        Ok(Some(Resolved {
            start_date,
            start,
            end,
            rule: RecurrenceRule::from_window(self),
        }))
    }
}

/// Parsed form of a time-defined window.
struct Resolved {
    start_date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    rule: Option<RecurrenceRule>,
}

impl Resolved {
    fn day_matches(&self, date: NaiveDate) -> bool {
        self.rule
            .as_ref()
            .is_none_or(|rule| rule.matches(self.start_date, date))
    }

    fn admits(&self, now: NaiveDateTime) -> bool {
        if now.date() < self.start_date {
            return false;
        }
        if !self.day_matches(now.date()) {
            return false;
        }
        tod_in_span(now.time(), self.start, self.end)
    }

    fn next_boundary(&self, now: NaiveDateTime) -> Option<Duration> {
        if self.start == self.end {
            // Empty time-of-day span: never opens, never flips.
            return None;
        }

        if self.admits(now) {
            // Currently open: the next flip is the close of this span. A
            // wrapped span closes on the following day unless we are
            // already in its after-midnight leg.
            let close_date = if self.start < self.end || now.time() < self.end {
                now.date()
            } else {
                now.date() + Days::new(1)
            };
            return positive(close_date.and_time(self.end) - now);
        }

        // Closed: the next flip is the first admissible opening.
        let first_day = now.date().max(self.start_date);
        for offset in 0..RECURRENCE_SEARCH_HORIZON_DAYS {
            let date = first_day + Days::new(offset);
            if !self.day_matches(date) {
                continue;
            }
            let opens_at = date.and_time(self.start);
            if opens_at > now {
                return positive(opens_at - now);
            }
        }
        None
    }
}

fn tod_in_span(tod: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start < end {
        tod >= start && tod < end
    } else if start > end {
        // Spans midnight.
        tod >= start || tod < end
    } else {
        false
    }
}

fn positive(delta: Duration) -> Option<Duration> {
    (delta > Duration::zero()).then_some(delta)
}

fn parse_field(
    field: &'static str,
    value: &Option<String>,
) -> Result<NaiveDateTime, ScheduleError> {
    let Some(raw) = value else {
        return Err(ScheduleError::UnparsableTime {
            field,
            value: "<absent>".to_string(),
        });
    };
    parse_datetime(raw).ok_or_else(|| ScheduleError::UnparsableTime {
        field,
        value: raw.clone(),
    })
}

/// Datetime formats the content service has been observed to emit.
const FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%b %d, %Y %I:%M:%S %p",
    "%m-%d-%Y %I:%M:%S %p",
];

pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(instant) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(instant.naive_local());
    }
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn window(start_date: &str, start_time: &str, end_time: &str) -> Window {
        Window {
            time_defined: true,
            start_date: Some(start_date.to_string()),
            start_time: Some(start_time.to_string()),
            end_time: Some(end_time.to_string()),
            ..Window::default()
        }
    }

    fn nine_to_five() -> Window {
        window(
            "2018-12-01 00:00:00",
            "2018-12-01 09:00:00",
            "2018-12-01 17:00:00",
        )
    }

    #[test]
    fn unconstrained_window_is_always_open() {
        let w = Window::default();
        assert!(w.is_open(at("2018-12-23 03:00:00")));
        assert_eq!(w.next_boundary(at("2018-12-23 03:00:00")), None);
    }

    #[test]
    fn open_within_time_of_day_span() {
        let w = nine_to_five();
        assert!(!w.is_open(at("2018-12-23 08:59:59")));
        assert!(w.is_open(at("2018-12-23 09:00:00")));
        assert!(w.is_open(at("2018-12-23 16:59:59")));
        // End is exclusive.
        assert!(!w.is_open(at("2018-12-23 17:00:00")));
    }

    #[test]
    fn closed_before_start_date() {
        let w = nine_to_five();
        assert!(!w.is_open(at("2018-11-30 10:00:00")));
    }

    #[test]
    fn wrapped_span_crosses_midnight() {
        let w = window(
            "2018-12-01 00:00:00",
            "2018-12-01 22:00:00",
            "2018-12-01 02:00:00",
        );
        assert!(w.is_open(at("2018-12-23 23:00:00")));
        assert!(w.is_open(at("2018-12-24 01:00:00")));
        assert!(!w.is_open(at("2018-12-23 12:00:00")));
    }

    #[test]
    fn equal_start_and_end_never_opens() {
        let w = window(
            "2018-12-01 00:00:00",
            "2018-12-01 09:00:00",
            "2018-12-01 09:00:00",
        );
        assert!(!w.is_open(at("2018-12-23 09:00:00")));
        assert_eq!(w.next_boundary(at("2018-12-23 08:00:00")), None);
    }

    #[test]
    fn unparsable_time_fails_closed() {
        let mut w = nine_to_five();
        w.start_time = Some("not a time".to_string());
        assert!(!w.is_open(at("2018-12-23 10:00:00")));
        assert_eq!(w.next_boundary(at("2018-12-23 10:00:00")), None);
    }

    #[test]
    fn absent_end_time_fails_closed() {
        let mut w = nine_to_five();
        w.end_time = None;
        assert!(!w.is_open(at("2018-12-23 10:00:00")));
        assert_eq!(w.next_boundary(at("2018-12-23 10:00:00")), None);
    }

    #[test]
    fn boundary_reaches_todays_start() {
        let w = nine_to_five();
        assert_eq!(
            w.next_boundary(at("2018-12-23 08:00:00")),
            Some(Duration::hours(1))
        );
    }

    #[test]
    fn boundary_reaches_close_while_open() {
        let w = nine_to_five();
        assert_eq!(
            w.next_boundary(at("2018-12-23 10:00:00")),
            Some(Duration::hours(7))
        );
    }

    #[test]
    fn boundary_rolls_to_tomorrow_after_close() {
        let w = nine_to_five();
        assert_eq!(
            w.next_boundary(at("2018-12-23 18:00:00")),
            Some(Duration::hours(15))
        );
    }

    #[test]
    fn boundary_waits_for_start_date() {
        let w = nine_to_five();
        assert_eq!(
            w.next_boundary(at("2018-11-28 10:00:00")),
            Some(Duration::days(2) + Duration::hours(23))
        );
    }

    #[test]
    fn boundary_skips_non_matching_days() {
        let mut w = window(
            "2018-12-05 00:00:00",
            "2018-12-05 09:00:00",
            "2018-12-05 17:00:00",
        );
        w.recurrence_type = Some("Weekly".to_string());
        w.recurrence_frequency = 1;
        w.recurrence_days_of_week = vec!["Wed".to_string()];

        // Thursday 2018-12-06: next opening is Wednesday 2018-12-12 09:00.
        assert_eq!(
            w.next_boundary(at("2018-12-06 10:00:00")),
            Some(Duration::days(6) - Duration::hours(1))
        );
    }

    #[test]
    fn wrapped_open_boundary_closes_after_midnight() {
        let w = window(
            "2018-12-01 00:00:00",
            "2018-12-01 22:00:00",
            "2018-12-01 02:00:00",
        );
        assert_eq!(
            w.next_boundary(at("2018-12-23 23:00:00")),
            Some(Duration::hours(3))
        );
        assert_eq!(
            w.next_boundary(at("2018-12-24 01:00:00")),
            Some(Duration::hours(1))
        );
    }

    #[test]
    fn parses_content_service_datetime_formats() {
        let expected = at("2018-12-06 09:00:00");
        for raw in [
            "2018-12-06T09:00:00",
            "2018-12-06 09:00:00",
            "Dec 6, 2018 9:00:00 AM",
            "12-06-2018 9:00:00 AM",
        ] {
            assert_eq!(parse_datetime(raw), Some(expected), "format: {raw}");
        }
        assert_eq!(
            parse_datetime("2018-12-06T09:00:00+00:00"),
            Some(expected)
        );
        assert_eq!(parse_datetime("next tuesday"), None);
    }

    proptest! {
        // A reported boundary must actually flip openness when reached.
        #[test]
        fn boundary_flips_openness(
            start_h in 0u32..24,
            start_m in 0u32..60,
            span_minutes in 1i64..600,
            now_h in 0u32..24,
            now_m in 0u32..60,
        ) {
            let start = NaiveTime::from_hms_opt(start_h, start_m, 0).unwrap();
            let (end, _) = start.overflowing_add_signed(Duration::minutes(span_minutes));

            let base = NaiveDate::from_ymd_opt(2018, 12, 1).unwrap();
            let w = Window {
                time_defined: true,
                start_date: Some(base.and_time(NaiveTime::MIN).format("%Y-%m-%d %H:%M:%S").to_string()),
                start_time: Some(base.and_time(start).format("%Y-%m-%d %H:%M:%S").to_string()),
                end_time: Some(base.and_time(end).format("%Y-%m-%d %H:%M:%S").to_string()),
                ..Window::default()
            };

            let now = NaiveDate::from_ymd_opt(2018, 12, 23)
                .unwrap()
                .and_time(NaiveTime::from_hms_opt(now_h, now_m, 0).unwrap());

            if let Some(delta) = w.next_boundary(now) {
                prop_assert!(delta > Duration::zero());
                prop_assert_ne!(w.is_open(now + delta), w.is_open(now));
            }
        }
    }
}
