//! Recurrence rule evaluation.
//!
//! Rules restrict which calendar days a window's time-of-day span applies
//! on. Only the weekly day-of-week form is fully specified by the content
//! service today; every other rule type falls back to matching every day,
//! so malformed or unknown recurrence metadata never hides content outright.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::window::Window;

/// A day predicate derived from a window's flat recurrence fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    /// Matches the listed weekdays on every `frequency`-th week, counted
    /// from the window's start date.
    Weekly { frequency: u32, days: Vec<Weekday> },
    /// Permissive fallback: matches every day.
    EveryDay,
}

impl RecurrenceRule {
    /// Build the rule declared by a window, if any.
    pub fn from_window(window: &Window) -> Option<RecurrenceRule> {
        let kind = window.recurrence_type.as_deref()?;

        if kind.eq_ignore_ascii_case("weekly") {
            let days: Vec<Weekday> = window
                .recurrence_days_of_week
                .iter()
                .filter_map(|token| parse_weekday(token))
                .collect();
            if !days.is_empty() {
                return Some(RecurrenceRule::Weekly {
                    frequency: window.recurrence_frequency.max(1),
                    days,
                });
            }
        }

        // Daily/Monthly/Yearly and anything unrecognized: match every day
        // until the full rule table is specified.
        Some(RecurrenceRule::EveryDay)
    }

    /// Whether the rule admits `date`, measured against the window's
    /// reference (start) date.
    pub fn matches(&self, reference: NaiveDate, date: NaiveDate) -> bool {
        match self {
            RecurrenceRule::EveryDay => true,
            RecurrenceRule::Weekly { frequency, days } => {
                if date < reference {
                    return false;
                }
                if !days.contains(&date.weekday()) {
                    return false;
                }
                let whole_weeks = (date - reference).num_days() / 7;
                whole_weeks % i64::from(*frequency) == 0
            }
        }
    }
}

fn parse_weekday(token: &str) -> Option<Weekday> {
    match token.get(..3)?.to_ascii_lowercase().as_str() {
        "sun" => Some(Weekday::Sun),
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekly(days: &[&str], frequency: u32) -> Window {
        Window {
            time_defined: true,
            recurrence_type: Some("Weekly".to_string()),
            recurrence_frequency: frequency,
            recurrence_days_of_week: days.iter().map(|d| d.to_string()).collect(),
            ..Window::default()
        }
    }

    #[test]
    fn weekly_matches_listed_weekday() {
        let rule = RecurrenceRule::from_window(&weekly(&["Wed"], 1)).unwrap();
        // 2018-12-05 was a Wednesday.
        let reference = date(2018, 12, 5);

        assert!(rule.matches(reference, date(2018, 12, 5)));
        assert!(rule.matches(reference, date(2018, 12, 12)));
        assert!(rule.matches(reference, date(2018, 12, 19)));
        assert!(!rule.matches(reference, date(2018, 12, 6)));
    }

    #[test]
    fn weekly_respects_frequency() {
        let rule = RecurrenceRule::from_window(&weekly(&["Wed"], 2)).unwrap();
        let reference = date(2018, 12, 5);

        assert!(rule.matches(reference, date(2018, 12, 5)));
        assert!(!rule.matches(reference, date(2018, 12, 12)));
        assert!(rule.matches(reference, date(2018, 12, 19)));
    }

    #[test]
    fn weekly_never_matches_before_reference() {
        let rule = RecurrenceRule::from_window(&weekly(&["Wed"], 1)).unwrap();
        assert!(!rule.matches(date(2018, 12, 5), date(2018, 11, 28)));
    }

    #[test]
    fn weekday_tokens_are_case_insensitive() {
        let rule = RecurrenceRule::from_window(&weekly(&["tue", "WED"], 1)).unwrap();
        let reference = date(2018, 12, 4);

        assert!(rule.matches(reference, date(2018, 12, 4)));
        assert!(rule.matches(reference, date(2018, 12, 5)));
        assert!(!rule.matches(reference, date(2018, 12, 6)));
    }

    #[test]
    fn unknown_rule_type_matches_every_day() {
        let mut window = weekly(&["Wed"], 1);
        window.recurrence_type = Some("Lunar".to_string());

        let rule = RecurrenceRule::from_window(&window).unwrap();
        assert_eq!(rule, RecurrenceRule::EveryDay);
        assert!(rule.matches(date(2018, 12, 5), date(2018, 12, 6)));
    }

    #[test]
    fn monthly_rule_falls_back_to_every_day() {
        let window = Window {
            time_defined: true,
            recurrence_type: Some("Monthly".to_string()),
            recurrence_absolute: true,
            recurrence_day_of_month: 1,
            ..Window::default()
        };
        assert_eq!(
            RecurrenceRule::from_window(&window).unwrap(),
            RecurrenceRule::EveryDay
        );
    }

    #[test]
    fn weekly_without_parsable_days_matches_every_day() {
        let rule = RecurrenceRule::from_window(&weekly(&["??"], 1)).unwrap();
        assert_eq!(rule, RecurrenceRule::EveryDay);
    }

    #[test]
    fn no_rule_when_type_absent() {
        assert!(RecurrenceRule::from_window(&Window::default()).is_none());
    }
}
