//! Whole-schedule evaluation: playability, constraint detection, and the
//! next moment eligibility could change.

use chrono::{Days, Duration, NaiveDateTime, NaiveTime};

use crate::types::{Schedule, ScheduleItem};

/// Forward skew applied to "now" before eligibility checks, absorbing timer
/// firing jitter so a window cannot close (or fail to open) mid-evaluation.
pub const EVALUATION_LOOKAHEAD_MS: i64 = 2000;

/// The daily re-check lands a few seconds into the next day so that
/// day-granularity recurrence rules are evaluated on the correct calendar
/// day.
const MIDNIGHT_SLACK_SECS: u32 = 5;

impl Schedule {
    /// True when neither the primary window nor any item window constrains
    /// playback, so eligibility can never change and no re-check is needed.
    pub fn is_always_open(&self) -> bool {
        self.window.is_unconstrained()
            && self.items.iter().all(|item| item.window.is_unconstrained())
    }

    /// The ordered eligible set at `now`: items with a positive dwell (or
    /// play-until-done) whose window and the primary window are both open,
    /// in declaration order.
    pub fn currently_playable(&self, now: NaiveDateTime) -> Vec<ScheduleItem> {
        let at = now + Duration::milliseconds(EVALUATION_LOOKAHEAD_MS);
        if !self.window.is_open(at) {
            return Vec::new();
        }
        self.items
            .iter()
            .filter(|item| item.has_dwell() && item.window.is_open(at))
            .cloned()
            .collect()
    }

    /// Delay until eligibility could next change: the earliest window
    /// boundary across the primary window and every item, floored at the
    /// next local midnight because recurrence rules are evaluated per
    /// calendar day. Always finite.
    pub fn next_recheck_delay(&self, now: NaiveDateTime) -> Duration {
        let mut delay = until_next_midnight(now);
        if let Some(boundary) = self.window.next_boundary(now) {
            delay = delay.min(boundary);
        }
        for item in &self.items {
            if let Some(boundary) = item.window.next_boundary(now) {
                delay = delay.min(boundary);
            }
        }
        delay
    }

    /// Telemetry predicate: would this schedule be expected to be showing
    /// something right now.
    pub fn would_play_now(&self, now: NaiveDateTime) -> bool {
        !self.currently_playable(now).is_empty()
    }
}

/// Delay until shortly after the next local midnight.
pub fn until_next_midnight(now: NaiveDateTime) -> Duration {
    let slack = NaiveTime::from_hms_opt(0, 0, MIDNIGHT_SLACK_SECS).unwrap_or(NaiveTime::MIN);
    (now.date() + Days::new(1)).and_time(slack) - now
}
