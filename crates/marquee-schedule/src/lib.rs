//! Schedule evaluation core for marquee displays.
//!
//! Pure functions of (schedule document, wall-clock time):
//! - structural validation of fetched documents
//! - recurrence rule and time window evaluation
//! - the ordered eligible set and the next moment it can change
//!
//! Nothing here owns timers or touches the network; the rotation player in
//! `marquee-player` drives these evaluators. Window parse failures are
//! reported through `tracing` and fail closed rather than propagating.

mod error;
mod eval;
mod recurrence;
mod types;
mod window;

pub use error::ScheduleError;
pub use eval::{EVALUATION_LOOKAHEAD_MS, until_next_midnight};
pub use recurrence::RecurrenceRule;
pub use types::{Schedule, ScheduleItem, validate};
pub use window::Window;
