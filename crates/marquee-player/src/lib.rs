//! Rotation player for marquee displays.
//!
//! Drives unattended playback of a schedule evaluated by
//! `marquee-schedule`: round-robin rotation through the eligible set,
//! dwell-time extension for long-form items, and minimal-latency
//! re-evaluation when eligibility can change. The wall clock is injectable
//! so tests can run the whole state machine as a discrete-event simulation
//! under tokio's paused time.

mod clock;
mod player;
mod signal;

pub use clock::{Clock, SimulatedClock, SystemClock};
pub use player::{PlayUrlHandler, PlayerEvent, RotationPlayer};
pub use signal::DoneSignal;

// Schedule-window predicates consumed by sibling subsystems.
pub use marquee_schedule::{Schedule, ScheduleItem, validate};
