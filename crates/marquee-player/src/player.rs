//! Rotation player: the timer-driven state machine that decides what is on
//! screen.
//!
//! One `RotationPlayer` instance per display. All mutable state (installed
//! document, rotation cursor, pending deadlines) lives behind a single lock;
//! the `run` loop is the only timer dispatcher, so at most one pending
//! deadline per category exists at any instant and a superseded deadline can
//! never fire.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{Duration, NaiveDateTime};
use serde_json::Value;
use tokio::sync::{Notify, broadcast, watch};
use tracing::{debug, info, warn};

use marquee_schedule::{Schedule, ScheduleItem};

use crate::clock::Clock;
use crate::signal::DoneSignal;

/// Poll interval while a play-until-done item holds the screen.
const DWELL_POLL_SECS: i64 = 1;

/// Buffered player events per subscriber.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Callback invoked with a content reference whenever the rendering surface
/// should load something new.
pub type PlayUrlHandler = Box<dyn Fn(&str) + Send + Sync>;

/// Notifications emitted by the player.
///
/// `NothingPlaying` doubles as the "playing item is now null" notification.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Playing(ScheduleItem),
    NothingPlaying,
}

/// Which pending deadline fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    /// The current item's dwell expired (or its dwell poll is due).
    Item,
    /// Eligibility could have changed; re-run `start`.
    Recheck,
}

/// At most one pending deadline per timer category. Assigning a new
/// deadline replaces the previous one, so cancellation is enforced by
/// construction.
#[derive(Debug, Default, Clone, Copy)]
struct Deadlines {
    item: Option<NaiveDateTime>,
    recheck: Option<NaiveDateTime>,
}

impl Deadlines {
    /// The earliest pending deadline. Rechecks win ties so a reopened
    /// window is noticed before the stale item advances.
    fn next_due(&self) -> Option<(TimerKind, NaiveDateTime)> {
        match (self.item, self.recheck) {
            (Some(item), Some(recheck)) if item < recheck => Some((TimerKind::Item, item)),
            (_, Some(recheck)) => Some((TimerKind::Recheck, recheck)),
            (Some(item), None) => Some((TimerKind::Item, item)),
            (None, None) => None,
        }
    }
}

#[derive(Default)]
struct State {
    document: Option<Value>,
    playing: Option<ScheduleItem>,
    rotation: VecDeque<ScheduleItem>,
    deadlines: Deadlines,
}

/// Side effects computed under the state lock and applied after releasing
/// it, so the play-url handler and event listeners never run while the
/// player is locked.
#[derive(Default)]
struct Effects {
    load: Option<String>,
    event: Option<PlayerEvent>,
}

/// The rotation state machine for one display.
pub struct RotationPlayer {
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
    handler: RwLock<Option<PlayUrlHandler>>,
    signal: Arc<DoneSignal>,
    events: broadcast::Sender<PlayerEvent>,
    wake: Notify,
}

impl RotationPlayer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            clock,
            state: Mutex::new(State::default()),
            handler: RwLock::new(None),
            signal: Arc::new(DoneSignal::new()),
            events,
            wake: Notify::new(),
        }
    }

    /// Install or replace the schedule document. Takes effect on the next
    /// `start`.
    pub fn set_content(&self, document: Value) {
        self.lock_state().document = Some(document);
    }

    /// Register the callback that loads content into the rendering surface.
    pub fn set_play_url_handler(&self, handler: PlayUrlHandler) {
        *self.handler.write().unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    /// Subscribe to playing-item notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// The dwell-extension boundary handed to the rendering surface.
    pub fn done_signal(&self) -> Arc<DoneSignal> {
        Arc::clone(&self.signal)
    }

    /// The item currently on screen, if any.
    pub fn now_playing(&self) -> Option<ScheduleItem> {
        self.lock_state().playing.clone()
    }

    /// When eligibility will next be re-evaluated, if a re-check is armed.
    pub fn next_recheck_at(&self) -> Option<NaiveDateTime> {
        self.lock_state().deadlines.recheck
    }

    /// (Re)enter the rotation state machine: validate the installed
    /// document, arm the eligibility re-check, and continue or advance the
    /// rotation. Idempotent with respect to continuity.
    pub fn start(&self) {
        let effects = {
            let mut state = self.lock_state();
            self.start_locked(&mut state)
        };
        self.apply(effects);
        self.wake.notify_one();
    }

    /// Halt rotation: clear every pending deadline and the playing pointer.
    pub fn stop(&self) {
        let effects = {
            let mut state = self.lock_state();
            state.deadlines = Deadlines::default();
            state.rotation.clear();
            state.playing = None;
            Effects {
                load: None,
                event: Some(PlayerEvent::NothingPlaying),
            }
        };
        info!("rotation stopped");
        self.apply(effects);
        self.wake.notify_one();
    }

    /// Timer dispatch loop: sleeps until the earliest pending deadline,
    /// wakes early when a public method changes deadlines, and fires due
    /// deadlines one at a time in timestamp order.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("rotation player running");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let due = self.lock_state().deadlines.next_due();
            let now = self.clock.now();

            match due {
                Some((kind, at)) if at <= now => self.fire(kind),
                Some((_, at)) => {
                    let delay = (at - now).to_std().unwrap_or_default();
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => {}
                        _ = self.wake.notified() => {}
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => {}
                        _ = self.wake.notified() => {}
                    }
                }
            }
        }

        info!("rotation player shut down");
    }

    fn fire(&self, kind: TimerKind) {
        let effects = {
            let mut state = self.lock_state();
            match kind {
                TimerKind::Recheck => {
                    debug!("eligibility re-check due");
                    state.deadlines.recheck = None;
                    self.start_locked(&mut state)
                }
                TimerKind::Item => {
                    state.deadlines.item = None;
                    self.item_timer_locked(&mut state)
                }
            }
        };
        self.apply(effects);
    }

    fn start_locked(&self, state: &mut State) -> Effects {
        state.deadlines.recheck = None;

        let schedule = match state.document.as_ref().map(Schedule::from_document) {
            Some(Ok(schedule)) => schedule,
            _ => {
                warn!("invalid schedule data");
                return Self::nothing_playing(state);
            }
        };

        let now = self.clock.now();

        if !schedule.is_always_open() {
            let delay = schedule.next_recheck_delay(now);
            state.deadlines.recheck = Some(now + delay);
            debug!(delay_secs = delay.num_seconds(), "armed eligibility re-check");
        }

        let eligible = schedule.currently_playable(now);
        if eligible.is_empty() {
            info!(schedule = ?schedule.name, "no playable items");
            return Self::nothing_playing(state);
        }

        // Continuity: if the playing item survived re-evaluation, keep it
        // on screen and its dwell timer running; only its successors in the
        // new ordering change.
        if let Some(position) = Self::continuity_position(state, &eligible) {
            let mut rotation = VecDeque::from(eligible);
            rotation.rotate_left((position + 1) % rotation.len());
            state.rotation = rotation;
            debug!("continuing current item across re-evaluation");
            return Effects::default();
        }

        state.rotation = VecDeque::from(eligible);
        self.advance(state, now)
    }

    /// Index of the playing item in the new eligible set, when its dwell
    /// timer is still running.
    fn continuity_position(state: &State, eligible: &[ScheduleItem]) -> Option<usize> {
        let playing = state.playing.as_ref()?;
        state.deadlines.item?;
        eligible.iter().position(|item| item.same_item(playing))
    }

    fn item_timer_locked(&self, state: &mut State) -> Effects {
        let now = self.clock.now();

        // Dwell wait: a play-until-done item holds the screen until the
        // rendering surface reports completion, re-checked on a short poll.
        let dwell_pending = state
            .playing
            .as_ref()
            .is_some_and(|item| item.play_until_done && !self.signal.is_done());
        if dwell_pending {
            state.deadlines.item = Some(now + Duration::seconds(DWELL_POLL_SECS));
            return Effects::default();
        }

        self.advance(state, now)
    }

    /// Round-robin: pop the head of the rotation, push it to the tail, and
    /// put it on screen.
    fn advance(&self, state: &mut State, now: NaiveDateTime) -> Effects {
        let Some(next) = state.rotation.pop_front() else {
            return Self::nothing_playing(state);
        };
        state.rotation.push_back(next.clone());

        // A repeated reference keeps playing untouched; anything else is
        // handed to the rendering surface.
        let load = match &state.playing {
            Some(previous) if previous.object_reference == next.object_reference => None,
            _ => Some(next.object_reference.clone()),
        };

        // Sub-millisecond dwells would spin the dispatch loop.
        let dwell = if next.play_until_done {
            Duration::seconds(DWELL_POLL_SECS)
        } else {
            Duration::milliseconds(((next.duration * 1000.0) as i64).max(1))
        };
        state.deadlines.item = Some(now + dwell);

        info!(item = %next.name, reload = load.is_some(), "now playing");
        state.playing = Some(next.clone());

        Effects {
            load,
            event: Some(PlayerEvent::Playing(next)),
        }
    }

    fn nothing_playing(state: &mut State) -> Effects {
        state.deadlines.item = None;
        state.rotation.clear();
        state.playing = None;
        Effects {
            load: None,
            event: Some(PlayerEvent::NothingPlaying),
        }
    }

    fn apply(&self, effects: Effects) {
        if let Some(reference) = effects.load {
            self.signal.reset();
            let handler = self.handler.read().unwrap_or_else(|e| e.into_inner());
            if let Some(handler) = handler.as_ref() {
                handler(&reference);
            }
        }
        if let Some(event) = effects.event {
            let _ = self.events.send(event);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
