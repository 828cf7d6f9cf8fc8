//! Adaptive reminder scheduler.
//!
//! `ReminderScheduler` owns the single `ReminderState`, decides when the next
//! reminder fires, and drives two single-shot timers:
//!
//! - **main timer**: wakes up at the next fire time and runs the due-check
//! - **escalation timer**: armed after a reminder is shown; if the user does
//!   nothing within the level's grace period the reminder counts as missed
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Running <-> RunningPaused -> Stopped
//! ```
//!
//! ## Due-check order
//!
//! 1. suppression oracle (idle / presenting / night) -> retry in 10 min
//! 2. pause window -> resume if expired, else wait out the remainder
//! 3. work hours -> defer to the next window start
//! 4. deliver the reminder, count it, arm the escalation timer
//!
//! Every command takes the one engine lock, mutates the state, recomputes the
//! next fire time, persists, and rearms. Persistence failures are logged and
//! the in-memory state is kept.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::timer::DeferredTimer;
use super::work_hours::next_work_start;
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{
    NotificationSink, ReminderDue, SettingsProvider, StatePersistence, SuppressionOracle,
    SuppressionQuery,
};
use crate::error::{CoreError, Result};
use crate::reminder::{reminder_message, ReminderState};
use crate::settings::ReminderSettings;

/// Shortest delay the main timer is armed for when following the schedule.
pub const MIN_FIRE_DELAY_MINUTES: i64 = 15;
/// Retry delay after a suppressed due-check.
pub const SUPPRESSED_RETRY_MINUTES: i64 = 10;
/// Retry delay after a failed due-check.
pub const ERROR_RETRY_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Stopped,
    Running,
    RunningPaused,
}

/// What a due-check decided.
#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    /// The oracle said not now; retried after `SUPPRESSED_RETRY_MINUTES`.
    Suppressed { retry_at: DateTime<Local> },
    /// Still inside a pause window.
    Paused { resumes_at: DateTime<Local> },
    /// Outside work hours; deferred to the next window start.
    OutsideWorkHours { next_start: DateTime<Local> },
    /// Reminder handed to the notification sink.
    Delivered(ReminderDue),
}

/// Collaborators injected into the scheduler.
pub struct SchedulerDeps {
    pub settings: Arc<dyn SettingsProvider>,
    pub oracle: Arc<dyn SuppressionOracle>,
    pub sink: Arc<dyn NotificationSink>,
    pub persistence: Arc<dyn StatePersistence>,
    pub clock: Arc<dyn Clock>,
}

impl SchedulerDeps {
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        oracle: Arc<dyn SuppressionOracle>,
        sink: Arc<dyn NotificationSink>,
        persistence: Arc<dyn StatePersistence>,
    ) -> Self {
        Self {
            settings,
            oracle,
            sink,
            persistence,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

struct Inner {
    state: ReminderState,
    settings: ReminderSettings,
    run_state: RunState,
    main_timer: DeferredTimer,
    escalation_timer: DeferredTimer,
}

struct Shared {
    inner: Mutex<Inner>,
    deps: SchedulerDeps,
}

/// The reminder scheduling engine. Cheap to clone; clones share one engine.
#[derive(Clone)]
pub struct ReminderScheduler {
    shared: Arc<Shared>,
}

impl ReminderScheduler {
    /// Build a scheduler, loading settings and state from the collaborators.
    /// Load failures fall back to defaults; the scheduler starts `Stopped`.
    pub fn new(deps: SchedulerDeps) -> Self {
        let now = deps.clock.now();
        let settings = load_settings(&deps).unwrap_or_default();
        let state = load_state(&deps)
            .unwrap_or_else(|| ReminderState::new(now, settings.base_interval_minutes));
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state,
                    settings,
                    run_state: RunState::Stopped,
                    main_timer: DeferredTimer::new(),
                    escalation_timer: DeferredTimer::new(),
                }),
                deps,
            }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn get_state(&self) -> ReminderState {
        self.shared.inner.lock().await.state.clone()
    }

    pub async fn settings(&self) -> ReminderSettings {
        self.shared.inner.lock().await.settings.clone()
    }

    pub async fn run_state(&self) -> RunState {
        self.shared.inner.lock().await.run_state
    }

    /// Next fire time per the adaptive interval and escalation factor, from now.
    pub async fn calculate_next_fire_time(&self) -> DateTime<Local> {
        let now = self.shared.deps.clock.now();
        self.shared.inner.lock().await.state.compute_next_fire_time(now)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn start(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock().await;
        if inner.run_state != RunState::Stopped {
            tracing::warn!("reminder scheduler already running");
            return Ok(());
        }
        let now = self.shared.deps.clock.now();

        match self.shared.deps.settings.load() {
            Ok(settings) => match settings.validate() {
                Ok(()) => inner.settings = settings,
                Err(e) => tracing::warn!("ignoring invalid settings: {e}"),
            },
            Err(e) => tracing::warn!("failed to load settings, keeping current: {e}"),
        }
        match self.shared.deps.persistence.load() {
            Ok(Some(state)) => inner.state = state,
            Ok(None) => {
                inner.state = ReminderState::new(now, inner.settings.base_interval_minutes)
            }
            Err(e) => tracing::warn!("failed to load reminder state, keeping current: {e}"),
        }

        if inner.state.roll_daily_counters(now) {
            tracing::info!("daily reminder counters reset");
        }
        inner.state.next_reminder_at = inner.state.compute_next_fire_time(now);
        self.shared.persist(&inner.state);

        inner.run_state = if inner.state.paused {
            RunState::RunningPaused
        } else {
            RunState::Running
        };
        self.shared.rearm_main(&mut inner, now);
        tracing::info!(
            next = %inner.state.next_reminder_at,
            interval = inner.state.current_interval_minutes,
            level = inner.state.escalation_level.as_u8(),
            "reminder scheduler started"
        );
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock().await;
        if inner.run_state == RunState::Stopped {
            tracing::warn!("reminder scheduler already stopped");
            return Ok(());
        }
        inner.main_timer.cancel();
        inner.escalation_timer.cancel();
        self.shared.persist(&inner.state);
        inner.run_state = RunState::Stopped;
        tracing::info!("reminder scheduler stopped");
        Ok(())
    }

    /// Hold reminders for `duration`. Any pending auto-escalation is dropped
    /// so a paused user is never counted as having missed a reminder.
    pub async fn pause(&self, duration: Duration, reason: Option<String>) -> Result<()> {
        let mut inner = self.shared.inner.lock().await;
        let now = self.shared.deps.clock.now();
        inner.state.pause(duration, reason, now)?;
        inner.escalation_timer.cancel();
        self.shared.persist(&inner.state);
        if inner.run_state != RunState::Stopped {
            inner.run_state = RunState::RunningPaused;
            self.shared.rearm_main(&mut inner, now);
        }
        tracing::info!(minutes = duration.num_minutes(), "reminders paused");
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock().await;
        if !inner.state.paused {
            tracing::debug!("resume ignored: not paused");
            return Ok(());
        }
        let now = self.shared.deps.clock.now();
        inner.state.resume(now);
        self.shared.persist(&inner.state);
        if inner.run_state != RunState::Stopped {
            inner.run_state = RunState::Running;
            self.shared.rearm_main(&mut inner, now);
        }
        tracing::info!("reminders resumed");
        Ok(())
    }

    pub async fn record_intake(&self, amount_ml: u32) -> Result<ReminderState> {
        let mut inner = self.shared.inner.lock().await;
        let now = self.shared.deps.clock.now();
        inner.state.record_intake(amount_ml, now);
        self.shared.persist(&inner.state);
        if inner.run_state != RunState::Stopped {
            inner.escalation_timer.cancel();
            self.shared.rearm_main(&mut inner, now);
        }
        Ok(inner.state.clone())
    }

    /// The user dismissed the reminder without drinking.
    pub async fn record_dismissed(&self) -> Result<ReminderState> {
        let mut inner = self.shared.inner.lock().await;
        let now = self.shared.deps.clock.now();
        inner.state.record_missed(now);
        self.shared.persist(&inner.state);
        if inner.run_state != RunState::Stopped {
            inner.escalation_timer.cancel();
            self.shared.rearm_main(&mut inner, now);
        }
        Ok(inner.state.clone())
    }

    /// Replace settings. Invalid settings are rejected and the prior ones kept.
    /// A new base interval only seeds fresh state; the adaptive interval of
    /// the current state is left alone.
    pub async fn update_settings(&self, settings: ReminderSettings) -> Result<()> {
        settings.validate()?;
        let mut inner = self.shared.inner.lock().await;
        inner.settings = settings;
        tracing::info!("reminder settings updated");
        Ok(())
    }

    /// Run the due-check immediately, as if the main timer had elapsed.
    pub async fn fire_now(&self) -> Result<FireOutcome> {
        let mut inner = self.shared.inner.lock().await;
        if inner.run_state == RunState::Stopped {
            return Err(CoreError::Custom("reminder scheduler is not running".into()));
        }
        inner.main_timer.cancel();
        let now = self.shared.deps.clock.now();
        let result = self.shared.handle_fire(&mut inner, now);
        if let Err(e) = &result {
            tracing::error!("due-check failed, retrying in 5 minutes: {e}");
            self.shared
                .arm_main(&mut inner, Duration::minutes(ERROR_RETRY_MINUTES));
        }
        result
    }
}

impl Shared {
    fn persist(&self, state: &ReminderState) {
        if let Err(e) = self.deps.persistence.save(state) {
            tracing::warn!("failed to persist reminder state: {e}");
        }
    }

    fn arm_main(self: &Arc<Self>, inner: &mut Inner, delay: Duration) {
        let weak = Arc::downgrade(self);
        inner
            .main_timer
            .arm(delay, move |generation| on_main_timer(weak, generation));
        tracing::debug!(secs = delay.num_seconds(), "main timer armed");
    }

    fn arm_escalation(self: &Arc<Self>, inner: &mut Inner, delay: Duration) {
        let weak = Arc::downgrade(self);
        inner
            .escalation_timer
            .arm(delay, move |generation| on_escalation_timer(weak, generation));
        tracing::debug!(secs = delay.num_seconds(), "escalation timer armed");
    }

    /// Arm the main timer from the state's next fire time. While paused the
    /// timer wakes at whichever comes first: the pause end or the next fire.
    fn rearm_main(self: &Arc<Self>, inner: &mut Inner, now: DateTime<Local>) {
        let scheduled =
            (inner.state.next_reminder_at - now).max(Duration::minutes(MIN_FIRE_DELAY_MINUTES));
        let delay = if inner.state.paused {
            inner.state.pause_remaining(now).min(scheduled)
        } else {
            scheduled
        };
        self.arm_main(inner, delay);
    }

    fn is_suppressed(&self, settings: &ReminderSettings, now: DateTime<Local>) -> bool {
        let query = SuppressionQuery {
            now,
            smart_pause_enabled: settings.smart_pause_enabled,
            circadian_enabled: settings.circadian_enabled,
            weather_enabled: settings.weather_enabled,
        };
        match self.deps.oracle.should_suppress(&query) {
            Ok(suppressed) => suppressed,
            Err(e) => {
                tracing::warn!("suppression check failed, showing reminder: {e}");
                false
            }
        }
    }

    fn handle_fire(self: &Arc<Self>, inner: &mut Inner, now: DateTime<Local>) -> Result<FireOutcome> {
        if self.is_suppressed(&inner.settings, now) {
            let retry = Duration::minutes(SUPPRESSED_RETRY_MINUTES);
            self.arm_main(inner, retry);
            return Ok(FireOutcome::Suppressed {
                retry_at: now + retry,
            });
        }

        if inner.state.paused {
            if inner.state.is_pause_expired(now) {
                inner.state.resume(now);
                inner.run_state = RunState::Running;
                self.persist(&inner.state);
                tracing::info!("pause expired, reminders resumed");
            } else {
                let remaining = inner.state.pause_remaining(now);
                self.arm_main(inner, remaining);
                return Ok(FireOutcome::Paused {
                    resumes_at: now + remaining,
                });
            }
        }

        if !inner.settings.is_within_work_hours(now.time()) {
            let next_start = next_work_start(now, &inner.settings);
            self.arm_main(inner, next_start - now);
            tracing::debug!(%next_start, "outside work hours");
            return Ok(FireOutcome::OutsideWorkHours { next_start });
        }

        let level = inner.state.escalation_level;
        let minutes_since_intake = inner.state.minutes_since_intake(now);
        let reminder = ReminderDue {
            message: reminder_message(level, minutes_since_intake),
            escalation_level: level.capped_at(inner.settings.max_disruption_level),
            minutes_since_intake,
            at: now,
        };
        self.deps.sink.on_reminder_due(&reminder)?;

        inner.state.mark_shown(now);
        self.persist(&inner.state);
        self.arm_escalation(inner, level.grace_period());
        self.rearm_main(inner, now);
        tracing::info!(
            level = level.as_u8(),
            minutes_since_intake,
            "reminder delivered"
        );
        Ok(FireOutcome::Delivered(reminder))
    }

    fn handle_grace_expired(self: &Arc<Self>, inner: &mut Inner, now: DateTime<Local>) {
        if inner.state.paused {
            return;
        }
        inner.state.record_missed(now);
        self.persist(&inner.state);
        self.rearm_main(inner, now);
        tracing::info!(
            missed = inner.state.consecutive_missed,
            level = inner.state.escalation_level.as_u8(),
            "reminder went unanswered"
        );
    }
}

async fn on_main_timer(weak: Weak<Shared>, generation: u64) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let mut inner = shared.inner.lock().await;
    if !inner.main_timer.release(generation) || inner.run_state == RunState::Stopped {
        return;
    }
    let now = shared.deps.clock.now();
    match shared.handle_fire(&mut inner, now) {
        Ok(outcome) => tracing::debug!(?outcome, "due-check finished"),
        Err(e) => {
            tracing::error!("due-check failed, retrying in 5 minutes: {e}");
            shared.arm_main(&mut inner, Duration::minutes(ERROR_RETRY_MINUTES));
        }
    }
}

async fn on_escalation_timer(weak: Weak<Shared>, generation: u64) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let mut inner = shared.inner.lock().await;
    if !inner.escalation_timer.release(generation) || inner.run_state == RunState::Stopped {
        return;
    }
    let now = shared.deps.clock.now();
    shared.handle_grace_expired(&mut inner, now);
}

fn load_settings(deps: &SchedulerDeps) -> Option<ReminderSettings> {
    match deps.settings.load() {
        Ok(settings) if settings.validate().is_ok() => Some(settings),
        Ok(_) => {
            tracing::warn!("stored settings are invalid, using defaults");
            None
        }
        Err(e) => {
            tracing::warn!("failed to load settings, using defaults: {e}");
            None
        }
    }
}

fn load_state(deps: &SchedulerDeps) -> Option<ReminderState> {
    match deps.persistence.load() {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("failed to load reminder state: {e}");
            None
        }
    }
}
