//! Manual refresh: a two-state machine around one fixed delay.
//!
//! `Idle --Trigger--> Refreshing --Complete--> Idle`. The timestamp moves only
//! on completion, and a trigger that arrives while refreshing is dropped.
//! Dashboard data is never recomputed here.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::{sleep, Duration};

use crate::format::format_updated_at;
use crate::logging::{log_refresh_error, log_refresh_transition};
use crate::view::ViewConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

impl RefreshPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshPhase::Idle => "idle",
            RefreshPhase::Refreshing => "refreshing",
        }
    }

    pub fn control_label(&self) -> &'static str {
        match self {
            RefreshPhase::Idle => "Refresh",
            RefreshPhase::Refreshing => "Refreshing...",
        }
    }

    /// The trigger control only accepts input while idle.
    pub fn accepts_trigger(&self) -> bool {
        matches!(self, RefreshPhase::Idle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshState {
    pub phase: RefreshPhase,
    pub last_updated: DateTime<Utc>,
    pub completions: u64,
}

impl RefreshState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            phase: RefreshPhase::Idle,
            last_updated: now,
            completions: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RefreshEvent {
    Trigger,
    Complete { at: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Ignored,
    Completed,
}

#[derive(Debug, Clone)]
pub struct TransitionError {
    pub msg: String,
}

pub fn apply_event(state: &mut RefreshState, event: RefreshEvent) -> Result<Transition, TransitionError> {
    match (state.phase, event) {
        (RefreshPhase::Idle, RefreshEvent::Trigger) => {
            state.phase = RefreshPhase::Refreshing;
            Ok(Transition::Started)
        }
        (RefreshPhase::Refreshing, RefreshEvent::Trigger) => Ok(Transition::Ignored),
        (RefreshPhase::Refreshing, RefreshEvent::Complete { at }) => {
            state.phase = RefreshPhase::Idle;
            state.last_updated = at;
            state.completions += 1;
            Ok(Transition::Completed)
        }
        (RefreshPhase::Idle, RefreshEvent::Complete { .. }) => Err(TransitionError {
            msg: "completion without a refresh in flight".to_string(),
        }),
    }
}

// =============================================================================
// Collaborators
// =============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The suspension point between trigger and completion.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self);
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    pub duration: Duration,
}

impl FixedDelay {
    pub fn from_millis(ms: u64) -> Self {
        Self {
            duration: Duration::from_millis(ms),
        }
    }
}

#[async_trait]
impl Delay for FixedDelay {
    async fn wait(&self) {
        sleep(self.duration).await;
    }
}

// =============================================================================
// Controller
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed { at: DateTime<Utc> },
    Ignored,
}

/// Cloneable handle; every clone drives the same state.
#[derive(Clone)]
pub struct RefreshController {
    state: Arc<Mutex<RefreshState>>,
    clock: Arc<dyn Clock>,
    delay: Arc<dyn Delay>,
}

impl RefreshController {
    pub fn new(clock: Arc<dyn Clock>, delay: Arc<dyn Delay>) -> Self {
        let state = RefreshState::new(clock.now());
        Self {
            state: Arc::new(Mutex::new(state)),
            clock,
            delay,
        }
    }

    pub fn with_delay_ms(ms: u64) -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(FixedDelay::from_millis(ms)))
    }

    pub fn from_config(cfg: &ViewConfig) -> Self {
        Self::with_delay_ms(cfg.refresh_delay_ms)
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn step(&self, event: RefreshEvent) -> Result<Transition, TransitionError> {
        let mut st = self.lock();
        let from = st.phase;
        let result = apply_event(&mut st, event);
        if let Ok(Transition::Started | Transition::Completed) = result {
            log_refresh_transition(from.as_str(), st.phase.as_str(), st.completions);
        }
        result
    }

    /// Run one refresh. Returns `Ignored` at once if another is in flight.
    ///
    /// The delay and the completion run on their own task, so dropping this
    /// future (a timeout, a lost `select!` branch) still lets the refresh
    /// finish and the controller return to idle.
    pub async fn trigger(&self) -> RefreshOutcome {
        match self.step(RefreshEvent::Trigger) {
            Ok(Transition::Started) => {}
            _ => return RefreshOutcome::Ignored,
        }

        let worker = self.clone();
        let handle = tokio::spawn(async move {
            worker.delay.wait().await;
            worker.complete()
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Delay panicked or the runtime is shutting down. Finish the
                // transition anyway so later triggers are accepted.
                log_refresh_error(&format!("refresh task failed: {}", err));
                self.complete()
            }
        }
    }

    fn complete(&self) -> RefreshOutcome {
        let at = self.clock.now();
        match self.step(RefreshEvent::Complete { at }) {
            Ok(_) => RefreshOutcome::Completed { at },
            Err(err) => {
                log_refresh_error(&err.msg);
                RefreshOutcome::Ignored
            }
        }
    }

    pub fn snapshot(&self) -> RefreshState {
        self.lock().clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().phase == RefreshPhase::Refreshing
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.lock().last_updated
    }

    pub fn completions(&self) -> u64 {
        self.lock().completions
    }

    /// "Updated: <time>" in the host's local time zone.
    pub fn updated_label(&self) -> String {
        self.updated_label_in(&Local)
    }

    pub fn updated_label_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let at = self.last_updated().with_timezone(tz);
        format!("Updated: {}", format_updated_at(&at))
    }
}
