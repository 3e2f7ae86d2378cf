use serde::Serialize;
use std::time::Duration;

/// Which way a run moves the contact list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Add phonetic keys.
    Forward,
    /// Clear phonetic keys.
    Rollback,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Forward => "execute",
            Direction::Rollback => "clear",
        }
    }
}

/// Lifecycle of the single run owned by the execution controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Priming,
    Running,
    Completing,
}

impl RunState {
    /// Whether `self -> next` is one of the four legal transitions.
    pub fn can_transition_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Idle, RunState::Priming)
                | (RunState::Priming, RunState::Running)
                | (RunState::Running, RunState::Completing)
                | (RunState::Completing, RunState::Idle)
        )
    }
}

/// Callbacks from the contacts engine, delivered as messages on the controller's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Began,
    Progress { text: String, percentage: u32 },
    Ended { aborted: bool },
}

/// One progress callback paired with the direction of the run that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub percentage: u32,
    pub direction: Direction,
}

/// Phase of a press-and-hold gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressPhase {
    Began,
    Changed,
    Ended,
}

/// The input gesture that asked for a clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTrigger {
    Tap,
    LongPress(PressPhase),
}

impl ClearTrigger {
    /// Taps always count; a long press only counts once, when it begins.
    pub fn is_actionable(self) -> bool {
        matches!(
            self,
            ClearTrigger::Tap | ClearTrigger::LongPress(PressPhase::Began)
        )
    }
}

/// Commands emitted by UI layers to the execution controller.
#[derive(Debug, Clone)]
pub enum UiCommand {
    Execute,
    Clear(ClearTrigger),
    /// Exit once idle, aborting an in-flight run first.
    Quit,
    /// Exit once idle, letting an in-flight run finish.
    Drain,
}

/// Engine pacing for a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub contacts_path: Option<std::path::PathBuf>,
    #[serde(with = "humantime_serde")]
    pub step_delay: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            contacts_path: None,
            step_delay: Duration::from_millis(40),
        }
    }
}

/// Summary of one finished run, handed to text/JSON presentation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub direction: Direction,
    pub aborted: bool,
    /// Last raw percentage reported by the engine (before projection).
    pub last_percentage: Option<u32>,
    pub progress_events: u64,
    pub started_at: String,
    pub finished_at: String,
}
