//! Run lifecycle controller.
//!
//! [`ExecutionController`] is a synchronous state machine over
//! `Idle -> Priming -> Running -> Completing -> Idle`. [`run_controller`]
//! pins it to one tokio task and feeds it every input: UI commands, dialog
//! answers, task events, media signals and completion-phase timers.

use super::completion::{CompletionSequencer, Outcome, PhaseStep};
use crate::ambient::{AmbientLoop, MediaSignal};
use crate::dialog::{ClearPrompt, ConfirmationDialog};
use crate::engine::{ContactsEngine, TaskHandle};
use crate::gate::AnimationGate;
use crate::model::{
    ClearTrigger, Direction, ProgressSample, RunReport, RunState, TaskEvent, UiCommand,
};
use crate::projector::{angle_for, project};
use crate::surface::{Transition, VisualSurface, OPAQUE, TRANSPARENT};
use anyhow::Result;
use std::pin::Pin;
use time::format_description::well_known::Rfc3339;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time::{Duration, Sleep};

/// Output text while a rollback has not reported anything yet.
pub const PROCESSING_PLACEHOLDER: &str = "Processing...";
const PLACEHOLDER_FADE: Duration = Duration::from_millis(400);

/// Internal handle for a running task: its event queue plus abort control.
pub struct RunCtx {
    events: UnboundedReceiver<TaskEvent>,
    handle: TaskHandle,
}

/// Bookkeeping for the run in flight, turned into a [`RunReport`] at the end.
struct RunStats {
    direction: Direction,
    started_at: String,
    last_percentage: Option<u32>,
    progress_events: u64,
    aborted: bool,
    finished_at: Option<String>,
}

impl RunStats {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            started_at: now_rfc3339(),
            last_percentage: None,
            progress_events: 0,
            aborted: false,
            finished_at: None,
        }
    }

    fn into_report(self) -> RunReport {
        RunReport {
            direction: self.direction,
            aborted: self.aborted,
            last_percentage: self.last_percentage,
            progress_events: self.progress_events,
            started_at: self.started_at,
            finished_at: self.finished_at.unwrap_or_else(now_rfc3339),
        }
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

pub struct ExecutionController {
    state: RunState,
    direction: Direction,
    processing: bool,
    awaiting_confirmation: bool,
    surface: Box<dyn VisualSurface>,
    ambient: AmbientLoop,
    gate: AnimationGate,
    engine: Box<dyn ContactsEngine>,
    completion: Option<CompletionSequencer>,
    run: Option<RunStats>,
    finished: Option<RunReport>,
}

impl ExecutionController {
    pub fn new(
        surface: Box<dyn VisualSurface>,
        ambient: AmbientLoop,
        gate: AnimationGate,
        engine: Box<dyn ContactsEngine>,
    ) -> Self {
        Self {
            state: RunState::Idle,
            direction: Direction::Forward,
            processing: false,
            awaiting_confirmation: false,
            surface,
            ambient,
            gate,
            engine,
            completion: None,
            run: None,
            finished: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Start a forward run.
    pub fn execute(&mut self) -> Option<RunCtx> {
        if self.awaiting_confirmation {
            tracing::debug!("execute ignored while a clear is awaiting confirmation");
            return None;
        }
        self.start(Direction::Forward)
    }

    /// Validate a clear gesture. Returns the prompt to show, or `None` when the
    /// request is ignored.
    pub fn request_clear(&mut self, trigger: ClearTrigger) -> Option<ClearPrompt> {
        if !trigger.is_actionable() {
            tracing::trace!(?trigger, "clear gesture ignored");
            return None;
        }
        if self.state != RunState::Idle || self.awaiting_confirmation {
            tracing::debug!(state = ?self.state, "clear ignored, controller busy");
            self.surface.notify("Busy, try again when the current run has finished");
            return None;
        }
        self.awaiting_confirmation = true;
        Some(ClearPrompt::default())
    }

    /// Answer to the prompt from [`request_clear`](Self::request_clear).
    pub fn confirm_clear(&mut self, confirmed: bool) -> Option<RunCtx> {
        if !std::mem::take(&mut self.awaiting_confirmation) {
            tracing::debug!("confirmation without a pending clear");
            return None;
        }
        if !confirmed {
            tracing::info!("clear cancelled");
            self.surface.notify("Clear cancelled");
            return None;
        }
        self.start(Direction::Rollback)
    }

    fn start(&mut self, direction: Direction) -> Option<RunCtx> {
        if self.state != RunState::Idle {
            tracing::debug!(state = ?self.state, ?direction, "start ignored, run in flight");
            return None;
        }
        self.transition(RunState::Priming);
        self.direction = direction;
        self.run = Some(RunStats::new(direction));
        self.prime_surface(direction);

        let (events_tx, events) = mpsc::unbounded_channel();
        let handle = match direction {
            Direction::Forward => self.engine.execute(events_tx),
            Direction::Rollback => self.engine.clear_phonetic_keys(events_tx),
        };
        tracing::info!(direction = direction.label(), "run started");
        Some(RunCtx { events, handle })
    }

    fn prime_surface(&mut self, direction: Direction) {
        let surface = self.surface.as_mut();
        surface.animate_progress_opacity(OPAQUE, Transition::IMMEDIATE);
        surface.set_output_text("");
        match direction {
            Direction::Forward => {
                surface.set_percentage_text("0%");
                surface.set_progress_angle(angle_for(0));
            }
            Direction::Rollback => {
                surface.set_percentage_text("100%");
                surface.set_progress_angle(angle_for(100));
                surface.animate_output_opacity(TRANSPARENT, Transition::IMMEDIATE);
                surface.set_output_text(PROCESSING_PLACEHOLDER);
                surface.animate_output_opacity(OPAQUE, Transition::over(PLACEHOLDER_FADE));
            }
        }
    }

    /// Apply one task callback. Returns the wait before the next completion
    /// phase when the event ended the run.
    pub fn handle_task_event(&mut self, event: TaskEvent) -> Option<Duration> {
        match event {
            TaskEvent::Began => {
                self.on_begin();
                None
            }
            TaskEvent::Progress { text, percentage } => {
                self.on_progress(&text, percentage);
                None
            }
            TaskEvent::Ended { aborted } => self.on_end(aborted),
        }
    }

    fn on_begin(&mut self) {
        if self.state != RunState::Priming {
            tracing::debug!(state = ?self.state, "stray begin ignored");
            return;
        }
        self.transition(RunState::Running);
        self.set_processing(true);
        self.ambient
            .consider_playing(&mut self.gate, self.surface.as_mut());
    }

    fn on_progress(&mut self, text: &str, percentage: u32) {
        if self.state != RunState::Running {
            tracing::debug!(state = ?self.state, percentage, "stray progress ignored");
            return;
        }
        if let Some(run) = self.run.as_mut() {
            run.last_percentage = Some(percentage);
            run.progress_events += 1;
        }

        let projection = project(ProgressSample {
            percentage,
            direction: self.direction,
        });
        if self.direction == Direction::Forward {
            self.surface.set_output_text(text);
        }
        self.surface.set_percentage_text(&projection.text);
        self.surface.set_progress_angle(projection.angle);
    }

    fn on_end(&mut self, aborted: bool) -> Option<Duration> {
        match self.state {
            RunState::Running => {}
            RunState::Priming => {
                tracing::debug!("run ended before it began");
                self.transition(RunState::Running);
            }
            _ => {
                tracing::debug!(state = ?self.state, "stray end ignored");
                return None;
            }
        }

        // Playback must be stopped before the first completion phase.
        self.ambient.halt();
        self.transition(RunState::Completing);
        if let Some(run) = self.run.as_mut() {
            run.aborted = aborted;
            run.finished_at = Some(now_rfc3339());
        }
        tracing::info!(direction = self.direction.label(), aborted, "run ended");

        self.completion = Some(CompletionSequencer::new(Outcome::from_aborted(aborted)));
        self.advance_completion()
    }

    /// Apply the next completion phase. `Some(wait)` means call again after
    /// `wait`; `None` means the controller is idle again.
    pub fn advance_completion(&mut self) -> Option<Duration> {
        let sequencer = self.completion.as_mut()?;
        match sequencer.advance(self.surface.as_mut()) {
            PhaseStep::Wait(wait) => Some(wait),
            PhaseStep::Finished => {
                self.completion = None;
                self.set_processing(false);
                self.transition(RunState::Idle);
                self.finished = self.run.take().map(RunStats::into_report);
                None
            }
        }
    }

    pub fn on_media_reached_end(&mut self) {
        self.ambient.on_reached_end();
    }

    /// Report of the most recently finished run, once.
    pub fn take_report(&mut self) -> Option<RunReport> {
        self.finished.take()
    }

    /// Stop the ambient loop and release it.
    pub fn shutdown(&mut self) {
        self.ambient.pause(self.surface.as_mut());
        self.ambient.teardown();
    }

    fn set_processing(&mut self, processing: bool) {
        self.processing = processing;
        self.surface.set_processing(processing);
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {next:?}",
            self.state
        );
        tracing::debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }
}

/// Drive the controller from UI commands and task events until asked to stop
/// and idle. Finished runs are reported on `report_tx`.
pub async fn run_controller(
    mut controller: ExecutionController,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
    mut media_rx: UnboundedReceiver<MediaSignal>,
    mut dialog: Box<dyn ConfirmationDialog>,
    report_tx: Option<UnboundedSender<RunReport>>,
) -> Result<()> {
    let mut run_ctx: Option<RunCtx> = None;
    let mut confirm_rx: Option<oneshot::Receiver<bool>> = None;
    let mut phase_timer: Option<Pin<Box<Sleep>>> = None;
    let mut commands_open = true;
    let mut media_open = true;
    let mut exit_pending = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if commands_open => {
                match cmd {
                    Some(UiCommand::Execute) => {
                        if let Some(ctx) = controller.execute() {
                            run_ctx = Some(ctx);
                        }
                    }
                    Some(UiCommand::Clear(trigger)) => {
                        if let Some(prompt) = controller.request_clear(trigger) {
                            let (reply_tx, reply_rx) = oneshot::channel();
                            dialog.present(prompt, reply_tx);
                            confirm_rx = Some(reply_rx);
                        }
                    }
                    Some(UiCommand::Quit) => {
                        exit_pending = true;
                        if let Some(ctx) = &run_ctx {
                            tracing::info!(
                                processing = controller.is_processing(),
                                "quit requested, aborting run"
                            );
                            ctx.handle.abort();
                        }
                        if confirm_rx.take().is_some() {
                            controller.confirm_clear(false);
                        }
                    }
                    Some(UiCommand::Drain) => exit_pending = true,
                    None => {
                        commands_open = false;
                        exit_pending = true;
                    }
                }
            }
            answer = async {
                match &mut confirm_rx {
                    Some(rx) => rx.await,
                    None => futures::future::pending().await,
                }
            }, if confirm_rx.is_some() => {
                confirm_rx = None;
                // A dropped reply counts as cancel.
                let confirmed = answer.unwrap_or(false);
                if let Some(ctx) = controller.confirm_clear(confirmed) {
                    run_ctx = Some(ctx);
                }
            }
            event = async {
                match &mut run_ctx {
                    Some(ctx) => ctx.events.recv().await,
                    None => futures::future::pending().await,
                }
            }, if run_ctx.is_some() => {
                let event = event.unwrap_or_else(|| {
                    tracing::warn!("task event channel closed without an end event");
                    TaskEvent::Ended { aborted: true }
                });
                let ended = matches!(event, TaskEvent::Ended { .. });
                if let Some(wait) = controller.handle_task_event(event) {
                    phase_timer = Some(Box::pin(tokio::time::sleep(wait)));
                }
                if ended {
                    run_ctx = None;
                }
            }
            _ = async {
                match &mut phase_timer {
                    Some(timer) => timer.as_mut().await,
                    None => futures::future::pending().await,
                }
            }, if phase_timer.is_some() => {
                phase_timer = controller
                    .advance_completion()
                    .map(|wait| Box::pin(tokio::time::sleep(wait)));
                if let Some(report) = controller.take_report() {
                    if let Some(tx) = &report_tx {
                        let _ = tx.send(report);
                    }
                }
            }
            signal = media_rx.recv(), if media_open => {
                match signal {
                    Some(MediaSignal::ReachedEnd) => controller.on_media_reached_end(),
                    None => media_open = false,
                }
            }
            else => break,
        }

        if exit_pending
            && controller.state() == RunState::Idle
            && run_ctx.is_none()
            && confirm_rx.is_none()
        {
            break;
        }
    }

    controller.shutdown();
    Ok(())
}
