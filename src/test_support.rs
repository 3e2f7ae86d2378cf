//! Recording fakes for the controller's collaborators.
//!
//! Every fake writes into one shared [`Journal`] so tests can assert the
//! relative order of surface, player and engine calls.

use crate::ambient::{MediaPlayer, MediaSource};
use crate::engine::{ContactsEngine, EngineControl, TaskHandle};
use crate::model::{Direction, TaskEvent};
use crate::surface::{Transition, VisualSurface, OPAQUE, OVERLAY_HIDDEN};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    OutputText(String),
    PercentageText(String),
    ProgressAngle(u16),
    OutputOpacity(f32, Transition),
    ProgressOpacity(f32, Transition),
    OverlayOpacity(f32, Transition),
    Processing(bool),
    Notify(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCall {
    Play,
    Pause,
    SeekToStart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Surface(SurfaceCall),
    Player(PlayerCall),
    MediaOpened,
    TaskStarted(Direction),
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Entry>>>);

impl Journal {
    pub fn push(&self, entry: Entry) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Entry) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn last(&self, pred: impl Fn(&Entry) -> bool) -> Option<Entry> {
        self.0.lock().unwrap().iter().rev().find(|e| pred(e)).cloned()
    }

    pub fn position(&self, pred: impl Fn(&Entry) -> bool) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| pred(e))
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        self.0.lock().unwrap().contains(entry)
    }
}

/// Latest value of everything the controller can set.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub output_text: String,
    pub percentage_text: String,
    pub progress_angle: u16,
    pub output_opacity: f32,
    pub progress_opacity: f32,
    pub overlay_opacity: f32,
    pub processing: bool,
}

impl Default for SurfaceSnapshot {
    fn default() -> Self {
        Self {
            output_text: String::new(),
            percentage_text: String::new(),
            progress_angle: 0,
            output_opacity: OPAQUE,
            progress_opacity: OPAQUE,
            overlay_opacity: OVERLAY_HIDDEN,
            processing: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordingSurface {
    journal: Journal,
    state: Arc<Mutex<SurfaceSnapshot>>,
}

impl RecordingSurface {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: Arc::default(),
        }
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.state.lock().unwrap().clone()
    }

    fn record(&self, call: SurfaceCall, apply: impl FnOnce(&mut SurfaceSnapshot)) {
        apply(&mut self.state.lock().unwrap());
        self.journal.push(Entry::Surface(call));
    }
}

impl VisualSurface for RecordingSurface {
    fn set_output_text(&mut self, text: &str) {
        self.record(SurfaceCall::OutputText(text.into()), |s| {
            s.output_text = text.into()
        });
    }

    fn set_percentage_text(&mut self, text: &str) {
        self.record(SurfaceCall::PercentageText(text.into()), |s| {
            s.percentage_text = text.into()
        });
    }

    fn set_progress_angle(&mut self, angle: u16) {
        self.record(SurfaceCall::ProgressAngle(angle), |s| s.progress_angle = angle);
    }

    fn animate_output_opacity(&mut self, target: f32, transition: Transition) {
        self.record(SurfaceCall::OutputOpacity(target, transition), |s| {
            s.output_opacity = target
        });
    }

    fn animate_progress_opacity(&mut self, target: f32, transition: Transition) {
        self.record(SurfaceCall::ProgressOpacity(target, transition), |s| {
            s.progress_opacity = target
        });
    }

    fn animate_overlay_opacity(&mut self, target: f32, transition: Transition) {
        self.record(SurfaceCall::OverlayOpacity(target, transition), |s| {
            s.overlay_opacity = target
        });
    }

    fn set_processing(&mut self, processing: bool) {
        self.record(SurfaceCall::Processing(processing), |s| {
            s.processing = processing
        });
    }

    fn notify(&mut self, message: &str) {
        self.record(SurfaceCall::Notify(message.into()), |_| {});
    }
}

pub struct FakePlayer {
    journal: Journal,
}

impl MediaPlayer for FakePlayer {
    fn play(&mut self) {
        self.journal.push(Entry::Player(PlayerCall::Play));
    }

    fn pause(&mut self) {
        self.journal.push(Entry::Player(PlayerCall::Pause));
    }

    fn seek_to_start(&mut self) {
        self.journal.push(Entry::Player(PlayerCall::SeekToStart));
    }
}

pub struct FakeMediaSource {
    journal: Journal,
    available: bool,
}

impl FakeMediaSource {
    pub fn available(journal: Journal) -> Self {
        Self {
            journal,
            available: true,
        }
    }

    pub fn missing(journal: Journal) -> Self {
        Self {
            journal,
            available: false,
        }
    }
}

impl MediaSource for FakeMediaSource {
    fn open(&mut self, _name: &str) -> Option<Box<dyn MediaPlayer>> {
        if !self.available {
            return None;
        }
        self.journal.push(Entry::MediaOpened);
        Some(Box::new(FakePlayer {
            journal: self.journal.clone(),
        }))
    }
}

struct FakeRun {
    events: UnboundedSender<TaskEvent>,
    ctrl_rx: UnboundedReceiver<EngineControl>,
}

/// Engine whose callbacks are fired by the test.
#[derive(Clone)]
pub struct FakeEngine {
    journal: Journal,
    runs: Arc<Mutex<Vec<FakeRun>>>,
}

impl FakeEngine {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            runs: Arc::default(),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    /// Deliver an event on the most recent run's channel.
    pub fn emit(&self, event: TaskEvent) {
        let runs = self.runs.lock().unwrap();
        let run = runs.last().expect("no run started");
        let _ = run.events.send(event);
    }

    /// Close the most recent run's channel without an `Ended` event.
    pub fn vanish(&self) {
        self.runs.lock().unwrap().pop();
    }

    pub fn abort_requested(&self) -> bool {
        let mut runs = self.runs.lock().unwrap();
        runs.last_mut()
            .map(|r| matches!(r.ctrl_rx.try_recv(), Ok(EngineControl::Abort)))
            .unwrap_or(false)
    }

    fn start(&self, direction: Direction, events: UnboundedSender<TaskEvent>) -> TaskHandle {
        self.journal.push(Entry::TaskStarted(direction));
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        self.runs.lock().unwrap().push(FakeRun { events, ctrl_rx });
        TaskHandle::new(ctrl_tx)
    }
}

impl ContactsEngine for FakeEngine {
    fn execute(&self, events: UnboundedSender<TaskEvent>) -> TaskHandle {
        self.start(Direction::Forward, events)
    }

    fn clear_phonetic_keys(&self, events: UnboundedSender<TaskEvent>) -> TaskHandle {
        self.start(Direction::Rollback, events)
    }
}
