use crate::dialog::ClearPrompt;
use crate::model::PressPhase;
use crate::surface::{SurfaceUpdate, Transition, OPAQUE, OVERLAY_HIDDEN};
use crossterm::event::KeyEventKind;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Terminals without key-release reporting only send repeats; a hold is
/// considered released once repeats stop for this long.
pub const RELEASE_GRACE: Duration = Duration::from_millis(600);

/// Smoothstep easing, `t` in `0..=1`.
fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// One opacity tween.
#[derive(Debug, Clone, Copy)]
struct Fade {
    from: f32,
    to: f32,
    start: Instant,
    delay: Duration,
    duration: Duration,
}

impl Fade {
    fn value_at(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.start);
        if elapsed < self.delay {
            return self.from;
        }
        let running = elapsed - self.delay;
        if self.duration.is_zero() || running >= self.duration {
            return self.to;
        }
        let t = running.as_secs_f32() / self.duration.as_secs_f32();
        self.from + (self.to - self.from) * ease_in_out(t)
    }
}

/// A value the controller animates toward.
#[derive(Debug, Clone, Copy)]
pub struct Animated {
    fade: Fade,
}

impl Animated {
    pub fn new(value: f32, now: Instant) -> Self {
        Self {
            fade: Fade {
                from: value,
                to: value,
                start: now,
                delay: Duration::ZERO,
                duration: Duration::ZERO,
            },
        }
    }

    /// Retarget from wherever the current tween is right now.
    pub fn animate_to(&mut self, target: f32, transition: Transition, now: Instant) {
        self.fade = Fade {
            from: self.value(now),
            to: target,
            start: now,
            delay: transition.delay,
            duration: transition.duration,
        };
    }

    pub fn value(&self, now: Instant) -> f32 {
        self.fade.value_at(now)
    }
}

/// Turns raw `x` key events into long-press phases.
#[derive(Debug, Default)]
pub struct PressTracker {
    last_seen: Option<Instant>,
}

impl PressTracker {
    pub fn on_key(&mut self, kind: KeyEventKind, now: Instant) -> Option<PressPhase> {
        match kind {
            KeyEventKind::Release => self.last_seen.take().map(|_| PressPhase::Ended),
            KeyEventKind::Press | KeyEventKind::Repeat => {
                let phase = if self.last_seen.is_some() {
                    PressPhase::Changed
                } else {
                    PressPhase::Began
                };
                self.last_seen = Some(now);
                Some(phase)
            }
        }
    }

    /// Ends a hold whose repeats have stopped.
    pub fn expire(&mut self, now: Instant) -> Option<PressPhase> {
        match self.last_seen {
            Some(seen) if now.saturating_duration_since(seen) >= RELEASE_GRACE => {
                self.last_seen = None;
                Some(PressPhase::Ended)
            }
            _ => None,
        }
    }
}

/// Clear prompt waiting for y/n.
pub struct PendingConfirm {
    pub prompt: ClearPrompt,
    reply: oneshot::Sender<bool>,
}

/// Everything the TUI draws. Owned by the UI thread only.
pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub output_text: String,
    pub percentage_text: String,
    pub progress_angle: u16,
    pub output_opacity: Animated,
    pub progress_opacity: Animated,
    pub overlay_opacity: Animated,
    pub processing: bool,
    pub ambient_frame: Option<String>,
    pub confirm: Option<PendingConfirm>,
    pub quitting: bool,
    pub long_press: PressTracker,
}

impl UiState {
    pub fn new(now: Instant) -> Self {
        Self {
            tab: 0,
            info: "Press r to add phonetic keys, c to clear them.".into(),
            output_text: String::new(),
            percentage_text: "0%".into(),
            progress_angle: 0,
            output_opacity: Animated::new(OPAQUE, now),
            progress_opacity: Animated::new(OPAQUE, now),
            overlay_opacity: Animated::new(OVERLAY_HIDDEN, now),
            processing: false,
            ambient_frame: None,
            confirm: None,
            quitting: false,
            long_press: PressTracker::default(),
        }
    }

    pub fn apply(&mut self, update: SurfaceUpdate, now: Instant) {
        match update {
            SurfaceUpdate::OutputText(t) => self.output_text = t,
            SurfaceUpdate::PercentageText(t) => self.percentage_text = t,
            SurfaceUpdate::ProgressAngle(a) => self.progress_angle = a.min(360),
            SurfaceUpdate::OutputOpacity { target, transition } => {
                self.output_opacity.animate_to(target, transition, now)
            }
            SurfaceUpdate::ProgressOpacity { target, transition } => {
                self.progress_opacity.animate_to(target, transition, now)
            }
            SurfaceUpdate::OverlayOpacity { target, transition } => {
                self.overlay_opacity.animate_to(target, transition, now)
            }
            SurfaceUpdate::Processing(p) => {
                self.processing = p;
                if p {
                    self.info = "Running…".into();
                } else if !self.quitting {
                    self.info = "Ready.".into();
                }
            }
            SurfaceUpdate::AmbientFrame(frame) => self.ambient_frame = Some(frame),
            SurfaceUpdate::Confirm { prompt, reply } => {
                self.confirm = Some(PendingConfirm { prompt, reply });
            }
            SurfaceUpdate::Info(message) => self.info = message,
        }
    }

    /// Answer the open prompt, if any.
    pub fn answer_confirm(&mut self, confirmed: bool) {
        if let Some(pending) = self.confirm.take() {
            let _ = pending.reply.send(confirmed);
        }
    }
}
