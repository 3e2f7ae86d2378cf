//! Control contract for whatever draws the run: label text, ring angle, and
//! three animated opacities (output text, progress ring, ambient overlay).
//!
//! Setters are fire-and-forget. Animated setters describe the target value
//! and the timing; the surface is responsible for tweening toward it.

use crate::dialog::ClearPrompt;
use std::time::Duration;
use tokio::sync::{mpsc::UnboundedSender, oneshot};

pub const OPAQUE: f32 = 1.0;
pub const TRANSPARENT: f32 = 0.0;

/// Overlay opacity that exposes the ambient stage.
pub const OVERLAY_SHOWN: f32 = 1.0;
/// Overlay opacity that covers the ambient stage.
pub const OVERLAY_HIDDEN: f32 = 0.0;
pub const OVERLAY_FADE: Duration = Duration::from_millis(1200);

/// Duration/delay pair for an animated setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub duration: Duration,
    pub delay: Duration,
}

impl Transition {
    pub const IMMEDIATE: Transition = Transition {
        duration: Duration::ZERO,
        delay: Duration::ZERO,
    };

    pub const fn over(duration: Duration) -> Self {
        Self {
            duration,
            delay: Duration::ZERO,
        }
    }

    pub const fn after(self, delay: Duration) -> Self {
        Self {
            duration: self.duration,
            delay,
        }
    }

    /// Time from the call until the animation has settled.
    pub fn total(&self) -> Duration {
        self.delay + self.duration
    }
}

pub trait VisualSurface: Send {
    fn set_output_text(&mut self, text: &str);
    fn set_percentage_text(&mut self, text: &str);
    /// Whole degrees, `0..=360`.
    fn set_progress_angle(&mut self, angle: u16);
    fn animate_output_opacity(&mut self, target: f32, transition: Transition);
    fn animate_progress_opacity(&mut self, target: f32, transition: Transition);
    fn animate_overlay_opacity(&mut self, target: f32, transition: Transition);
    /// Mirrors the controller's processing flag so the UI can refuse input.
    fn set_processing(&mut self, processing: bool);
    /// One-line status for the user. Surfaces without a status area ignore it.
    fn notify(&mut self, _message: &str) {}
}

/// Messages consumed by the TUI thread.
#[derive(Debug)]
pub enum SurfaceUpdate {
    OutputText(String),
    PercentageText(String),
    ProgressAngle(u16),
    OutputOpacity { target: f32, transition: Transition },
    ProgressOpacity { target: f32, transition: Transition },
    OverlayOpacity { target: f32, transition: Transition },
    Processing(bool),
    /// Next frame of the ambient loop.
    AmbientFrame(String),
    /// Ask the user to confirm a clear; the answer goes back on `reply`.
    Confirm {
        prompt: ClearPrompt,
        reply: oneshot::Sender<bool>,
    },
    /// Free-form status line.
    Info(String),
}

/// Forwards every call to the TUI thread. A closed channel means the UI is
/// gone; updates are dropped silently in that case.
pub struct ChannelSurface {
    tx: UnboundedSender<SurfaceUpdate>,
}

impl ChannelSurface {
    pub fn new(tx: UnboundedSender<SurfaceUpdate>) -> Self {
        Self { tx }
    }

    fn send(&self, update: SurfaceUpdate) {
        let _ = self.tx.send(update);
    }
}

impl VisualSurface for ChannelSurface {
    fn set_output_text(&mut self, text: &str) {
        self.send(SurfaceUpdate::OutputText(text.to_string()));
    }

    fn set_percentage_text(&mut self, text: &str) {
        self.send(SurfaceUpdate::PercentageText(text.to_string()));
    }

    fn set_progress_angle(&mut self, angle: u16) {
        self.send(SurfaceUpdate::ProgressAngle(angle));
    }

    fn animate_output_opacity(&mut self, target: f32, transition: Transition) {
        self.send(SurfaceUpdate::OutputOpacity { target, transition });
    }

    fn animate_progress_opacity(&mut self, target: f32, transition: Transition) {
        self.send(SurfaceUpdate::ProgressOpacity { target, transition });
    }

    fn animate_overlay_opacity(&mut self, target: f32, transition: Transition) {
        self.send(SurfaceUpdate::OverlayOpacity { target, transition });
    }

    fn set_processing(&mut self, processing: bool) {
        self.send(SurfaceUpdate::Processing(processing));
    }

    fn notify(&mut self, message: &str) {
        self.send(SurfaceUpdate::Info(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn transition_total_includes_delay() {
        let t = Transition::over(Duration::from_millis(900)).after(Duration::from_millis(700));
        assert_eq!(t.total(), Duration::from_millis(1600));
        assert_eq!(Transition::IMMEDIATE.total(), Duration::ZERO);
    }

    #[test]
    fn channel_surface_forwards_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut surface = ChannelSurface::new(tx);
        surface.set_percentage_text("37%");
        surface.set_progress_angle(133);
        surface.animate_overlay_opacity(OVERLAY_SHOWN, Transition::over(OVERLAY_FADE));

        assert!(matches!(rx.try_recv(), Ok(SurfaceUpdate::PercentageText(t)) if t == "37%"));
        assert!(matches!(rx.try_recv(), Ok(SurfaceUpdate::ProgressAngle(133))));
        assert!(matches!(
            rx.try_recv(),
            Ok(SurfaceUpdate::OverlayOpacity { target, .. }) if target == OVERLAY_SHOWN
        ));
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut surface = ChannelSurface::new(tx);
        surface.set_output_text("still fine");
        surface.set_processing(false);
    }
}
