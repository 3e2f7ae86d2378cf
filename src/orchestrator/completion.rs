//! Fixed completion timeline played once per finished run.
//!
//! Each phase is applied to the surface, then the runner waits for that
//! phase's animation to settle before the next one starts. The last phase
//! resets the surface to the idle baseline, so every timeline ends clean no
//! matter how the run ended.

use crate::surface::{
    Transition, VisualSurface, OPAQUE, OVERLAY_FADE, OVERLAY_HIDDEN, TRANSPARENT,
};
use std::time::Duration;

/// Output opacity while the outcome word is on screen.
pub const OUTCOME_OPACITY: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Aborted,
}

impl Outcome {
    pub fn from_aborted(aborted: bool) -> Self {
        if aborted {
            Outcome::Aborted
        } else {
            Outcome::Completed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Completed => "Completed",
            Outcome::Aborted => "Aborted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAction {
    /// Fade the output text out.
    HideOutput,
    /// Swap in the outcome word and fade it up to [`OUTCOME_OPACITY`].
    RevealOutcome,
    /// Hold, then fade the output text and the progress ring out.
    FadeAll,
    /// Restore the idle baseline.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionPhase {
    pub action: PhaseAction,
    pub transition: Transition,
}

pub const COMPLETION_TIMELINE: [CompletionPhase; 4] = [
    CompletionPhase {
        action: PhaseAction::HideOutput,
        transition: Transition::over(Duration::from_millis(100)),
    },
    CompletionPhase {
        action: PhaseAction::RevealOutcome,
        transition: Transition::over(Duration::from_millis(1200)),
    },
    CompletionPhase {
        action: PhaseAction::FadeAll,
        transition: Transition::over(Duration::from_millis(900))
            .after(Duration::from_millis(700)),
    },
    CompletionPhase {
        action: PhaseAction::Reset,
        transition: Transition::IMMEDIATE,
    },
];

/// Result of advancing the timeline by one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStep {
    /// Call [`CompletionSequencer::advance`] again after this long.
    Wait(Duration),
    /// The reset phase has been applied.
    Finished,
}

#[derive(Debug)]
pub struct CompletionSequencer {
    outcome: Outcome,
    next: usize,
}

impl CompletionSequencer {
    pub fn new(outcome: Outcome) -> Self {
        Self { outcome, next: 0 }
    }

    /// Apply the next phase. Calling again after `Finished` does nothing.
    pub fn advance(&mut self, surface: &mut dyn VisualSurface) -> PhaseStep {
        let Some(phase) = COMPLETION_TIMELINE.get(self.next).copied() else {
            return PhaseStep::Finished;
        };
        self.next += 1;
        tracing::debug!(action = ?phase.action, outcome = ?self.outcome, "completion phase");

        let t = phase.transition;
        match phase.action {
            PhaseAction::HideOutput => surface.animate_output_opacity(TRANSPARENT, t),
            PhaseAction::RevealOutcome => {
                surface.set_output_text(self.outcome.label());
                surface.animate_output_opacity(OUTCOME_OPACITY, t);
            }
            PhaseAction::FadeAll => {
                surface.animate_output_opacity(TRANSPARENT, t);
                surface.animate_progress_opacity(TRANSPARENT, t);
            }
            PhaseAction::Reset => {
                surface.set_output_text("");
                surface.animate_output_opacity(OPAQUE, t);
                surface.animate_progress_opacity(OPAQUE, t);
                surface.animate_overlay_opacity(OVERLAY_HIDDEN, Transition::over(OVERLAY_FADE));
            }
        }

        if self.next == COMPLETION_TIMELINE.len() {
            PhaseStep::Finished
        } else {
            PhaseStep::Wait(t.total())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Entry, Journal, RecordingSurface, SurfaceCall};

    fn run_to_end(seq: &mut CompletionSequencer, surface: &mut RecordingSurface) -> Vec<PhaseStep> {
        let mut steps = Vec::new();
        loop {
            let step = seq.advance(surface);
            steps.push(step);
            if step == PhaseStep::Finished {
                return steps;
            }
        }
    }

    #[test]
    fn waits_match_the_timeline() {
        let mut surface = RecordingSurface::new(Journal::default());
        let mut seq = CompletionSequencer::new(Outcome::Completed);
        assert_eq!(
            run_to_end(&mut seq, &mut surface),
            vec![
                PhaseStep::Wait(Duration::from_millis(100)),
                PhaseStep::Wait(Duration::from_millis(1200)),
                PhaseStep::Wait(Duration::from_millis(1600)),
                PhaseStep::Finished,
            ]
        );
        assert_eq!(seq.advance(&mut surface), PhaseStep::Finished);
    }

    #[test]
    fn both_outcomes_end_at_the_idle_baseline() {
        for outcome in [Outcome::Completed, Outcome::Aborted] {
            let mut surface = RecordingSurface::new(Journal::default());
            surface.set_output_text("Zhāng Sān");
            surface.animate_overlay_opacity(1.0, Transition::IMMEDIATE);

            let mut seq = CompletionSequencer::new(outcome);
            run_to_end(&mut seq, &mut surface);

            let snap = surface.snapshot();
            assert_eq!(snap.output_text, "");
            assert_eq!(snap.output_opacity, OPAQUE);
            assert_eq!(snap.progress_opacity, OPAQUE);
            assert_eq!(snap.overlay_opacity, OVERLAY_HIDDEN);
        }
    }

    #[test]
    fn outcome_word_is_shown_at_partial_opacity() {
        for (aborted, word) in [(false, "Completed"), (true, "Aborted")] {
            let journal = Journal::default();
            let mut surface = RecordingSurface::new(journal.clone());
            let mut seq = CompletionSequencer::new(Outcome::from_aborted(aborted));
            seq.advance(&mut surface);
            seq.advance(&mut surface);

            let snap = surface.snapshot();
            assert_eq!(snap.output_text, word);
            assert_eq!(snap.output_opacity, OUTCOME_OPACITY);
            assert!(journal.contains(&Entry::Surface(SurfaceCall::OutputText(word.into()))));
        }
    }

    #[test]
    fn text_is_swapped_only_after_the_fade_out_phase() {
        let journal = Journal::default();
        let mut surface = RecordingSurface::new(journal.clone());
        let mut seq = CompletionSequencer::new(Outcome::Completed);
        seq.advance(&mut surface);
        assert_eq!(
            journal.entries(),
            vec![Entry::Surface(SurfaceCall::OutputOpacity(
                TRANSPARENT,
                Transition::over(Duration::from_millis(100))
            ))]
        );
    }
}
