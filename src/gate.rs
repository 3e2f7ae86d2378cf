//! Whether the ambient loop may run right now.

use crate::audio::AudioEnvironment;
use crate::prefs::PreferenceResolver;

/// Inputs to one gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateInputs {
    pub animation_enabled: bool,
    pub force_animation: bool,
    pub other_audio_playing: bool,
}

/// Animation must be enabled, and either forced or not competing with other audio.
pub fn should_animate(inputs: GateInputs) -> bool {
    inputs.animation_enabled && (inputs.force_animation || !inputs.other_audio_playing)
}

/// Live gate. Every call re-reads preferences and the audio state.
pub struct AnimationGate {
    prefs: PreferenceResolver,
    audio: Box<dyn AudioEnvironment>,
}

impl AnimationGate {
    pub fn new(prefs: PreferenceResolver, audio: Box<dyn AudioEnvironment>) -> Self {
        Self { prefs, audio }
    }

    pub fn should_animate(&mut self) -> bool {
        let animation_enabled = self.prefs.is_animation_enabled();
        let force_animation = self.prefs.is_force_animation_enabled();
        // Audio only matters when enabled and not forced; skip the probe otherwise.
        let other_audio_playing =
            animation_enabled && !force_animation && self.audio.other_audio_playing();
        let inputs = GateInputs {
            animation_enabled,
            force_animation,
            other_audio_playing,
        };
        let verdict = should_animate(inputs);
        tracing::debug!(?inputs, verdict, "animation gate");
        verdict
    }
}
