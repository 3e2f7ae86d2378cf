//! Live "is something else playing audio" signal.

use std::process::Command;

/// Queried synchronously at each gate decision; implementations must not cache.
pub trait AudioEnvironment: Send {
    fn other_audio_playing(&self) -> bool;
}

/// Answers the same thing every time. Used for `--other-audio playing|silent`.
#[derive(Debug, Clone, Copy)]
pub struct FixedAudio(pub bool);

impl AudioEnvironment for FixedAudio {
    fn other_audio_playing(&self) -> bool {
        self.0
    }
}

/// Asks the PulseAudio/PipeWire server for active sink inputs.
///
/// Any failure (missing `pactl`, no server, non-zero exit) reads as "nothing
/// playing" so the ambient loop is never blocked by a broken probe.
#[derive(Debug, Clone)]
pub struct PulseAudioProbe {
    program: String,
}

impl Default for PulseAudioProbe {
    fn default() -> Self {
        Self {
            program: "pactl".into(),
        }
    }
}

impl PulseAudioProbe {
    #[cfg(test)]
    fn with_program(program: &str) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl AudioEnvironment for PulseAudioProbe {
    fn other_audio_playing(&self) -> bool {
        let output = match Command::new(&self.program)
            .args(["list", "short", "sink-inputs"])
            .output()
        {
            Ok(o) => o,
            Err(e) => {
                tracing::debug!(program = %self.program, error = %e, "audio probe unavailable");
                return false;
            }
        };
        if !output.status.success() {
            tracing::debug!(status = %output.status, "audio probe failed");
            return false;
        }
        has_sink_inputs(&String::from_utf8_lossy(&output.stdout))
    }
}

/// `pactl list short sink-inputs` prints one line per active stream.
fn has_sink_inputs(listing: &str) -> bool {
    listing.lines().any(|l| !l.trim().is_empty())
}
