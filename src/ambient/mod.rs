//! Ambient loop shown behind the progress ring while a run is in flight.
//!
//! The loop resource is built lazily the first time the gate allows it,
//! torn down whenever the gate refuses, and restarted from the beginning
//! each time it reports end-of-media while still wanted. End-of-media
//! signals are queued, so one can land after the loop was halted; those
//! only rewind.

mod frames;

pub use frames::{asset_search_dirs, FrameMediaSource};

use crate::gate::AnimationGate;
use crate::surface::{Transition, VisualSurface, OVERLAY_FADE, OVERLAY_HIDDEN, OVERLAY_SHOWN};

/// Name of the bundled looping asset.
pub const AMBIENT_ASSET: &str = "wave";

/// Signals raised by a playing media resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSignal {
    ReachedEnd,
}

/// Playback controls for one loaded media resource.
pub trait MediaPlayer: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to_start(&mut self);
}

/// Locates and loads media by name. `None` means the asset is unavailable,
/// which leaves the ambient loop in its degraded (silent) mode.
pub trait MediaSource: Send {
    fn open(&mut self, name: &str) -> Option<Box<dyn MediaPlayer>>;
}

/// Source that never finds anything.
pub struct NoMedia;

impl MediaSource for NoMedia {
    fn open(&mut self, _name: &str) -> Option<Box<dyn MediaPlayer>> {
        None
    }
}

pub struct AmbientLoop {
    source: Box<dyn MediaSource>,
    player: Option<Box<dyn MediaPlayer>>,
    playing: bool,
}

impl AmbientLoop {
    pub fn new(source: Box<dyn MediaSource>) -> Self {
        Self {
            source,
            player: None,
            playing: false,
        }
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.player.is_some()
    }

    /// Reveal the ambient stage and play if the gate allows it right now.
    pub fn consider_playing(&mut self, gate: &mut AnimationGate, surface: &mut dyn VisualSurface) {
        surface.animate_overlay_opacity(OVERLAY_SHOWN, Transition::over(OVERLAY_FADE));

        if !gate.should_animate() {
            self.teardown();
            return;
        }

        if self.player.is_none() {
            self.player = self.source.open(AMBIENT_ASSET);
            if self.player.is_none() {
                tracing::info!(asset = AMBIENT_ASSET, "ambient asset not found, running without animation");
            }
        }

        if let Some(player) = self.player.as_mut() {
            player.play();
            self.playing = true;
        }
    }

    /// Stop playback without touching the overlay.
    pub fn halt(&mut self) {
        self.playing = false;
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
    }

    /// Stop playback and cover the ambient stage.
    pub fn pause(&mut self, surface: &mut dyn VisualSurface) {
        self.halt();
        surface.animate_overlay_opacity(OVERLAY_HIDDEN, Transition::over(OVERLAY_FADE));
    }

    /// Standing reaction to end-of-media: loop from the top, or just rewind
    /// when playback has been stopped since.
    pub fn on_reached_end(&mut self) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        player.seek_to_start();
        if self.playing {
            player.play();
        } else {
            tracing::debug!("end of media after halt, rewound only");
        }
    }

    /// Stop and release the loaded resource, if any.
    pub fn teardown(&mut self) {
        self.playing = false;
        if let Some(mut player) = self.player.take() {
            player.pause();
            tracing::debug!("ambient loop released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FixedAudio;
    use crate::prefs::{MemoryStore, PreferenceResolver, ENABLE_ANIMATION_KEY};
    use crate::test_support::{Entry, FakeMediaSource, Journal, PlayerCall, RecordingSurface};

    fn gate(store: MemoryStore, audio_playing: bool) -> AnimationGate {
        AnimationGate::new(
            PreferenceResolver::new(Box::new(store)),
            Box::new(FixedAudio(audio_playing)),
        )
    }

    #[test]
    fn constructs_once_and_plays() {
        let journal = Journal::default();
        let mut surface = RecordingSurface::new(journal.clone());
        let mut ambient = AmbientLoop::new(Box::new(FakeMediaSource::available(journal.clone())));
        let mut gate = gate(MemoryStore::new(), false);

        ambient.consider_playing(&mut gate, &mut surface);
        ambient.consider_playing(&mut gate, &mut surface);

        assert!(ambient.is_loaded());
        assert_eq!(journal.count(|e| matches!(e, Entry::MediaOpened)), 1);
        assert_eq!(
            journal.count(|e| matches!(e, Entry::Player(PlayerCall::Play))),
            2
        );
        assert_eq!(surface.snapshot().overlay_opacity, OVERLAY_SHOWN);
    }

    #[test]
    fn refused_gate_releases_the_loop_but_keeps_overlay_shown() {
        let journal = Journal::default();
        let mut surface = RecordingSurface::new(journal.clone());
        let mut ambient = AmbientLoop::new(Box::new(FakeMediaSource::available(journal.clone())));

        ambient.consider_playing(&mut gate(MemoryStore::new(), false), &mut surface);
        assert!(ambient.is_loaded());

        ambient.consider_playing(&mut gate(MemoryStore::new(), true), &mut surface);
        assert!(!ambient.is_loaded());
        assert_eq!(
            journal.last(|e| matches!(e, Entry::Player(_))),
            Some(Entry::Player(PlayerCall::Pause))
        );
        assert_eq!(surface.snapshot().overlay_opacity, OVERLAY_SHOWN);
    }

    #[test]
    fn disabled_animation_never_opens_media() {
        let journal = Journal::default();
        let mut surface = RecordingSurface::new(journal.clone());
        let mut ambient = AmbientLoop::new(Box::new(FakeMediaSource::available(journal.clone())));
        let store = MemoryStore::new().with(ENABLE_ANIMATION_KEY, false);

        ambient.consider_playing(&mut gate(store, false), &mut surface);
        assert!(!ambient.is_loaded());
        assert_eq!(journal.count(|e| matches!(e, Entry::MediaOpened)), 0);
    }

    #[test]
    fn missing_asset_is_a_silent_no_op() {
        let journal = Journal::default();
        let mut surface = RecordingSurface::new(journal.clone());
        let mut ambient = AmbientLoop::new(Box::new(FakeMediaSource::missing(journal.clone())));

        ambient.consider_playing(&mut gate(MemoryStore::new(), false), &mut surface);
        ambient.on_reached_end();
        ambient.halt();
        assert!(!ambient.is_loaded());
        assert_eq!(journal.count(|e| matches!(e, Entry::Player(_))), 0);
    }

    #[test]
    fn end_of_media_seeks_then_plays() {
        let journal = Journal::default();
        let mut surface = RecordingSurface::new(journal.clone());
        let mut ambient = AmbientLoop::new(Box::new(FakeMediaSource::available(journal.clone())));
        ambient.consider_playing(&mut gate(MemoryStore::new(), false), &mut surface);
        journal.clear();

        ambient.on_reached_end();
        assert_eq!(
            journal.entries(),
            vec![
                Entry::Player(PlayerCall::SeekToStart),
                Entry::Player(PlayerCall::Play)
            ]
        );
    }

    #[test]
    fn end_of_media_after_halt_only_rewinds() {
        let journal = Journal::default();
        let mut surface = RecordingSurface::new(journal.clone());
        let mut ambient = AmbientLoop::new(Box::new(FakeMediaSource::available(journal.clone())));
        ambient.consider_playing(&mut gate(MemoryStore::new(), false), &mut surface);
        ambient.halt();
        journal.clear();

        ambient.on_reached_end();
        ambient.on_reached_end();
        assert_eq!(
            journal.entries(),
            vec![
                Entry::Player(PlayerCall::SeekToStart),
                Entry::Player(PlayerCall::SeekToStart)
            ]
        );

        // The next run picks the loop back up.
        ambient.consider_playing(&mut gate(MemoryStore::new(), false), &mut surface);
        ambient.on_reached_end();
        assert_eq!(
            journal.last(|e| matches!(e, Entry::Player(_))),
            Some(Entry::Player(PlayerCall::Play))
        );
    }

    #[test]
    fn end_of_media_after_pause_or_teardown_stays_quiet() {
        let journal = Journal::default();
        let mut surface = RecordingSurface::new(journal.clone());
        let mut ambient = AmbientLoop::new(Box::new(FakeMediaSource::available(journal.clone())));
        ambient.consider_playing(&mut gate(MemoryStore::new(), false), &mut surface);

        ambient.pause(&mut surface);
        journal.clear();
        ambient.on_reached_end();
        assert!(!journal.contains(&Entry::Player(PlayerCall::Play)));

        ambient.teardown();
        journal.clear();
        ambient.on_reached_end();
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn pause_covers_the_stage() {
        let journal = Journal::default();
        let mut surface = RecordingSurface::new(journal.clone());
        let mut ambient = AmbientLoop::new(Box::new(FakeMediaSource::available(journal.clone())));
        ambient.consider_playing(&mut gate(MemoryStore::new(), false), &mut surface);

        ambient.pause(&mut surface);
        assert!(ambient.is_loaded());
        assert_eq!(surface.snapshot().overlay_opacity, OVERLAY_HIDDEN);
        assert_eq!(
            journal.last(|e| matches!(e, Entry::Player(_))),
            Some(Entry::Player(PlayerCall::Pause))
        );
    }
}
