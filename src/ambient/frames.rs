//! Text-frame media: `<name>.frames` files rendered by the TUI.
//!
//! Frames are separated by a line containing only `%%`. A player task
//! advances one frame per tick while playing and stops on the last frame,
//! raising [`MediaSignal::ReachedEnd`] the way a video player would.

use super::{MediaPlayer, MediaSignal, MediaSource};
use crate::surface::SurfaceUpdate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

const FRAME_SEPARATOR: &str = "%%";
const FRAME_EXTENSION: &str = "frames";

/// Directories searched for ambient assets, most specific first.
pub fn asset_search_dirs(extra: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs_out = Vec::new();
    if let Some(extra) = extra {
        dirs_out.push(extra.to_path_buf());
    }
    dirs_out.push(PathBuf::from("assets"));
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    {
        dirs_out.push(exe_dir.join("assets"));
    }
    if let Some(data) = dirs::data_dir() {
        dirs_out.push(data.join("phonetic").join("assets"));
    }
    dirs_out
}

pub(crate) fn parse_frames(raw: &str) -> Vec<String> {
    let mut frames = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in raw.lines() {
        if line.trim_end() == FRAME_SEPARATOR {
            push_frame(&mut frames, &mut current);
        } else {
            current.push(line.trim_end());
        }
    }
    push_frame(&mut frames, &mut current);
    frames
}

fn push_frame(frames: &mut Vec<String>, current: &mut Vec<&str>) {
    if current.iter().any(|l| !l.trim().is_empty()) {
        frames.push(current.join("\n"));
    }
    current.clear();
}

/// Loads `<dir>/<name>.frames` from the first directory that has it.
pub struct FrameMediaSource {
    search_dirs: Vec<PathBuf>,
    frame_interval: Duration,
    frames_tx: UnboundedSender<SurfaceUpdate>,
    signal_tx: UnboundedSender<MediaSignal>,
}

impl FrameMediaSource {
    pub fn new(
        search_dirs: Vec<PathBuf>,
        frame_interval: Duration,
        frames_tx: UnboundedSender<SurfaceUpdate>,
        signal_tx: UnboundedSender<MediaSignal>,
    ) -> Self {
        Self {
            search_dirs,
            frame_interval,
            frames_tx,
            signal_tx,
        }
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let file = format!("{name}.{FRAME_EXTENSION}");
        self.search_dirs
            .iter()
            .map(|d| d.join(&file))
            .find(|p| p.is_file())
    }
}

impl MediaSource for FrameMediaSource {
    fn open(&mut self, name: &str) -> Option<Box<dyn MediaPlayer>> {
        let path = self.locate(name)?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read ambient asset");
                return None;
            }
        };
        let frames = parse_frames(&raw);
        if frames.is_empty() {
            tracing::warn!(path = %path.display(), "ambient asset has no frames");
            return None;
        }
        tracing::debug!(path = %path.display(), frames = frames.len(), "ambient asset loaded");
        Some(Box::new(FramePlayer::spawn(
            frames,
            self.frame_interval,
            self.frames_tx.clone(),
            self.signal_tx.clone(),
        )))
    }
}

#[derive(Debug, Clone, Copy)]
enum PlayerCommand {
    Play,
    Pause,
    SeekToStart,
}

/// Handle to a frame-stepping task. Dropping it stops the task.
pub struct FramePlayer {
    ctrl_tx: UnboundedSender<PlayerCommand>,
    task: tokio::task::JoinHandle<()>,
}

impl FramePlayer {
    fn spawn(
        frames: Vec<String>,
        interval: Duration,
        frames_tx: UnboundedSender<SurfaceUpdate>,
        signal_tx: UnboundedSender<MediaSignal>,
    ) -> Self {
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(
            frames.into(),
            interval,
            ctrl_rx,
            frames_tx,
            signal_tx,
        ));
        Self { ctrl_tx, task }
    }

    fn send(&self, cmd: PlayerCommand) {
        let _ = self.ctrl_tx.send(cmd);
    }
}

impl MediaPlayer for FramePlayer {
    fn play(&mut self) {
        self.send(PlayerCommand::Play);
    }

    fn pause(&mut self) {
        self.send(PlayerCommand::Pause);
    }

    fn seek_to_start(&mut self) {
        self.send(PlayerCommand::SeekToStart);
    }
}

impl Drop for FramePlayer {
    fn drop(&mut self) {
        // Dropping a JoinHandle does not cancel the task.
        self.task.abort();
    }
}

async fn drive(
    frames: Arc<[String]>,
    interval: Duration,
    mut ctrl_rx: UnboundedReceiver<PlayerCommand>,
    frames_tx: UnboundedSender<SurfaceUpdate>,
    signal_tx: UnboundedSender<MediaSignal>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut playing = false;
    let mut position = 0usize;

    loop {
        tokio::select! {
            cmd = ctrl_rx.recv() => match cmd {
                Some(PlayerCommand::Play) => {
                    if position < frames.len() {
                        playing = true;
                    }
                }
                Some(PlayerCommand::Pause) => playing = false,
                Some(PlayerCommand::SeekToStart) => position = 0,
                None => break,
            },
            _ = ticker.tick(), if playing => {
                let _ = frames_tx.send(SurfaceUpdate::AmbientFrame(frames[position].clone()));
                position += 1;
                if position == frames.len() {
                    playing = false;
                    let _ = signal_tx.send(MediaSignal::ReachedEnd);
                }
            }
        }
    }
}
