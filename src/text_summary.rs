//! Line and JSON output for non-TUI modes.
//!
//! [`TextSurface`] turns surface calls into progress lines; the `build_*`
//! helpers format finished runs and preference listings.

use crate::cli::OutputLine;
use crate::model::{RunConfig, RunReport};
use crate::orchestrator::Outcome;
use crate::prefs::PreferenceFlags;
use crate::surface::{Transition, VisualSurface};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;

/// Visual surface for line mode: prints one stderr line per progress step.
/// Opacity and angle changes have nothing to show and are dropped.
pub(crate) struct TextSurface {
    out_tx: UnboundedSender<OutputLine>,
    output_text: String,
    last_line: Option<String>,
}

impl TextSurface {
    pub fn new(out_tx: UnboundedSender<OutputLine>) -> Self {
        Self {
            out_tx,
            output_text: String::new(),
            last_line: None,
        }
    }

    fn emit(&mut self, line: String) {
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }
        let _ = self.out_tx.send(OutputLine::Stderr(line.clone()));
        self.last_line = Some(line);
    }
}

impl VisualSurface for TextSurface {
    fn set_output_text(&mut self, text: &str) {
        self.output_text = text.to_string();
    }

    fn set_percentage_text(&mut self, text: &str) {
        let line = if self.output_text.is_empty() {
            format!("{text:>4}")
        } else {
            format!("{text:>4}  {}", self.output_text)
        };
        self.emit(line);
    }

    fn set_progress_angle(&mut self, _angle: u16) {}

    fn animate_output_opacity(&mut self, _target: f32, _transition: Transition) {}

    fn animate_progress_opacity(&mut self, _target: f32, _transition: Transition) {}

    fn animate_overlay_opacity(&mut self, _target: f32, _transition: Transition) {}

    fn set_processing(&mut self, _processing: bool) {}

    fn notify(&mut self, message: &str) {
        self.emit(message.to_string());
    }
}

/// Human-readable lines for one finished run.
pub(crate) fn build_report_lines(report: &RunReport) -> Vec<String> {
    let outcome = Outcome::from_aborted(report.aborted);
    let last = report
        .last_percentage
        .map(|p| format!("{p}%"))
        .unwrap_or_else(|| "-".into());
    vec![
        format!("Run: {}", report.direction.label()),
        format!("Outcome: {}", outcome.label()),
        format!("Progress: {last} after {} steps", report.progress_events),
        format!("Started: {}", report.started_at),
        format!("Finished: {}", report.finished_at),
    ]
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    config: &'a RunConfig,
    preferences: PreferenceFlags,
    runs: &'a [RunReport],
}

pub(crate) fn build_json(
    config: &RunConfig,
    preferences: PreferenceFlags,
    runs: &[RunReport],
) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonSummary {
        config,
        preferences,
        runs,
    })?)
}

pub(crate) fn build_preference_lines(flags: PreferenceFlags, path: Option<&Path>) -> Vec<String> {
    let mut lines = vec![
        format!("enable_animation: {}", flags.animation_enabled),
        format!("force_enable_animation: {}", flags.force_animation),
    ];
    match path {
        Some(p) => lines.push(format!("stored in: {}", p.display())),
        None => lines.push("stored in: memory (no config directory)".into()),
    }
    lines
}
