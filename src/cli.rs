use crate::ambient::{AmbientLoop, NoMedia};
use crate::audio::{AudioEnvironment, FixedAudio, PulseAudioProbe};
use crate::dialog::{AutoConfirm, ConfirmationDialog, TerminalDialog};
use crate::engine::{load_contacts, ContactListEngine, SAMPLE_CONTACTS};
use crate::gate::AnimationGate;
use crate::model::{ClearTrigger, RunConfig, UiCommand};
use crate::orchestrator::{self, ExecutionController};
use crate::prefs::{JsonFileStore, MemoryStore, PreferenceResolver, PreferenceStore};
use crate::text_summary::TextSurface;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
pub(crate) enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

/// How to decide whether other audio is playing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OtherAudio {
    /// Ask the PulseAudio/PipeWire server each time.
    #[default]
    Auto,
    /// Always report other audio as playing.
    Playing,
    /// Always report silence.
    Silent,
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "phonetic",
    version,
    about = "Add or clear Mandarin phonetic keys on a contact list, with optional TUI"
)]
pub struct Cli {
    /// Print progress lines and a text summary, then exit (no TUI)
    #[arg(long, conflicts_with = "json")]
    pub text: bool,

    /// Print a JSON report and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Add phonetic keys (default for --text/--json)
    #[arg(long, conflicts_with = "clear")]
    pub execute: bool,

    /// Clear phonetic keys; asks for confirmation unless --yes
    #[arg(long)]
    pub clear: bool,

    /// Confirm --clear without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Contact list: a JSON array of names or one name per line
    #[arg(long)]
    pub contacts: Option<PathBuf>,

    /// Delay between contacts
    #[arg(long, default_value = "40ms")]
    pub step_delay: humantime::Duration,

    /// Extra directory searched for the ambient animation
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Whether other audio counts as playing
    #[arg(long, value_enum, default_value_t = OtherAudio::Auto)]
    pub other_audio: OtherAudio,

    /// Preference file (defaults to <config dir>/phonetic/preferences.json)
    #[arg(long)]
    pub preferences: Option<PathBuf>,

    /// Persist the animation preference and exit
    #[arg(long, action = clap::ArgAction::Set)]
    pub set_animation: Option<bool>,

    /// Persist the force-animation preference and exit
    #[arg(long, action = clap::ArgAction::Set)]
    pub set_force_animation: Option<bool>,

    /// Print the current preferences and exit
    #[arg(long)]
    pub show_preferences: bool,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.text || self.json || self.is_maintenance()
    }

    fn is_maintenance(&self) -> bool {
        self.set_animation.is_some() || self.set_force_animation.is_some() || self.show_preferences
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if (args.execute || args.clear || args.yes) && !(args.text || args.json) {
        return Err(anyhow::anyhow!(
            "--execute, --clear and --yes need --text or --json; the TUI uses keys instead."
        ));
    }

    if args.is_maintenance() {
        return run_maintenance(&args);
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args).await;
        }
    }

    run_headless(args).await
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        contacts_path: args.contacts.clone(),
        step_delay: Duration::from(args.step_delay),
    }
}

pub(crate) fn build_engine(cfg: &RunConfig) -> Result<ContactListEngine> {
    let contacts = match cfg.contacts_path.as_deref() {
        Some(path) => load_contacts(path)?,
        None => SAMPLE_CONTACTS.iter().map(|s| s.to_string()).collect(),
    };
    tracing::info!(contacts = contacts.len(), "contact list loaded");
    Ok(ContactListEngine::new(contacts, cfg))
}

fn preference_path(args: &Cli) -> Option<PathBuf> {
    args.preferences.clone().or_else(JsonFileStore::default_path)
}

/// A resolver over the configured preference file, or memory if there is none.
pub(crate) fn open_preferences(args: &Cli) -> PreferenceResolver {
    let store: Box<dyn PreferenceStore> = match preference_path(args) {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => {
            tracing::warn!("no config directory, preferences will not persist");
            Box::new(MemoryStore::new())
        }
    };
    PreferenceResolver::new(store)
}

fn audio_environment(mode: OtherAudio) -> Box<dyn AudioEnvironment> {
    match mode {
        OtherAudio::Auto => Box::new(PulseAudioProbe::default()),
        OtherAudio::Playing => Box::new(FixedAudio(true)),
        OtherAudio::Silent => Box::new(FixedAudio(false)),
    }
}

pub(crate) fn build_gate(args: &Cli) -> AnimationGate {
    AnimationGate::new(open_preferences(args), audio_environment(args.other_audio))
}

fn run_maintenance(args: &Cli) -> Result<()> {
    let mut prefs = open_preferences(args);
    if let Some(enabled) = args.set_animation {
        prefs.set_animation_enabled(enabled)?;
    }
    if let Some(forced) = args.set_force_animation {
        prefs.set_force_animation_enabled(forced)?;
    }

    let path = preference_path(args);
    let mut out = std::io::stdout().lock();
    for line in crate::text_summary::build_preference_lines(prefs.flags(), path.as_deref()) {
        writeln!(out, "{line}").context("write preferences")?;
    }
    Ok(())
}

/// One run without the TUI: progress on stderr, summary or JSON on stdout.
async fn run_headless(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let engine = build_engine(&cfg)?;
    let preferences = open_preferences(&args).flags();
    let (out_tx, out_handle) = spawn_output_writer();

    let controller = ExecutionController::new(
        Box::new(TextSurface::new(out_tx.clone())),
        AmbientLoop::new(Box::new(NoMedia)),
        build_gate(&args),
        Box::new(engine),
    );
    let dialog: Box<dyn ConfirmationDialog> = if args.yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(TerminalDialog)
    };

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let (_media_tx, media_rx) = mpsc::unbounded_channel();
    let (report_tx, mut report_rx) = mpsc::unbounded_channel();

    let first = if args.clear {
        UiCommand::Clear(ClearTrigger::Tap)
    } else {
        UiCommand::Execute
    };
    let _ = cmd_tx.send(first);
    let _ = cmd_tx.send(UiCommand::Drain);

    // Ctrl-C aborts the run; the controller still plays out the completion.
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cmd_tx.send(UiCommand::Quit);
        }
    });

    let res = orchestrator::run_controller(controller, cmd_rx, media_rx, dialog, Some(report_tx)).await;
    interrupt.abort();
    res?;

    let mut reports = Vec::new();
    while let Ok(report) = report_rx.try_recv() {
        reports.push(report);
    }

    if args.json {
        let out = crate::text_summary::build_json(&cfg, preferences, &reports)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        for report in &reports {
            for line in crate::text_summary::build_report_lines(report) {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}
