//! Yes/no confirmation before a clear.

use crate::surface::SurfaceUpdate;
use std::io::{BufRead, Write};
use tokio::sync::{mpsc::UnboundedSender, oneshot};

/// Text of the clear confirmation. Exactly two choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearPrompt {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl Default for ClearPrompt {
    fn default() -> Self {
        Self {
            title: "Warning!".into(),
            message: "Are you sure to clear all Mandarin Latin's phonetic keys?".into(),
            confirm_label: "Clear".into(),
            cancel_label: "Cancel".into(),
        }
    }
}

/// Presents a prompt and answers on `reply`. Dropping `reply` counts as cancel.
pub trait ConfirmationDialog: Send {
    fn present(&mut self, prompt: ClearPrompt, reply: oneshot::Sender<bool>);
}

/// Answers without asking (`--yes`, or a fixed answer in tests).
pub struct AutoConfirm(pub bool);

impl ConfirmationDialog for AutoConfirm {
    fn present(&mut self, prompt: ClearPrompt, reply: oneshot::Sender<bool>) {
        tracing::debug!(title = %prompt.title, answer = self.0, "auto-answering prompt");
        let _ = reply.send(self.0);
    }
}

/// Reads the answer from stdin on a blocking thread.
pub struct TerminalDialog;

impl ConfirmationDialog for TerminalDialog {
    fn present(&mut self, prompt: ClearPrompt, reply: oneshot::Sender<bool>) {
        tokio::task::spawn_blocking(move || {
            let mut err = std::io::stderr().lock();
            let _ = write!(
                err,
                "{}\n{} [{}/{}] ",
                prompt.title, prompt.message, prompt.confirm_label, prompt.cancel_label
            );
            let _ = err.flush();
            drop(err);

            let mut line = String::new();
            let confirmed = match std::io::stdin().lock().read_line(&mut line) {
                Ok(_) => is_confirmation(&line, &prompt),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read confirmation");
                    false
                }
            };
            let _ = reply.send(confirmed);
        });
    }
}

/// Hands the prompt to the TUI thread, which owns the reply.
pub struct SurfaceDialog {
    tx: UnboundedSender<SurfaceUpdate>,
}

impl SurfaceDialog {
    pub fn new(tx: UnboundedSender<SurfaceUpdate>) -> Self {
        Self { tx }
    }
}

impl ConfirmationDialog for SurfaceDialog {
    fn present(&mut self, prompt: ClearPrompt, reply: oneshot::Sender<bool>) {
        // If the UI is gone the reply is dropped with the message: a cancel.
        let _ = self.tx.send(SurfaceUpdate::Confirm { prompt, reply });
    }
}

/// Anything other than the confirm label (or y/yes) cancels.
pub fn is_confirmation(answer: &str, prompt: &ClearPrompt) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case(&prompt.confirm_label)
        || answer.eq_ignore_ascii_case("y")
        || answer.eq_ignore_ascii_case("yes")
}
