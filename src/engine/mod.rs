mod contacts;

pub use contacts::{load_contacts, ContactListEngine, SAMPLE_CONTACTS};

use crate::model::TaskEvent;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone)]
pub enum EngineControl {
    /// Stop early; the engine reports `Ended { aborted: true }`.
    Abort,
}

/// Control side of a running task.
pub struct TaskHandle {
    ctrl_tx: UnboundedSender<EngineControl>,
}

impl TaskHandle {
    pub fn new(ctrl_tx: UnboundedSender<EngineControl>) -> Self {
        Self { ctrl_tx }
    }

    pub fn abort(&self) {
        let _ = self.ctrl_tx.send(EngineControl::Abort);
    }
}

/// The contact-processing engine. Both entry points report through the same
/// three callbacks: `Began`, any number of `Progress`, then `Ended`.
pub trait ContactsEngine: Send {
    /// Add phonetic keys.
    fn execute(&self, events: UnboundedSender<TaskEvent>) -> TaskHandle;
    /// Remove phonetic keys.
    fn clear_phonetic_keys(&self, events: UnboundedSender<TaskEvent>) -> TaskHandle;
}
