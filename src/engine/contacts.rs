use super::{ContactsEngine, EngineControl, TaskHandle};
use crate::model::{Direction, RunConfig, TaskEvent};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Used when no contact list is given.
pub const SAMPLE_CONTACTS: &[&str] = &[
    "Ā Lán", "Bái Xuě", "Cài Wén", "Chén Jìng", "Dèng Lì", "Fāng Yuán", "Gāo Fēi", "Guō Míng",
    "Hán Mèi", "Hú Jūn", "Jiāng Tāo", "Kǒng Lín", "Lǐ Huá", "Liú Yáng", "Lù Yǔ", "Mǎ Chāo",
    "Qián Lì", "Sūn Hào", "Táng Níng", "Wáng Fāng", "Wú Dí", "Xú Qīng", "Yáng Guò", "Zhāng Sān",
];

/// Reads a contact list: a JSON array of strings, or one name per line.
pub fn load_contacts(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read contact list {}", path.display()))?;
    parse_contacts(&raw).with_context(|| format!("parse contact list {}", path.display()))
}

fn parse_contacts(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        let names: Vec<String> = serde_json::from_str(trimmed)?;
        return Ok(names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect());
    }
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Walks a contact list, reporting one progress step per contact.
///
/// The phonetic work itself is out of this crate's hands; each step reports
/// the contact it touched as the result text.
pub struct ContactListEngine {
    contacts: Arc<Vec<String>>,
    step_delay: Duration,
}

impl ContactListEngine {
    pub fn new(contacts: Vec<String>, cfg: &RunConfig) -> Self {
        Self {
            contacts: Arc::new(contacts),
            step_delay: cfg.step_delay,
        }
    }

    fn spawn_run(&self, direction: Direction, events: UnboundedSender<TaskEvent>) -> TaskHandle {
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel::<EngineControl>();
        let contacts = self.contacts.clone();
        let step_delay = self.step_delay;
        tokio::spawn(async move {
            let aborted = walk(&contacts, step_delay, &events, ctrl_rx).await;
            tracing::debug!(?direction, aborted, "contact walk finished");
            let _ = events.send(TaskEvent::Ended { aborted });
        });
        TaskHandle::new(ctrl_tx)
    }
}

/// Returns whether the walk was aborted.
async fn walk(
    contacts: &[String],
    step_delay: Duration,
    events: &UnboundedSender<TaskEvent>,
    mut ctrl_rx: UnboundedReceiver<EngineControl>,
) -> bool {
    let _ = events.send(TaskEvent::Began);

    let total = contacts.len();
    if total == 0 {
        let _ = events.send(TaskEvent::Progress {
            text: String::new(),
            percentage: 100,
        });
        return false;
    }

    for (i, name) in contacts.iter().enumerate() {
        tokio::select! {
            biased;
            Some(EngineControl::Abort) = ctrl_rx.recv() => return true,
            _ = tokio::time::sleep(step_delay) => {}
        }
        let percentage = ((i + 1) * 100 / total) as u32;
        let _ = events.send(TaskEvent::Progress {
            text: name.clone(),
            percentage,
        });
    }
    false
}

impl ContactsEngine for ContactListEngine {
    fn execute(&self, events: UnboundedSender<TaskEvent>) -> TaskHandle {
        self.spawn_run(Direction::Forward, events)
    }

    fn clear_phonetic_keys(&self, events: UnboundedSender<TaskEvent>) -> TaskHandle {
        self.spawn_run(Direction::Rollback, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(names: &[&str]) -> ContactListEngine {
        ContactListEngine::new(
            names.iter().map(|s| s.to_string()).collect(),
            &RunConfig {
                contacts_path: None,
                step_delay: Duration::from_millis(50),
            },
        )
    }

    async fn collect(mut rx: UnboundedReceiver<TaskEvent>) -> Vec<TaskEvent> {
        let mut out = Vec::new();
        while let Some(ev) = rx.recv().await {
            let done = matches!(ev, TaskEvent::Ended { .. });
            out.push(ev);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn parses_json_and_lines() {
        assert_eq!(
            parse_contacts(r#"[" Zhāng Sān ", "", "Lǐ Sì"]"#).unwrap(),
            vec!["Zhāng Sān", "Lǐ Sì"]
        );
        assert_eq!(
            parse_contacts("Zhāng Sān\n\n  Lǐ Sì  \n").unwrap(),
            vec!["Zhāng Sān", "Lǐ Sì"]
        );
        assert!(parse_contacts("[1, 2]").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reports_one_step_per_contact() {
        let (tx, rx) = mpsc::unbounded_channel();
        let _handle = engine(&["a", "b", "c"]).execute(tx);
        let events = collect(rx).await;
        assert_eq!(
            events,
            vec![
                TaskEvent::Began,
                TaskEvent::Progress {
                    text: "a".into(),
                    percentage: 33
                },
                TaskEvent::Progress {
                    text: "b".into(),
                    percentage: 66
                },
                TaskEvent::Progress {
                    text: "c".into(),
                    percentage: 100
                },
                TaskEvent::Ended { aborted: false },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_list_completes_at_full() {
        let (tx, rx) = mpsc::unbounded_channel();
        let _handle = engine(&[]).clear_phonetic_keys(tx);
        let events = collect(rx).await;
        assert_eq!(
            events,
            vec![
                TaskEvent::Began,
                TaskEvent::Progress {
                    text: String::new(),
                    percentage: 100
                },
                TaskEvent::Ended { aborted: false },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn abort_ends_the_walk_early() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = engine(&["a", "b", "c", "d"]).execute(tx);

        assert_eq!(rx.recv().await, Some(TaskEvent::Began));
        assert!(matches!(
            rx.recv().await,
            Some(TaskEvent::Progress { percentage: 25, .. })
        ));
        handle.abort();

        let rest = collect(rx).await;
        assert_eq!(rest.last(), Some(&TaskEvent::Ended { aborted: true }));
        assert!(rest.len() <= 2, "{rest:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_does_not_abort() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(engine(&["a", "b"]).execute(tx));
        let events = collect(rx).await;
        assert_eq!(events.last(), Some(&TaskEvent::Ended { aborted: false }));
    }
}
