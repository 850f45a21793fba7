//! Run report.
//!
//! A [`Report`] collects what happened during a scenario run: dispatched
//! actions, free-form notes and named screenshots. Entries live in a ring
//! buffer capped at [`MAX_REPORT_ENTRIES`] and are mirrored, without
//! screenshot payloads, to a JSON Lines file when a log directory is set.

use std::collections::VecDeque;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::action::ActionRecord;

/// Maximum number of entries to retain in the ring buffer.
pub const MAX_REPORT_ENTRIES: usize = 1000;

/// One line of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportEntry {
    Action(ActionRecord),
    Note {
        id: Uuid,
        timestamp: DateTime<Utc>,
        message: String,
    },
    Screenshot {
        id: Uuid,
        timestamp: DateTime<Utc>,
        name: String,
        /// Base64-encoded PNG. Omitted from the log file.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Arc<String>>,
    },
}

impl ReportEntry {
    fn without_payload(&self) -> ReportEntry {
        match self {
            ReportEntry::Screenshot { id, timestamp, name, .. } => ReportEntry::Screenshot {
                id: *id,
                timestamp: *timestamp,
                name: name.clone(),
                data: None,
            },
            other => other.clone(),
        }
    }
}

/// Collected entries of one run.
pub struct Report {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    entries: RwLock<VecDeque<ReportEntry>>,
    log_path: Option<PathBuf>,
    log_writer: Mutex<Option<BufWriter<std::fs::File>>>,
}

impl Report {
    /// A report kept in memory only.
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// A report mirrored to `{log_dir}/{name}_{timestamp}.jsonl`.
    ///
    /// If the file cannot be created the report stays in memory and a
    /// warning is logged.
    pub fn with_log_file(log_dir: &Path, name: &str) -> Arc<Self> {
        let created_at = Utc::now();
        let path = log_dir.join(format!("{}_{}.jsonl", name, created_at.format("%Y%m%d_%H%M%S")));
        let file = std::fs::create_dir_all(log_dir).and_then(|_| std::fs::File::create(&path));
        match file {
            Ok(file) => {
                let mut report = Self::build(Some(BufWriter::new(file)));
                report.created_at = created_at;
                report.log_path = Some(path);
                Arc::new(report)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "report log file unavailable");
                Self::in_memory()
            }
        }
    }

    fn build(writer: Option<BufWriter<std::fs::File>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            entries: RwLock::new(VecDeque::with_capacity(64)),
            log_path: None,
            log_writer: Mutex::new(writer),
        }
    }

    /// Path of the JSON Lines mirror, if any.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub async fn record_action(&self, record: ActionRecord) {
        self.push(ReportEntry::Action(record)).await;
    }

    pub async fn note(&self, message: impl Into<String>) {
        self.push(ReportEntry::Note {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            message: message.into(),
        })
        .await;
    }

    pub async fn screenshot(&self, name: impl Into<String>, data: Arc<String>) {
        self.push(ReportEntry::Screenshot {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            name: name.into(),
            data: Some(data),
        })
        .await;
    }

    async fn push(&self, entry: ReportEntry) {
        {
            let mut writer_guard = self.log_writer.lock().await;
            if let Some(ref mut writer) = *writer_guard {
                if let Ok(json) = serde_json::to_string(&entry.without_payload()) {
                    let _ = writeln!(writer, "{}", json);
                    let _ = writer.flush();
                }
            }
        }

        let mut entries = self.entries.write().await;
        if entries.len() >= MAX_REPORT_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// All retained entries in chronological order.
    pub async fn entries(&self) -> Vec<ReportEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Retained action records only.
    pub async fn actions(&self) -> Vec<ActionRecord> {
        self.entries
            .read()
            .await
            .iter()
            .filter_map(|e| match e {
                ReportEntry::Action(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Writes every retained entry, without screenshot payloads, to `path`.
    pub async fn export_jsonl(&self, path: &Path) -> std::io::Result<()> {
        let mut out = BufWriter::new(std::fs::File::create(path)?);
        for entry in self.entries.read().await.iter() {
            let json = serde_json::to_string(&entry.without_payload())
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(out, "{}", json)?;
        }
        out.flush()
    }
}

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Report")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("entries", &"<RwLock<VecDeque<ReportEntry>>>")
            .field("log_path", &self.log_path)
            .finish()
    }
}
