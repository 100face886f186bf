//! Append-only audit log for dispatched calls and admission rejections.
//!
//! Entries are fire-and-forget: the caller never waits on the writer and
//! nothing in the gateway ever reads them back.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;

/// One audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// UTC timestamp, serialized as RFC 3339.
    pub timestamp: DateTime<Utc>,
    /// Resolved client IP (or `local` on the stdio transport).
    pub client_ip: String,
    /// Tool name or rejection tag (e.g. `invalid_path_get_note`).
    pub action: String,
    /// Request path or note path, when one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub outcome: AuditOutcome,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failed,
}

/// Audit sink. When disabled every call is a no-op.
///
/// When enabled, entries go to a background task appending JSONL under the
/// data directory, and each entry also emits a structured tracing line
/// under the `audit` target for log-router filtering.
pub struct AuditLog {
    tx: Option<mpsc::UnboundedSender<AuditEntry>>,
}

impl AuditLog {
    /// Create an audit log honoring the `ENABLE_AUDIT_LOG` environment
    /// flag: anything other than `true` yields a disabled sink.
    pub fn from_env(log_dir: PathBuf) -> Self {
        match std::env::var("ENABLE_AUDIT_LOG").as_deref() {
            Ok("true") => Self::new(log_dir),
            _ => Self::disabled(),
        }
    }

    /// Create an enabled audit log writing `audit.jsonl` under `log_dir`.
    /// Spawns the background writer task.
    pub fn new(log_dir: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEntry>();

        tokio::spawn(async move {
            let _ = tokio::fs::create_dir_all(&log_dir).await;
            let log_file = log_dir.join("audit.jsonl");

            while let Some(entry) = rx.recv().await {
                if let Ok(line) = serde_json::to_string(&entry) {
                    let open = tokio::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&log_file)
                        .await;
                    if let Ok(mut file) = open {
                        use tokio::io::AsyncWriteExt;
                        let _ = file.write_all(format!("{line}\n").as_bytes()).await;
                    }
                }
            }
        });

        Self { tx: Some(tx) }
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Record one action. Never blocks, never fails.
    pub fn record(
        &self,
        client_ip: impl Into<String>,
        action: impl Into<String>,
        outcome: AuditOutcome,
        path: Option<String>,
    ) {
        let Some(tx) = &self.tx else {
            return;
        };
        let entry = AuditEntry {
            timestamp: Utc::now(),
            client_ip: client_ip.into(),
            action: action.into(),
            path,
            outcome,
        };
        info!(
            target: "audit",
            client_ip = %entry.client_ip,
            action = %entry.action,
            outcome = ?entry.outcome,
            "audit"
        );
        let _ = tx.send(entry);
    }
}
