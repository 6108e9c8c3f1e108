//! Append-only JSONL audit sink
//!
//! One JSON object per line, appended to a log file the operator points the
//! gateway at. A failed append is reported on the diagnostic log channel and
//! swallowed: the audit trail must never take a remote call down with it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use suitegate_core::AuditSink;
use suitegate_domain::AuditRecord;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::error;

/// File-backed audit sink writing one JSON record per line.
#[derive(Debug, Clone)]
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    /// Sink appending to the file at `path`. The file is created on first
    /// write; existing content is never touched.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path the sink appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: &AuditRecord) -> std::io::Result<()> {
        let json = serde_json::to_string(record)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{json}\n").as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, record: AuditRecord) {
        if let Err(err) = self.append(&record).await {
            error!(
                path = %self.path.display(),
                operation = %record.operation,
                error = %err,
                "failed to append audit record"
            );
        }
    }
}
