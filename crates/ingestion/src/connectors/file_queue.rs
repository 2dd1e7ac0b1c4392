//! Drop-box directory consumer
//!
//! Drains JSONL files from an inbox directory: each file holds one
//! `PointMessage` JSON object per line. A file is deleted only after every
//! parseable line has been delivered, so an unprocessed file survives a
//! restart. Acts as a local stand-in for a message-queue subscription.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_channel::Sender;
use contracts::{ContractError, PointMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connector::{send_or_cancelled, Connector};
use crate::error::Result;

use super::param_duration_ms;

/// File-queue configuration
#[derive(Debug, Clone)]
pub struct FileQueueConfig {
    /// Inbox directory to poll
    pub inbox: PathBuf,

    /// Poll interval when the inbox is empty
    pub poll_interval: Duration,
}

/// Drop-box connector
pub struct FileQueueConnector {
    name: String,
    config: FileQueueConfig,
}

impl FileQueueConnector {
    /// Create with explicit configuration
    pub fn new(name: impl Into<String>, config: FileQueueConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Create from a config params map.
    ///
    /// Recognized params: `inbox` (required), `poll_ms`.
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::result::Result<Self, ContractError> {
        let inbox = params
            .get("inbox")
            .map(PathBuf::from)
            .ok_or_else(|| ContractError::config_validation("inbox", "missing required param"))?;
        Ok(Self::new(
            name,
            FileQueueConfig {
                inbox,
                poll_interval: param_duration_ms(params, "poll_ms", Duration::from_millis(500))?,
            },
        ))
    }

    /// Inbox files in deterministic (name) order.
    async fn pending_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.config.inbox).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_jsonl = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "jsonl" || e == "json");
            if is_jsonl && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Deliver one file; returns false when shutdown interrupted the send.
    async fn drain_file(
        &self,
        path: &PathBuf,
        output: &Sender<PointMessage>,
        cancel: &CancellationToken,
    ) -> std::result::Result<bool, std::io::Error> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut delivered = 0usize;
        let mut skipped = 0usize;

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PointMessage>(line) {
                Ok(message) => {
                    if !send_or_cancelled(output, cancel, message).await {
                        return Ok(false);
                    }
                    delivered += 1;
                }
                Err(e) => {
                    skipped += 1;
                    warn!(
                        connector = %self.name,
                        file = %path.display(),
                        error = %e,
                        "skipping unparseable line"
                    );
                }
            }
        }

        tokio::fs::remove_file(path).await?;
        debug!(
            connector = %self.name,
            file = %path.display(),
            delivered,
            skipped,
            "inbox file drained"
        );
        Ok(true)
    }
}

impl Connector for FileQueueConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(self, output: Sender<PointMessage>, cancel: CancellationToken) -> Result<()> {
        debug!(connector = %self.name, inbox = %self.config.inbox.display(), "file queue started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.pending_files().await {
                Ok(files) => {
                    for path in files {
                        match self.drain_file(&path, &output, &cancel).await {
                            Ok(true) => {}
                            Ok(false) => {
                                debug!(connector = %self.name, "file queue cancelled mid-file");
                                return Ok(());
                            }
                            Err(e) => {
                                // File stays in place; retried next poll
                                warn!(
                                    connector = %self.name,
                                    file = %path.display(),
                                    error = %e,
                                    "failed to drain inbox file"
                                );
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(connector = %self.name, error = %e, "failed to read inbox directory");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        debug!(connector = %self.name, "file queue stopped");
        Ok(())
    }
}
