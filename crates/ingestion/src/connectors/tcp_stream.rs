//! TCP stream consumer
//!
//! Connects to a line-delimited JSON telemetry feed and pushes each parsed
//! `PointMessage` into the pipeline. Reconnects with capped exponential
//! backoff; gives up after the retry budget is exhausted.

use std::collections::HashMap;
use std::time::Duration;

use async_channel::Sender;
use contracts::{ContractError, PointMessage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connector::{send_or_cancelled, Connector};
use crate::error::{IngestionError, Result};

use super::param_duration_ms;

const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 10;

/// TCP stream configuration
#[derive(Debug, Clone)]
pub struct TcpStreamConfig {
    /// Remote feed address, `host:port`
    pub addr: String,

    /// First reconnect delay; doubles per consecutive failure
    pub initial_backoff: Duration,

    /// Backoff cap
    pub max_backoff: Duration,

    /// Consecutive connection failures tolerated before giving up
    pub max_retries: u32,
}

/// TCP feed connector
pub struct TcpStreamConnector {
    name: String,
    config: TcpStreamConfig,
}

impl TcpStreamConnector {
    /// Create with explicit configuration
    pub fn new(name: impl Into<String>, config: TcpStreamConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Create from a config params map.
    ///
    /// Recognized params: `addr` (required), `initial_backoff_ms`,
    /// `max_backoff_ms`, `max_retries`.
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::result::Result<Self, ContractError> {
        let addr = params
            .get("addr")
            .cloned()
            .ok_or_else(|| ContractError::config_validation("addr", "missing required param"))?;
        let max_retries = match params.get("max_retries") {
            None => DEFAULT_MAX_RETRIES,
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ContractError::config_validation("max_retries", format!("invalid count '{raw}'"))
            })?,
        };
        Ok(Self::new(
            name,
            TcpStreamConfig {
                addr,
                initial_backoff: param_duration_ms(
                    params,
                    "initial_backoff_ms",
                    DEFAULT_INITIAL_BACKOFF,
                )?,
                max_backoff: param_duration_ms(params, "max_backoff_ms", DEFAULT_MAX_BACKOFF)?,
                max_retries,
            },
        ))
    }

    /// Read one connection until EOF, error or cancellation.
    ///
    /// Returns true when the caller should reconnect.
    async fn consume_stream(
        &self,
        stream: TcpStream,
        output: &Sender<PointMessage>,
        cancel: &CancellationToken,
    ) -> bool {
        let mut lines = BufReader::new(stream).lines();
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => return false,
                line = lines.next_line() => line,
            };
            match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<PointMessage>(&line) {
                        Ok(message) => {
                            if !send_or_cancelled(output, cancel, message).await {
                                return false;
                            }
                        }
                        Err(e) => {
                            warn!(connector = %self.name, error = %e, "skipping unparseable line");
                        }
                    }
                }
                Ok(None) => {
                    debug!(connector = %self.name, "feed closed (EOF)");
                    return true;
                }
                Err(e) => {
                    warn!(connector = %self.name, error = %e, "read error on feed");
                    return true;
                }
            }
        }
    }
}

impl Connector for TcpStreamConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(self, output: Sender<PointMessage>, cancel: CancellationToken) -> Result<()> {
        let mut backoff = self.config.initial_backoff;
        let mut failures: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let connect = tokio::select! {
                _ = cancel.cancelled() => break,
                connect = TcpStream::connect(&self.config.addr) => connect,
            };

            match connect {
                Ok(stream) => {
                    info!(connector = %self.name, addr = %self.config.addr, "connected to feed");
                    failures = 0;
                    backoff = self.config.initial_backoff;
                    if !self.consume_stream(stream, &output, &cancel).await {
                        break;
                    }
                    // Disconnected; fall through to reconnect without
                    // counting it against the retry budget
                }
                Err(e) => {
                    failures += 1;
                    if failures > self.config.max_retries {
                        return Err(IngestionError::SourceExhausted {
                            connector: self.name.clone(),
                            message: format!(
                                "giving up on {} after {} attempts: {e}",
                                self.config.addr, failures
                            ),
                        });
                    }
                    warn!(
                        connector = %self.name,
                        addr = %self.config.addr,
                        attempt = failures,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "connect failed, backing off"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
            }
        }

        debug!(connector = %self.name, "tcp stream stopped");
        Ok(())
    }
}
