//! Connector trait - source-specific adapter feeding the shared queue

use async_channel::Sender;
use contracts::PointMessage;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// A telemetry source adapter.
///
/// One connector per external source. Runs until cancelled or the source is
/// exhausted; pushes normalized messages into the shared bounded queue.
/// Sends must observe the cancellation token so a full queue never starves
/// shutdown. Failure of one connector must not stop others; the coordinator
/// logs the error and lets the task end.
#[trait_variant::make(Connector: Send)]
pub trait LocalConnector {
    /// Connector name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Run the connector until cancellation or source exhaustion.
    ///
    /// # Errors
    /// Returns the terminal source error after internal retry policy
    /// (if any) has given up. Cancellation is not an error.
    async fn run(self, output: Sender<PointMessage>, cancel: CancellationToken) -> Result<()>;
}

/// Push one message, racing the cancellation token.
///
/// Returns false when the pipeline is shutting down (cancelled or queue
/// closed) and the connector should exit its loop.
pub(crate) async fn send_or_cancelled(
    output: &Sender<PointMessage>,
    cancel: &CancellationToken,
    message: PointMessage,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = output.send(message) => sent.is_ok(),
    }
}
