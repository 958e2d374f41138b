//! Fixed-delay polling
//!
//! Drives a [`ConsulConfigurationSource`] on a tokio task and publishes each
//! full snapshot on a `watch` channel. Cycles that produce no data leave the
//! last published snapshot untouched.

use super::extractor::Snapshot;
use super::polled::ConsulConfigurationSource;
use crate::consul::ClientFactory;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

/// Timing of the polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay before the first poll
    pub initial_delay: Duration,
    /// Delay between the end of one poll and the start of the next
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            interval: Duration::from_secs(30),
        }
    }
}

impl PollerConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

/// Latest published snapshot, `None` until the first successful poll
pub type SnapshotReceiver = watch::Receiver<Option<Arc<Snapshot>>>;

/// Handle to a running poller
pub struct PollerHandle<F: ClientFactory> {
    snapshots: SnapshotReceiver,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<ConsulConfigurationSource<F>>,
}

impl<F: ClientFactory> PollerHandle<F> {
    /// Subscribe to published snapshots
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshots.clone()
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.snapshots.borrow().clone()
    }

    /// Stop polling and hand the source back once the current cycle ends
    pub async fn shutdown(self) -> Result<ConsulConfigurationSource<F>, JoinError> {
        let _ = self.shutdown.send(true);
        self.task.await
    }
}

/// Spawn a fixed-delay polling loop for `source`
pub fn spawn<F>(mut source: ConsulConfigurationSource<F>, config: PollerConfig) -> PollerHandle<F>
where
    F: ClientFactory + 'static,
    F::Client: 'static,
{
    let (snapshot_tx, snapshot_rx) = watch::channel(None);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        tracing::info!(
            facility = %source.facility(),
            interval_ms = config.interval.as_millis() as u64,
            "Starting configuration poller"
        );

        if !sleep_or_shutdown(config.initial_delay, &mut shutdown_rx).await {
            return source;
        }

        loop {
            match source.poll().await {
                Some(snapshot) => {
                    snapshot_tx.send_replace(Some(Arc::new(snapshot)));
                }
                None => {
                    tracing::debug!(state = %source.state(), "Poll produced no data, keeping last snapshot");
                }
            }

            if !sleep_or_shutdown(config.interval, &mut shutdown_rx).await {
                break;
            }
        }

        tracing::info!(facility = %source.facility(), "Configuration poller stopped");
        source
    });

    PollerHandle {
        snapshots: snapshot_rx,
        shutdown: shutdown_tx,
        task,
    }
}

/// Sleep for `delay`; returns `false` if shutdown was requested meanwhile
async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        // a dropped handle also stops the loop
        _ = shutdown.changed() => false,
    }
}
