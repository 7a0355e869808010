//! Detection of new submissions after initial load.
//!
//! The hosted store's "limit 1, newest first" subscription is reproduced
//! here as a polling loop feeding an explicit state machine. Consumers
//! subscribe through an mpsc channel; dropping the receiver tears the
//! loop down and no further events fire.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn, Logger};
use time::OffsetDateTime;
use tokio::sync::mpsc;

use crate::db::Db;

/// The event emitted whenever a strictly newer submission is observed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Refresh;

/// Tracks the newest creation time seen on the latest-submission query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LatestWatch {
    /// No snapshot observed yet; the first one only sets the baseline.
    Uninitialized,
    /// Watching for creation times strictly greater than the baseline.
    Armed { baseline: OffsetDateTime },
}

impl Default for LatestWatch {
    fn default() -> Self {
        LatestWatch::Uninitialized
    }
}

impl LatestWatch {
    pub fn new() -> Self {
        LatestWatch::Uninitialized
    }

    /// Feeds one snapshot of the latest creation time into the machine.
    /// Returns true exactly when a notification should fire.
    ///
    /// Snapshots are assumed to arrive in the store's delivery order; a
    /// duplicate delivery (same timestamp) is a no-op.
    pub fn observe(&mut self, latest: Option<OffsetDateTime>) -> bool {
        let latest = match latest {
            Some(latest) => latest,
            None => return false,
        };

        match *self {
            LatestWatch::Uninitialized => {
                *self = LatestWatch::Armed { baseline: latest };
                false
            }
            LatestWatch::Armed { baseline } => {
                if latest > baseline {
                    *self = LatestWatch::Armed { baseline: latest };
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Polls the latest-submission query on a fixed interval and pushes a
/// [`Refresh`] event for every strictly newer record. Runs until the
/// receiving side of the channel is dropped. Poll errors are logged and
/// retried on the next tick.
pub async fn run_watch(
    logger: Arc<Logger>,
    db: Arc<dyn Db + Send + Sync>,
    interval: Duration,
    sender: mpsc::Sender<Refresh>,
) {
    let mut watch = LatestWatch::new();
    let mut ticks = tokio::time::interval(interval);

    loop {
        ticks.tick().await;

        if sender.is_closed() {
            break;
        }

        match db.retrieve_latest().await {
            Ok(latest) => {
                if watch.observe(latest.and_then(|s| s.submitted_at))
                    && sender.send(Refresh).await.is_err()
                {
                    break;
                }
            }
            Err(e) => {
                warn!(logger, "Failed to poll for the latest submission: {}", e);
            }
        }
    }

    debug!(logger, "Submission watch torn down");
}
