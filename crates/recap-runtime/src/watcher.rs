//! Polling fallback for hosts that do not report conversation switches

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use crate::session::SummarizationSession;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub struct ConversationWatcher {
    session: Arc<SummarizationSession>,
    poll_interval: Duration,
}

impl ConversationWatcher {
    pub fn new(session: Arc<SummarizationSession>) -> Self {
        Self {
            session,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Starts polling the host on a background task.
    pub fn spawn(self) -> WatcherHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let session = self.session;
        let poll_interval = self.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = session.sync_conversation().await {
                            warn!(error = %e, "Conversation sync failed");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Conversation watcher stopped");
        });

        WatcherHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

pub struct WatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signals the polling task and waits for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Conversation watcher task failed");
        }
    }
}
