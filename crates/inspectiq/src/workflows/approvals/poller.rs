use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::repository::TicketRepository;
use super::service::ApprovalTicketService;
use crate::workflows::assignments::WorkItemId;
use crate::workflows::notify::NotificationDispatcher;
use crate::workflows::WorkflowError;

/// Client-side polling cadence for the consent handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Anything that can answer "has this pair been approved yet".
pub trait TicketStatusSource: Send + Sync + 'static {
    fn is_approved(&self, work_item_id: &WorkItemId, site_id: &str) -> Result<bool, WorkflowError>;
}

impl<R, N> TicketStatusSource for ApprovalTicketService<R, N>
where
    R: TicketRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    fn is_approved(&self, work_item_id: &WorkItemId, site_id: &str) -> Result<bool, WorkflowError> {
        self.poll_status(work_item_id, site_id)
            .map(|ticket| ticket.approved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Approved,
    TimedOut,
    Cancelled,
}

/// Spawns cancellable polling tasks against a status source.
pub struct ApprovalPoller<S> {
    source: Arc<S>,
    settings: PollSettings,
}

impl<S> ApprovalPoller<S>
where
    S: TicketStatusSource,
{
    pub fn new(source: Arc<S>, settings: PollSettings) -> Self {
        Self { source, settings }
    }

    /// Poll immediately, then every `interval`, until approval, timeout, or cancellation.
    pub fn start(&self, work_item_id: WorkItemId, site_id: impl Into<String>) -> PollHandle {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let source = Arc::clone(&self.source);
        let settings = self.settings.clone();
        let site_id = site_id.into();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let deadline = time::sleep(settings.timeout);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    biased;
                    changed = cancel_rx.changed() => {
                        if changed.is_err() || *cancel_rx.borrow() {
                            debug!(work_item = %work_item_id.0, site = %site_id, "approval polling cancelled");
                            return PollOutcome::Cancelled;
                        }
                    }
                    _ = &mut deadline => {
                        info!(work_item = %work_item_id.0, site = %site_id, "approval polling timed out");
                        return PollOutcome::TimedOut;
                    }
                    _ = ticker.tick() => {
                        match source.is_approved(&work_item_id, &site_id) {
                            Ok(true) => return PollOutcome::Approved,
                            Ok(false) => {}
                            Err(WorkflowError::NotFound { .. }) => {
                                debug!(work_item = %work_item_id.0, site = %site_id, "no consent ticket yet");
                            }
                            Err(error) => {
                                warn!(work_item = %work_item_id.0, site = %site_id, %error, "approval status check failed");
                            }
                        }
                    }
                }
            }
        });

        PollHandle {
            cancel: cancel_tx,
            task: Some(task),
        }
    }
}

/// Owner of a running poll. Dropping the handle stops the task.
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }

    pub async fn outcome(mut self) -> PollOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(PollOutcome::Cancelled),
            None => PollOutcome::Cancelled,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        let _ = self.cancel.send(true);
    }
}
