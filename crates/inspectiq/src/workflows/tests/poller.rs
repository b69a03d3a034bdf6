use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::workflows::approvals::{ApprovalPoller, PollOutcome, PollSettings, TicketStatusSource};
use crate::workflows::assignments::WorkItemId;
use crate::workflows::WorkflowError;

fn fast_settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_secs(5),
        timeout: Duration::from_secs(30),
    }
}

#[derive(Default)]
struct CountingSource {
    checks: AtomicUsize,
}

impl TicketStatusSource for CountingSource {
    fn is_approved(&self, _: &WorkItemId, _: &str) -> Result<bool, WorkflowError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }
}

#[test]
fn default_cadence_is_five_seconds_for_ten_minutes() {
    let settings = PollSettings::default();
    assert_eq!(settings.interval, Duration::from_secs(5));
    assert_eq!(settings.timeout, Duration::from_secs(600));
}

#[tokio::test(start_paused = true)]
async fn poll_resolves_once_the_principal_approves() {
    let harness = Harness::new();
    let item = harness.create_item();
    let poller = ApprovalPoller::new(harness.approvals.clone(), fast_settings());

    // Polling starts before the ticket exists; missing tickets keep the loop alive.
    let handle = poller.start(item.id.clone(), SITE_ID);

    let approvals = harness.approvals.clone();
    let work_item_id = item.id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        approvals
            .request_ticket(ticket_request(&work_item_id), &inspector())
            .expect("ticket requested");
        approvals
            .simulate_approval(&work_item_id, SITE_ID)
            .expect("approved");
    });

    assert_eq!(handle.outcome().await, PollOutcome::Approved);
}

#[tokio::test(start_paused = true)]
async fn poll_times_out_without_approval() {
    let harness = Harness::new();
    let item = harness.create_item();
    harness.request_ticket(&item);
    let poller = ApprovalPoller::new(harness.approvals.clone(), fast_settings());

    let handle = poller.start(item.id.clone(), SITE_ID);

    assert_eq!(handle.outcome().await, PollOutcome::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_the_poll() {
    let source = Arc::new(CountingSource::default());
    let poller = ApprovalPoller::new(source, fast_settings());

    let handle = poller.start(WorkItemId("wi-000001".to_string()), SITE_ID);
    handle.cancel();

    assert_eq!(handle.outcome().await, PollOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_polling() {
    let source = Arc::new(CountingSource::default());
    let poller = ApprovalPoller::new(source.clone(), fast_settings());

    let handle = poller.start(WorkItemId("wi-000001".to_string()), SITE_ID);
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(handle.is_running());
    let checks_at_drop = source.checks.load(Ordering::SeqCst);
    assert!(checks_at_drop >= 2);

    drop(handle);
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(source.checks.load(Ordering::SeqCst), checks_at_drop);
}
