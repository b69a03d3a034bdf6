use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::workflows::assignments::{
    AssignmentLifecycle, NewWorkItem, Priority, ReferenceResolver, ReviewVerdict, WorkItemFilter,
    WorkItemId, WorkItemPatch, WorkItemRepository, WorkItemStatus,
};
use crate::workflows::memory::MemoryWorkItemStore;
use crate::workflows::{FixedClock, WorkflowError};

fn new_item(site_id: &str, assignee_id: &str) -> NewWorkItem {
    NewWorkItem {
        site_id: site_id.to_string(),
        assignee_id: assignee_id.to_string(),
        category: "education".to_string(),
        deadline: t0() + Duration::days(3),
        priority: Priority::default(),
        instructions: None,
    }
}

struct KnownSites;

impl ReferenceResolver for KnownSites {
    fn site_exists(&self, site_id: &str) -> bool {
        site_id.starts_with("school-")
    }

    fn assignee_exists(&self, assignee_id: &str) -> bool {
        assignee_id.starts_with("inspector-")
    }
}

#[test]
fn create_starts_pending_with_medium_default_priority() {
    let harness = Harness::new();
    let item = harness
        .assignments
        .create(new_item(SITE_ID, "inspector-7"))
        .expect("created");

    assert_eq!(item.status, WorkItemStatus::Pending);
    assert_eq!(item.priority, Priority::Medium);
    assert!(item.completed_at.is_none());
    assert!(!item.second_tier_reviewed);
    assert!(item.id.as_str().starts_with("wi-"));
}

#[test]
fn create_rejects_deadline_not_after_now() {
    let harness = Harness::new();
    let mut request = new_item(SITE_ID, "inspector-7");
    request.deadline = t0();

    let err = harness.assignments.create(request).expect_err("deadline rejected");
    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[test]
fn create_rejects_unresolvable_references() {
    let lifecycle = AssignmentLifecycle::new(
        Arc::new(MemoryWorkItemStore::default()),
        Arc::new(FixedClock::new(t0())),
    )
    .with_directory(Arc::new(KnownSites));

    for (site, assignee) in [("", "inspector-7"), ("clinic-9", "inspector-7"), (SITE_ID, "admin-1")] {
        let err = lifecycle
            .create(new_item(site, assignee))
            .expect_err("reference rejected");
        assert!(matches!(err, WorkflowError::Validation(_)), "{site}/{assignee}");
    }
    assert!(lifecycle.create(new_item(SITE_ID, "inspector-7")).is_ok());
}

#[test]
fn mark_completed_keeps_first_timestamp() {
    let harness = Harness::new();
    let item = harness.create_item();
    let first_at = t0() + Duration::hours(2);
    let second_at = t0() + Duration::hours(5);

    let first = harness
        .assignments
        .mark_completed(&item.id, "inspector-7", first_at)
        .expect("first completion");
    let second = harness
        .assignments
        .mark_completed(&item.id, "someone-else", second_at)
        .expect("repeat completion is a no-op");

    assert_eq!(first.completed_at, Some(first_at));
    assert_eq!(second, first);
    assert_eq!(second.completed_by.as_deref(), Some("inspector-7"));
}

#[test]
fn losing_completion_write_accepts_the_concurrent_closure() {
    let store = Arc::new(RacingWorkItemStore::with_completing_rival());
    let lifecycle = AssignmentLifecycle::new(store.clone(), Arc::new(FixedClock::new(t0())));
    let item = lifecycle
        .create(new_item(SITE_ID, "inspector-7"))
        .expect("work item created");

    let closed = lifecycle
        .mark_completed(&item.id, "inspector-7", t0() + Duration::hours(1))
        .expect("concurrent closure accepted");

    assert_eq!(closed.status, WorkItemStatus::Completed);
    assert_eq!(closed.completed_by.as_deref(), Some("reconciler"));
    assert_eq!(closed.revision, item.revision + 1);
    assert_eq!(
        store.inner.fetch(&item.id).expect("store reachable"),
        Some(closed)
    );
}

#[test]
fn completion_losing_to_an_unrelated_edit_is_a_conflict() {
    let store = Arc::new(RacingWorkItemStore::with_unrelated_rival());
    let lifecycle = AssignmentLifecycle::new(store.clone(), Arc::new(FixedClock::new(t0())));
    let item = lifecycle
        .create(new_item(SITE_ID, "inspector-7"))
        .expect("work item created");

    let err = lifecycle
        .mark_completed(&item.id, "inspector-7", t0() + Duration::hours(1))
        .expect_err("stale completion refused");

    assert!(matches!(err, WorkflowError::Conflict { .. }), "{err:?}");
    let stored = store
        .inner
        .fetch(&item.id)
        .expect("store reachable")
        .expect("item kept");
    assert_eq!(stored.status, WorkItemStatus::Pending);
    assert!(stored.completed_at.is_none());
}

#[test]
fn second_tier_review_requires_completion_and_is_set_once() {
    let harness = Harness::new();
    let item = harness.create_item();

    let err = harness
        .assignments
        .mark_second_tier_reviewed(&item.id, ReviewVerdict::Satisfactory, "reviewer-ceo", t0())
        .expect_err("pending item cannot be reviewed");
    assert_eq!(
        err,
        WorkflowError::precondition("second-tier review", "pending")
    );

    harness
        .assignments
        .mark_completed(&item.id, "inspector-7", t0())
        .expect("completed");
    let reviewed = harness
        .assignments
        .mark_second_tier_reviewed(
            &item.id,
            ReviewVerdict::NeedsImprovement,
            "reviewer-ceo",
            t0() + Duration::hours(1),
        )
        .expect("reviewed");
    let again = harness
        .assignments
        .mark_second_tier_reviewed(
            &item.id,
            ReviewVerdict::Satisfactory,
            "reviewer-other",
            t0() + Duration::hours(2),
        )
        .expect("repeat is a no-op");

    assert_eq!(reviewed.final_status.as_deref(), Some("completed"));
    assert_eq!(again, reviewed);
    assert_eq!(
        again.second_tier_verdict,
        Some(ReviewVerdict::NeedsImprovement)
    );
}

#[test]
fn list_filters_and_orders_newest_first() {
    let harness = Harness::new();
    let older = harness.create_item();
    harness.clock.advance(Duration::minutes(10));
    let newer = harness
        .assignments
        .create(new_item("school-777", "inspector-9"))
        .expect("created");

    let all = harness
        .assignments
        .list(&WorkItemFilter::default())
        .expect("listed");
    assert_eq!(
        all.iter().map(|item| item.id.clone()).collect::<Vec<_>>(),
        vec![newer.id.clone(), older.id.clone()]
    );

    let filter = WorkItemFilter {
        assignee: Some("inspector-9".to_string()),
        ..WorkItemFilter::default()
    };
    let mine = harness.assignments.list(&filter).expect("listed");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, newer.id);

    let filter = WorkItemFilter {
        status: Some(WorkItemStatus::Completed),
        ..WorkItemFilter::default()
    };
    assert!(harness.assignments.list(&filter).expect("listed").is_empty());
}

#[test]
fn update_only_touches_pending_items() {
    let harness = Harness::new();
    let item = harness.create_item();

    let updated = harness
        .assignments
        .update(
            &item.id,
            WorkItemPatch {
                priority: Some(Priority::Low),
                instructions: Some("Bring the attendance template.".to_string()),
                ..WorkItemPatch::default()
            },
        )
        .expect("patched");
    assert_eq!(updated.priority, Priority::Low);
    assert_eq!(updated.revision, item.revision + 1);

    let err = harness
        .assignments
        .update(
            &item.id,
            WorkItemPatch {
                deadline: Some(t0() - Duration::days(1)),
                ..WorkItemPatch::default()
            },
        )
        .expect_err("past deadline rejected");
    assert!(matches!(err, WorkflowError::Validation(_)));

    harness
        .assignments
        .mark_completed(&item.id, "inspector-7", t0())
        .expect("completed");
    let err = harness
        .assignments
        .update(
            &item.id,
            WorkItemPatch {
                priority: Some(Priority::High),
                ..WorkItemPatch::default()
            },
        )
        .expect_err("completed items are frozen");
    assert!(matches!(err, WorkflowError::Precondition { .. }));
}

#[test]
fn delete_is_refused_while_a_report_references_the_item() {
    let harness = Harness::new();
    let (item, _report) = harness.submitted();

    let err = harness
        .assignments
        .delete(&item.id)
        .expect_err("referenced item kept");
    assert!(matches!(err, WorkflowError::Precondition { .. }));

    let spare = harness.create_item();
    harness.assignments.delete(&spare.id).expect("unreferenced item removed");
    assert!(matches!(
        harness.assignments.get(&spare.id),
        Err(WorkflowError::NotFound { .. })
    ));
}

#[test]
fn unknown_items_are_not_found() {
    let harness = Harness::new();
    let missing = WorkItemId("wi-999999".to_string());
    assert!(matches!(
        harness.assignments.mark_completed(&missing, "inspector-7", t0()),
        Err(WorkflowError::NotFound { .. })
    ));
}
