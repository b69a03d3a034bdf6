use serde::{Deserialize, Serialize};

use super::domain::{RoutingTarget, Tier1Decision};
use crate::workflows::assignments::ReviewVerdict;
use crate::workflows::WorkflowError;

/// Single source of truth for where a report is in review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ReviewState {
    Submitted,
    Tier1Approved,
    Tier1Rejected,
    RescheduleRequested,
    Completed { verdict: ReviewVerdict },
}

/// Reviewer actions that drive [`ReviewState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEvent {
    Tier1(Tier1Decision),
    Reschedule,
    Tier2(ReviewVerdict),
}

impl ReviewEvent {
    pub const fn operation(self) -> &'static str {
        match self {
            ReviewEvent::Tier1(_) => "tier-1 decision",
            ReviewEvent::Reschedule => "reschedule request",
            ReviewEvent::Tier2(_) => "tier-2 decision",
        }
    }
}

impl ReviewState {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewState::Submitted => "submitted",
            ReviewState::Tier1Approved => "tier-1 approved",
            ReviewState::Tier1Rejected => "tier-1 rejected",
            ReviewState::RescheduleRequested => "reschedule requested",
            ReviewState::Completed { .. } => "completed",
        }
    }

    pub const fn routing(self) -> RoutingTarget {
        match self {
            ReviewState::Submitted => RoutingTarget::Tier1,
            ReviewState::Tier1Approved => RoutingTarget::Tier2,
            ReviewState::Tier1Rejected => RoutingTarget::Submitter,
            ReviewState::RescheduleRequested => RoutingTarget::Administrator,
            ReviewState::Completed { .. } => RoutingTarget::Closed,
        }
    }

    pub const fn is_completed(self) -> bool {
        matches!(self, ReviewState::Completed { .. })
    }

    /// Transition table. Pairs not listed here are rejected.
    pub const fn next(self, event: ReviewEvent) -> Option<ReviewState> {
        match (self, event) {
            (ReviewState::Submitted, ReviewEvent::Tier1(Tier1Decision::Approved)) => {
                Some(ReviewState::Tier1Approved)
            }
            (ReviewState::Submitted, ReviewEvent::Tier1(Tier1Decision::Rejected)) => {
                Some(ReviewState::Tier1Rejected)
            }
            (ReviewState::Submitted, ReviewEvent::Reschedule) => {
                Some(ReviewState::RescheduleRequested)
            }
            (ReviewState::Tier1Approved, ReviewEvent::Tier2(verdict)) => {
                Some(ReviewState::Completed { verdict })
            }
            _ => None,
        }
    }

    pub fn apply(self, event: ReviewEvent) -> Result<ReviewState, WorkflowError> {
        self.next(event)
            .ok_or_else(|| WorkflowError::precondition(event.operation(), self.label()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: [ReviewEvent; 5] = [
        ReviewEvent::Tier1(Tier1Decision::Approved),
        ReviewEvent::Tier1(Tier1Decision::Rejected),
        ReviewEvent::Reschedule,
        ReviewEvent::Tier2(ReviewVerdict::Satisfactory),
        ReviewEvent::Tier2(ReviewVerdict::NeedsImprovement),
    ];

    #[test]
    fn terminal_states_accept_nothing() {
        for state in [
            ReviewState::Tier1Rejected,
            ReviewState::RescheduleRequested,
            ReviewState::Completed {
                verdict: ReviewVerdict::Satisfactory,
            },
        ] {
            for event in EVENTS {
                assert_eq!(state.next(event), None, "{state:?} accepted {event:?}");
            }
        }
    }

    #[test]
    fn tier2_only_follows_tier1_approval() {
        let verdict = ReviewVerdict::NeedsImprovement;
        let error = ReviewState::Submitted
            .apply(ReviewEvent::Tier2(verdict))
            .expect_err("tier-2 before tier-1 is rejected");
        assert_eq!(
            error,
            WorkflowError::precondition("tier-2 decision", "submitted")
        );

        let approved = ReviewState::Submitted
            .apply(ReviewEvent::Tier1(Tier1Decision::Approved))
            .expect("tier-1 approval");
        assert_eq!(approved.routing(), RoutingTarget::Tier2);
        assert_eq!(
            approved.apply(ReviewEvent::Tier2(verdict)),
            Ok(ReviewState::Completed { verdict })
        );
    }

    #[test]
    fn serializes_with_state_tag() {
        let value = serde_json::to_value(ReviewState::Completed {
            verdict: ReviewVerdict::Satisfactory,
        })
        .expect("serialize state");
        assert_eq!(
            value,
            serde_json::json!({ "state": "completed", "verdict": "satisfactory" })
        );
    }
}
