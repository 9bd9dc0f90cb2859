use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Payment state as reconciled from gateway notifications. Transitions are
/// forward-only: pending -> paid -> refunded, pending -> failed,
/// pending -> cancelled. A settled payment never regresses.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

/// What the reconciler should do with an incoming gateway status, given the
/// currently persisted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileDecision {
    Apply,
    DuplicateNoop,
    Regression,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Pending, PaymentStatus::Cancelled)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }

    /// Decides how a notification carrying `incoming` applies on top of
    /// `self`. Gateways deliver at-least-once and out of order, so a repeat
    /// of the current status is a no-op, and anything that would move a
    /// settled payment backwards is refused.
    pub fn reconcile(&self, incoming: PaymentStatus) -> ReconcileDecision {
        if *self == incoming {
            return ReconcileDecision::DuplicateNoop;
        }
        // A success notification replayed after the refund went through is
        // still just a late duplicate of the original settlement.
        if *self == PaymentStatus::Refunded && incoming == PaymentStatus::Paid {
            return ReconcileDecision::DuplicateNoop;
        }
        if self.can_transition_to(incoming) {
            return ReconcileDecision::Apply;
        }
        ReconcileDecision::Regression
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
