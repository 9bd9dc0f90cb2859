use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A refund starts out `Processed` (accepted by the gateway) and finishes as
/// `Completed` once the gateway confirms, or `Rejected` if it refuses.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefundStatus {
    #[default]
    Processed,
    Completed,
    Rejected,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Processed => "processed",
            RefundStatus::Completed => "completed",
            RefundStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "processed" => Some(RefundStatus::Processed),
            "completed" => Some(RefundStatus::Completed),
            "rejected" => Some(RefundStatus::Rejected),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: RefundStatus) -> bool {
        matches!(
            (self, next),
            (RefundStatus::Processed, RefundStatus::Completed)
                | (RefundStatus::Processed, RefundStatus::Rejected)
        )
    }
}

impl Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
