use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle of a booking. `Rejected` and `Completed` are terminal.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingStatus {
    #[default]
    Processing,
    Approved,
    Rejected,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Processing => "processing",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "processing" => Some(BookingStatus::Processing),
            "approved" => Some(BookingStatus::Approved),
            "rejected" => Some(BookingStatus::Rejected),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Processing, BookingStatus::Approved)
                | (BookingStatus::Processing, BookingStatus::Rejected)
                | (BookingStatus::Approved, BookingStatus::Completed)
                | (BookingStatus::Approved, BookingStatus::Rejected)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Rejected | BookingStatus::Completed)
    }

    /// Only approved and completed bookings hold their time slot.
    pub fn blocks_availability(&self) -> bool {
        matches!(self, BookingStatus::Approved | BookingStatus::Completed)
    }
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
