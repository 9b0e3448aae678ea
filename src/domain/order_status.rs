use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    RiderStarted,
    PickedUp,
    Delivered,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot move order from {from} to {to}")]
    Illegal { from: OrderStatus, to: OrderStatus },

    #[error("Unknown order status: {0}")]
    Unknown(String),
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::RiderStarted,
        OrderStatus::PickedUp,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::RiderStarted => "rider_started",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// States a validated operation can still move forward or cancel.
    pub const OPEN: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::RiderStarted,
        OrderStatus::PickedUp,
    ];

    pub fn is_terminal(self) -> bool {
        !Self::OPEN.contains(&self)
    }

    /// Transition table: the states from which `self` can be entered through
    /// a validated operation. `Pending` is only entered by order creation.
    /// Refunds have no enforced predecessor.
    pub fn predecessors(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[],
            Assigned => &[Pending, Assigned],
            RiderStarted => &[Assigned],
            PickedUp => &[RiderStarted],
            Delivered => &[PickedUp],
            Cancelled => &Self::OPEN,
            Refunded => &Self::ALL,
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        next.predecessors().contains(&self)
    }

    pub fn check_transition(self, next: OrderStatus) -> Result<(), TransitionError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(TransitionError::Illegal {
                from: self,
                to: next,
            })
        }
    }

    /// Predecessor list as stored strings, for guarded `UPDATE ... WHERE status IN (...)`.
    pub fn predecessor_values(self) -> Vec<&'static str> {
        self.predecessors().iter().map(|s| s.as_str()).collect()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| TransitionError::Unknown(s.to_string()))
    }
}
