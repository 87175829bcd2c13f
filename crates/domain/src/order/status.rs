//! Order status state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Processing ──► Confirmed ──► Shipped ──► Delivered
///     │              │            │
///     └──────────────┴────────────┴──► Cancelled
/// ```
///
/// Forward moves may skip intermediate states. Backward moves, repeats of
/// the current status, and anything out of a terminal state are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order accepted, awaiting vendor confirmation.
    #[default]
    Processing,

    Confirmed,

    Shipped,

    /// Received by the customer (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Processing,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// The transition table: every status reachable from `self` in one step.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Processing => &[Confirmed, Shipped, Delivered, Cancelled],
            Confirmed => &[Shipped, Delivered, Cancelled],
            Shipped => &[Delivered, Cancelled],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn default_status_is_processing() {
        assert_eq!(OrderStatus::default(), Processing);
    }

    #[test]
    fn forward_moves_are_allowed_including_skips() {
        assert!(Processing.can_transition_to(Confirmed));
        assert!(Processing.can_transition_to(Delivered));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
    }

    #[test]
    fn backward_and_repeated_moves_are_rejected() {
        assert!(!Shipped.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Processing));
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status), "{status} -> {status}");
        }
    }

    #[test]
    fn cancel_allowed_from_every_non_terminal_state() {
        for status in [Processing, Confirmed, Shipped] {
            assert!(status.can_transition_to(Cancelled));
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Delivered.allowed_next().is_empty());
        assert!(Cancelled.allowed_next().is_empty());
        assert!(!Shipped.is_terminal());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), Shipped);
        assert!(matches!(
            "Lost".parse::<OrderStatus>(),
            Err(OrderError::UnknownStatus(_))
        ));
    }

    #[test]
    fn serialization_uses_display_names() {
        assert_eq!(serde_json::to_string(&Delivered).unwrap(), "\"Delivered\"");
    }
}
