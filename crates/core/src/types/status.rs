//! Status enums for orders and refund requests.
//!
//! The bookstore API owns every state machine here. The storefront only
//! uses [`OrderStatus::allowed_transitions`] to decide which buttons to
//! offer; the server still accepts or rejects each change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Refunded,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Refunded,
        Self::Cancelled,
    ];

    /// Statuses an order may move to from this one.
    #[must_use]
    pub const fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered | Self::Refunded | Self::Cancelled => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Whether no further transitions exist.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Wire name, also used as the staff-facing label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Refunded => "Refunded",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Label shown to customers in their order history.
    #[must_use]
    pub const fn customer_label(&self) -> &'static str {
        match self {
            Self::Shipped => "In Transit",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// A status string that matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// Refund request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum RefundStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RefundStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

/// A sales manager's decision on a pending refund request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RefundDecision {
    Approved,
    Rejected,
}

impl From<RefundDecision> for RefundStatus {
    fn from(decision: RefundDecision) -> Self {
        match decision {
            RefundDecision::Approved => Self::Approved,
            RefundDecision::Rejected => Self::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        assert_eq!(
            OrderStatus::Processing.allowed_transitions(),
            &[OrderStatus::Shipped, OrderStatus::Cancelled]
        );
        assert_eq!(
            OrderStatus::Shipped.allowed_transitions(),
            &[OrderStatus::Delivered]
        );
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_customer_label() {
        assert_eq!(OrderStatus::Shipped.customer_label(), "In Transit");
        assert_eq!(OrderStatus::Processing.customer_label(), "Processing");
    }

    #[test]
    fn test_status_serde() {
        let status: OrderStatus = serde_json::from_str("\"Delivered\"").unwrap();
        assert_eq!(status, OrderStatus::Delivered);
        assert_eq!(
            serde_json::to_string(&RefundDecision::Rejected).unwrap(),
            "\"Rejected\""
        );
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert!("lost".parse::<OrderStatus>().is_err());
    }
}
