//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Lifecycle of a customer order.
///
/// Orders start as `Placed` once payment is verified. `Delivered` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "strives.order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Placed,
    Confirmed,
    Dispatched,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether an admin may move an order from `self` to `next`.
    ///
    /// Terminal orders never change. Re-applying the current status is a
    /// no-op and allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self == next || !self.is_terminal()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed => write!(f, "placed"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Dispatched => write!(f, "dispatched"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placed" => Ok(Self::Placed),
            "confirmed" => Ok(Self::Confirmed),
            "dispatched" => Ok(Self::Dispatched),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "strives.discount_kind", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// Percentage of the order amount.
    Percent,
    /// Fixed rupee amount.
    Flat,
}

/// Where a one-time password was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "strives.otp_channel", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    Sms,
    Email,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_are_frozen() {
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Dispatched));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Placed));
        assert!(OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_open_statuses_move_freely() {
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Dispatched.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_order_status_parse_and_display() {
        let status: OrderStatus = " Confirmed ".parse().unwrap();
        assert_eq!(status, OrderStatus::Confirmed);
        assert_eq!(status.to_string(), "confirmed");
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&DiscountKind::Percent).unwrap();
        assert_eq!(json, "\"percent\"");
        let kind: OtpChannel = serde_json::from_str("\"sms\"").unwrap();
        assert_eq!(kind, OtpChannel::Sms);
    }
}
