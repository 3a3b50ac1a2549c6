//! Order status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Created/Pending ──► Approved ──► Invoiced ──► Processing ──► Shipped ──► Delivered ──► Completed
///        │               │            │             │
///        │               └────────────┴─────────────┴──► Cancelled
///        ├──► Cancelled
///        └──► Unavailable
/// ```
///
/// Approved may skip ahead to Processing, Shipped or Delivered, and Invoiced
/// may skip to Shipped. Completed, Cancelled and Unavailable are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order recorded, awaiting approval. Default for new orders.
    #[default]
    Pending,

    /// Order recorded by the dataset import, equivalent to Pending.
    Created,

    /// Payment approved.
    Approved,

    /// Invoice issued.
    Invoiced,

    /// Being prepared by the seller.
    Processing,

    /// Handed to the carrier.
    Shipped,

    /// Received by the customer.
    Delivered,

    /// Closed after delivery (terminal).
    Completed,

    /// Cancelled without deletion (terminal).
    #[serde(alias = "canceled")]
    Cancelled,

    /// Could not be fulfilled (terminal).
    Unavailable,
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl OrderStatus {
    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Created => "created",
            OrderStatus::Approved => "approved",
            OrderStatus::Invoiced => "invoiced",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unavailable => "unavailable",
        }
    }

    /// Returns true if an order in this status may move to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        match self {
            Pending | Created => matches!(next, Approved | Cancelled | Unavailable),
            Approved => matches!(
                next,
                Invoiced | Processing | Shipped | Delivered | Cancelled
            ),
            Invoiced => matches!(next, Processing | Shipped | Cancelled),
            Processing => matches!(next, Shipped | Cancelled),
            Shipped => matches!(next, Delivered),
            Delivered => matches!(next, Completed),
            Completed | Cancelled | Unavailable => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "created" => Ok(OrderStatus::Created),
            "approved" => Ok(OrderStatus::Approved),
            "invoiced" => Ok(OrderStatus::Invoiced),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            "unavailable" => Ok(OrderStatus::Unavailable),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}
