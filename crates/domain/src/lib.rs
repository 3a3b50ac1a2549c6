//! Domain layer for the order lifecycle service.
//!
//! This crate provides:
//! - Typed, validated commands for creating and changing orders
//! - The transactional `OrderLifecycleManager`
//! - The error taxonomy surfaced to callers

pub mod error;
pub mod order;

pub use common::{CustomerId, Money, OrderId, OrderStatus, ProductId, ReviewId};
pub use error::{OrderError, ValidationError};
pub use order::{
    CancelOrder, CancelledOrder, CreateOrder, DeleteOrder, DeletedOrder, OrderDetails,
    OrderLifecycleManager, OrderLine, PaymentLine, RestoredStock, ReviewLine, UpdateOrder,
    UpdateStatus,
};
