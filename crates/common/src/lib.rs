//! Shared types for the order lifecycle service.

pub mod money;
pub mod status;
pub mod types;

pub use money::Money;
pub use status::{OrderStatus, ParseStatusError};
pub use types::{CustomerId, OrderId, ProductId, ReviewId};
