//! Order lifecycle: commands, the transactional manager and its results.

mod commands;
mod manager;
mod pricing;
mod results;

pub use commands::{
    CancelOrder, CreateOrder, DeleteOrder, OrderLine, PaymentLine, ReviewLine, UpdateOrder,
    UpdateStatus,
};
pub use manager::OrderLifecycleManager;
pub use results::{CancelledOrder, DeletedOrder, OrderDetails, RestoredStock};
