pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use common::{CustomerId, Money, OrderId, OrderStatus, ProductId, ReviewId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderStore, InMemoryTransaction};
pub use postgres::{PostgresOrderStore, PostgresTransaction};
pub use records::{
    NewReview, OrderItemRecord, OrderRecord, PaymentRecord, ProductRecord, RemovedDependents,
    ReviewRecord,
};
pub use store::{OrderStore, StoreTransaction};
