//! `stockhouse-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the catalog,
//! inventory, staff and auth crates (no infrastructure concerns).

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod quantity;
pub mod warehouse;

pub use aggregate::{Aggregate, AggregateRoot};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use event::DomainEvent;
pub use id::{HistoryEntryId, ProductId, TransferId, UserId};
pub use quantity::{MAX_QUANTITY, ensure_within_limit};
pub use warehouse::Warehouse;
