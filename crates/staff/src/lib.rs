//! Staff tallies: monthly sales tries/sales and classic/deluxe overtime per
//! employee, with monthly and yearly summaries.
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod period;
pub mod summary;
pub mod tally;

pub use period::Period;
pub use summary::{OvertimeRow, OvertimeSummary, SalesRow, SalesSummary, success_rate_label};
pub use tally::{OvertimeTally, SalesTally};
