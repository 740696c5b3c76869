//! Infrastructure layer: ledger persistence, per-user drafts and the ledger
//! service that runs every operation as one unit of work.

pub mod drafts;
pub mod ledger;
pub mod store;


pub use ledger::{LedgerError, LedgerNotice, LedgerResult, LedgerService};
