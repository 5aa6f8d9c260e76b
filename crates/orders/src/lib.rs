//! Orders and the impact ledger.
//!
//! Orders are placed from a checkout quote and then move through fulfilment
//! statuses. Ledger entries record the proceeds routed to impact beneficiaries.

pub mod allocation;
pub mod ledger;
pub mod order;

pub use allocation::allocate_order;
pub use ledger::{ImpactLedgerEntry, LedgerStatus};
pub use order::{Order, OrderItem, OrderStatus};
