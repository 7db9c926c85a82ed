//! Warranty Claims Domain
//!
//! Claims registered against products, the cost lines and credit notes
//! booked on them, and the suppliers they are raised with.
//!
//! # Claim Lifecycle
//!
//! ```text
//! New -> Pending -> Approved -> Booked -> Closed
//!   \        \          \
//!    +--------+----------+--> Rejected -> Closed
//! ```
//!
//! Claims are soft-deleted only; a deleted claim and everything attached to it
//! drops out of every query.

pub mod claim;
pub mod line;
pub mod supplier;
pub mod filter;
pub mod ports;
pub mod error;

pub use claim::{Claim, ClaimDetails, ClaimStatus};
pub use line::{net_total, CostLine, CreditNote, Joined, LedgerLine, NewLine};
pub use supplier::Supplier;
pub use filter::{ClaimCriteria, ClaimQuery, ClaimWindow, DateField, FilterSet};
pub use ports::{ClaimsCommandPort, ClaimsQueryPort, Mutation, Table};
pub use error::ClaimError;
