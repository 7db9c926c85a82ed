//! Core Kernel - foundational types shared by every warranty desk crate
//!
//! - Strongly-typed identifiers
//! - Date windows and the business timezone
//! - The port error taxonomy and adapter marker traits
//! - The retry policy applied at the data-access boundary

pub mod identifiers;
pub mod temporal;
pub mod ports;
pub mod retry;

pub use identifiers::{ClaimId, CostLineId, CreditNoteId, SupplierId, TechnicianId};
pub use temporal::{DateRange, TemporalError, Timezone};
pub use ports::{
    AdapterHealth, DomainPort, ErrorKind, HealthCheckable, HealthCheckResult, PortError,
};
pub use retry::{Backoff, RetryPolicy};
