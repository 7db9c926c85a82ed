//! Repository implementations
//!
//! Repositories own the SQL and map between database rows and domain
//! types. Queries are built at runtime and bound positionally.

pub mod claims;

pub use claims::{ClaimRow, ClaimsRepository, LineRow, LineTable, SupplierRow};
