//! Test Utilities Crate
//!
//! Shared fixtures, builders and helpers for the warranty dashboard test
//! suites.
//!
//! - `fixtures`: deterministic dates, ids and amounts
//! - `builders`: claim and line builders plus an in-memory store seeder
//! - `database`: PostgreSQL test containers
//! - `assertions`: board and card assertions
//! - `generators`: proptest strategies

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
