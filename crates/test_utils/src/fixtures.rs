//! Pre-built Test Fixtures
//!
//! Deterministic dates, windows and identifiers shared by the dashboard,
//! database and API test suites. The reference period is June 2024 with
//! the report clock stopped on 20 June at noon UTC.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fake::faker::company::en::CompanyName;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{ClaimId, DateRange, SupplierId, TechnicianId, Timezone};

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Start of the reference window (1 June 2024)
    pub fn period_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    /// Exclusive end of the reference window (1 July 2024)
    pub fn period_end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    /// June 2024 as a half-open range
    pub fn june() -> DateRange {
        DateRange::new(Self::period_start(), Self::period_end()).unwrap()
    }

    /// The report clock
    pub fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 20, 12, 0, 0).unwrap()
    }

    /// A timestamp `days` after the start of the window
    pub fn in_period(days: i64) -> DateTime<Utc> {
        Self::period_start() + chrono::Duration::days(days)
    }

    /// A timestamp `days` before the start of the window
    pub fn before_period(days: i64) -> DateTime<Utc> {
        Self::period_start() - chrono::Duration::days(days)
    }

    pub fn due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    pub fn business_timezone() -> Timezone {
        Timezone::parse("Europe/Oslo").unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    pub fn claim_id() -> ClaimId {
        ClaimId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    pub fn supplier_id() -> SupplierId {
        SupplierId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }

    pub fn technician_id() -> TechnicianId {
        TechnicianId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440003").unwrap())
    }
}

/// Fixture for amounts and account codes
pub struct LedgerFixtures;

impl LedgerFixtures {
    pub fn repair_cost() -> Decimal {
        dec!(400.00)
    }

    pub fn credit() -> Decimal {
        dec!(150.00)
    }

    /// Parts account used by most fixture lines
    pub fn parts_account() -> i32 {
        4010
    }

    pub fn labour_account() -> i32 {
        4020
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn machine_model() -> &'static str {
        "TX-400"
    }

    pub fn department() -> &'static str {
        "Service"
    }

    pub fn root_cause() -> &'static str {
        "Compressor"
    }

    /// A random but plausible supplier name
    pub fn supplier_name() -> String {
        CompanyName().fake()
    }
}
