//! Property-Based Test Generators
//!
//! proptest strategies producing claims and lines that respect the domain
//! rules: positive amounts, closed claims carry `closed_at`, and timestamps
//! fall within a few months of the reference window.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::DateRange;
use domain_claims::{Claim, ClaimStatus, CostLine, NewLine};

use crate::builders::ClaimBuilder;
use crate::fixtures::TemporalFixtures;

pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    prop::sample::select(ClaimStatus::ALL.to_vec())
}

/// Positive amounts with two decimal places, up to 100 000.00
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Four-digit ledger accounts, occasionally missing
pub fn account_code_strategy() -> impl Strategy<Value = Option<i32>> {
    prop_oneof![
        4 => (4000i32..4100).prop_map(Some),
        1 => Just(None),
    ]
}

/// An instant within 90 days either side of the reference window start
pub fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (-90i64 * 24..90 * 24).prop_map(|hours| TemporalFixtures::period_start() + Duration::hours(hours))
}

/// A non-empty window starting near the reference window
pub fn date_range_strategy() -> impl Strategy<Value = DateRange> {
    (instant_strategy(), 1i64..120).prop_map(|(start, days)| {
        DateRange::new(start, start + Duration::days(days)).expect("end is after start")
    })
}

pub fn machine_model_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["TX-400", "TX-410", "AB-100", "ZR-9"]).prop_map(str::to_string)
}

/// Claims in any status; closed claims close up to 60 days after creation
pub fn claim_strategy() -> impl Strategy<Value = Claim> {
    (
        claim_status_strategy(),
        instant_strategy(),
        0i64..60,
        machine_model_strategy(),
        any::<bool>(),
        prop::bool::weighted(0.1),
    )
        .prop_map(|(status, created_at, lead_days, model, warranty, deleted)| {
            let mut builder = ClaimBuilder::new()
                .created_at(created_at)
                .with_machine_model(model)
                .with_status(status);
            if status == ClaimStatus::Closed {
                builder = builder.closed_at(created_at + Duration::days(lead_days));
            }
            if warranty {
                builder = builder.warranty();
            }
            if deleted {
                builder = builder.deleted_at(created_at + Duration::hours(1));
            }
            builder.build()
        })
}

/// A cost line belonging to `claim`
pub fn cost_line_strategy(claim: Claim) -> impl Strategy<Value = CostLine> {
    (amount_strategy(), account_code_strategy()).prop_map(move |(amount, account_code)| {
        CostLine::new(NewLine {
            claim_id: claim.id,
            amount,
            account_code,
            created_on: claim.created_at.date_naive(),
        })
        .expect("generated amounts are positive")
    })
}
