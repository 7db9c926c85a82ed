//! Pure aggregation over fetched rows
//!
//! Every function here is deterministic and total: empty input yields zero
//! counts, zero sums, a zero average and empty groupings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{DateRange, SupplierId};
use domain_claims::{Claim, ClaimStatus, CostLine, CreditNote, Joined, Supplier};

use crate::trend::round_whole;

/// Grouping label for rows without a key
pub const UNKNOWN: &str = "Unknown";

/// Number of account codes kept by [`top_account_codes`]
pub const TOP_ACCOUNT_LIMIT: usize = 5;

/// A labelled total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub value: Decimal,
}

/// A labelled total with its rounded share of the grand total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub label: String,
    pub value: Decimal,
    pub percentage: Decimal,
}

/// How supplier shares were computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareBasis {
    Cost,
    /// No cost lines in scope, so claim counts were used instead
    ClaimCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierDistribution {
    pub basis: ShareBasis,
    pub shares: Vec<Share>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: ClaimStatus,
    pub count: usize,
}

// ============================================================================
// Counts
// ============================================================================

pub fn count_new(claims: &[Claim]) -> usize {
    claims.iter().filter(|c| c.status == ClaimStatus::New).count()
}

/// Pending or Approved
pub fn count_open(claims: &[Claim]) -> usize {
    claims.iter().filter(|c| c.status.is_open()).count()
}

pub fn count_overdue(claims: &[Claim], as_of: DateTime<Utc>) -> usize {
    claims.iter().filter(|c| c.is_overdue(as_of)).count()
}

/// Claims whose closing timestamp falls inside `period`
pub fn count_closed_within(claims: &[Claim], period: &DateRange) -> usize {
    claims
        .iter()
        .filter(|c| c.closed_at.is_some_and(|at| period.contains(at)))
        .count()
}

/// Every status with its count, zero included, in lifecycle order
pub fn status_breakdown(claims: &[Claim]) -> Vec<StatusCount> {
    ClaimStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: claims.iter().filter(|c| c.status == status).count(),
        })
        .collect()
}

// ============================================================================
// Sums and averages
// ============================================================================

/// Σ cost over lines whose parent claim is under warranty
pub fn warranty_cost(lines: &[Joined<CostLine>]) -> Decimal {
    lines
        .iter()
        .filter(|joined| joined.claim.warranty)
        .map(|joined| joined.line.amount)
        .sum()
}

/// Σ cost − Σ credit
pub fn net_cost(costs: &[Joined<CostLine>], credits: &[Joined<CreditNote>]) -> Decimal {
    domain_claims::net_total(
        costs.iter().map(|j| &j.line),
        credits.iter().map(|j| &j.line),
    )
}

/// Mean whole-day lead time of closed claims, rounded to whole days
pub fn average_lead_time(claims: &[Claim]) -> Decimal {
    let days: Vec<i64> = claims
        .iter()
        .filter(|c| c.status == ClaimStatus::Closed)
        .filter_map(Claim::lead_time_days)
        .collect();

    if days.is_empty() {
        return Decimal::ZERO;
    }

    let sum: Decimal = days.iter().copied().map(Decimal::from).sum();
    round_whole(sum / Decimal::from(days.len()))
}

// ============================================================================
// Groupings
// ============================================================================

/// Cost per account code, largest first, at most [`TOP_ACCOUNT_LIMIT`] entries
pub fn top_account_codes(lines: &[Joined<CostLine>]) -> Vec<Bucket> {
    let mut totals: HashMap<String, Decimal> = HashMap::new();
    for joined in lines {
        let label = joined
            .line
            .account_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());
        *totals.entry(label).or_default() += joined.line.amount;
    }

    let mut buckets = into_buckets(totals);
    buckets.truncate(TOP_ACCOUNT_LIMIT);
    buckets
}

/// Claim count per root cause, largest first
pub fn root_causes(claims: &[Claim]) -> Vec<Bucket> {
    let mut counts: HashMap<String, Decimal> = HashMap::new();
    for claim in claims {
        let label = claim
            .root_cause
            .as_deref()
            .map(str::trim)
            .filter(|cause| !cause.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string();
        *counts.entry(label).or_default() += Decimal::ONE;
    }
    into_buckets(counts)
}

/// Share of cost per supplier.
///
/// When no cost line is in scope the shares are taken over claim counts
/// instead. Zero grand total gives an empty list.
pub fn supplier_distribution(
    lines: &[Joined<CostLine>],
    claims: &[Claim],
    suppliers: &[Supplier],
) -> SupplierDistribution {
    let names: HashMap<SupplierId, &str> = suppliers
        .iter()
        .map(|s| (s.id, s.name.as_str()))
        .collect();
    let label = |claim: &Claim| -> String {
        claim
            .supplier_id
            .and_then(|id| names.get(&id).copied())
            .unwrap_or(UNKNOWN)
            .to_string()
    };

    let mut totals: HashMap<String, Decimal> = HashMap::new();
    let basis = if lines.is_empty() {
        for claim in claims {
            *totals.entry(label(claim)).or_default() += Decimal::ONE;
        }
        ShareBasis::ClaimCount
    } else {
        for joined in lines {
            *totals.entry(label(&joined.claim)).or_default() += joined.line.amount;
        }
        ShareBasis::Cost
    };

    SupplierDistribution {
        basis,
        shares: shares_of(into_buckets(totals)),
    }
}

/// Attaches rounded percentages; empty when the total is not positive
pub fn shares_of(buckets: Vec<Bucket>) -> Vec<Share> {
    let total: Decimal = buckets.iter().map(|b| b.value).sum();
    if total <= Decimal::ZERO {
        return Vec::new();
    }
    buckets
        .into_iter()
        .map(|bucket| Share {
            percentage: round_whole(bucket.value / total * dec!(100)),
            label: bucket.label,
            value: bucket.value,
        })
        .collect()
}

/// Sorted by value descending, then label ascending
fn into_buckets(totals: HashMap<String, Decimal>) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = totals
        .into_iter()
        .map(|(label, value)| Bucket { label, value })
        .collect();
    buckets.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.label.cmp(&b.label)));
    buckets
}
