//! Dashboard metrics and their per-card results
//!
//! Each card resolves on its own into a [`MetricResult`]. A [`MetricBoard`]
//! folds results in arrival order, so a slow or failing card never holds back
//! the others.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ErrorKind, PortError};

use crate::aggregator::{Bucket, SupplierDistribution};
use crate::error::DashboardError;
use crate::trend::{Direction, Trend};

/// Every card on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    NewClaims,
    OpenClaims,
    OverdueClaims,
    ClosedThisPeriod,
    WarrantyCost,
    AverageLeadTime,
    TopAccountCodes,
    SupplierDistribution,
    RootCauses,
}

impl MetricKind {
    pub const ALL: [MetricKind; 9] = [
        MetricKind::NewClaims,
        MetricKind::OpenClaims,
        MetricKind::OverdueClaims,
        MetricKind::ClosedThisPeriod,
        MetricKind::WarrantyCost,
        MetricKind::AverageLeadTime,
        MetricKind::TopAccountCodes,
        MetricKind::SupplierDistribution,
        MetricKind::RootCauses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::NewClaims => "new_claims",
            MetricKind::OpenClaims => "open_claims",
            MetricKind::OverdueClaims => "overdue_claims",
            MetricKind::ClosedThisPeriod => "closed_this_period",
            MetricKind::WarrantyCost => "warranty_cost",
            MetricKind::AverageLeadTime => "average_lead_time",
            MetricKind::TopAccountCodes => "top_account_codes",
            MetricKind::SupplierDistribution => "supplier_distribution",
            MetricKind::RootCauses => "root_causes",
        }
    }

    /// Whether a rising value is good news. Grouped metrics have no trend.
    pub fn polarity(&self) -> Option<Polarity> {
        match self {
            MetricKind::ClosedThisPeriod => Some(Polarity::HigherIsBetter),
            MetricKind::NewClaims
            | MetricKind::OpenClaims
            | MetricKind::OverdueClaims
            | MetricKind::WarrantyCost
            | MetricKind::AverageLeadTime => Some(Polarity::LowerIsBetter),
            MetricKind::TopAccountCodes
            | MetricKind::SupplierDistribution
            | MetricKind::RootCauses => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// Reading of a trend direction under a metric's polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    Improving,
    Worsening,
    Neutral,
}

impl Polarity {
    pub fn assess(&self, direction: Direction) -> Assessment {
        match (self, direction) {
            (_, Direction::Stable) => Assessment::Neutral,
            (Polarity::HigherIsBetter, Direction::Up) | (Polarity::LowerIsBetter, Direction::Down) => {
                Assessment::Improving
            }
            (Polarity::HigherIsBetter, Direction::Down) | (Polarity::LowerIsBetter, Direction::Up) => {
                Assessment::Worsening
            }
        }
    }
}

/// A scalar card: current value and its trend against the preceding window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiCard {
    pub value: Decimal,
    pub previous: Decimal,
    pub trend: Trend,
}

impl KpiCard {
    pub fn compare(value: Decimal, previous: Decimal) -> Self {
        Self {
            value,
            previous,
            trend: Trend::between(value, previous),
        }
    }
}

/// The computed payload of a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricValue {
    Kpi(KpiCard),
    Buckets { buckets: Vec<Bucket> },
    Distribution(SupplierDistribution),
}

/// Coarse failure class shown on a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Permission,
    Validation,
    Transient,
    Other,
}

impl From<ErrorKind> for FailureKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::PermissionDenied => FailureKind::Permission,
            ErrorKind::MalformedInput | ErrorKind::Conflict => FailureKind::Validation,
            ErrorKind::Transient => FailureKind::Transient,
            ErrorKind::NotFound | ErrorKind::Internal => FailureKind::Other,
        }
    }
}

/// Why a card could not be computed, as a one-line message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl MetricFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&PortError> for MetricFailure {
    fn from(err: &PortError) -> Self {
        Self::new(err.kind().into(), err.to_string())
    }
}

impl From<&DashboardError> for MetricFailure {
    fn from(err: &DashboardError) -> Self {
        match err {
            DashboardError::Port(port) => port.into(),
            DashboardError::Temporal(_) => Self::new(FailureKind::Validation, err.to_string()),
        }
    }
}

/// Per-card state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum MetricResult<T> {
    Pending,
    Ready(T),
    Failed(MetricFailure),
}

impl<T> MetricResult<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, MetricResult::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MetricResult::Failed(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            MetricResult::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Result<T, DashboardError>> for MetricResult<T> {
    fn from(result: Result<T, DashboardError>) -> Self {
        match result {
            Ok(value) => MetricResult::Ready(value),
            Err(err) => MetricResult::Failed((&err).into()),
        }
    }
}

/// One resolved card, as sent on the dashboard stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricUpdate {
    pub kind: MetricKind,
    pub result: MetricResult<MetricValue>,
}

/// Overall state of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardStatus {
    /// At least one card is still pending
    Loading,
    Complete,
    /// Every card resolved and at least one failed
    Degraded,
}

/// All cards of one dashboard load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricBoard {
    cards: BTreeMap<MetricKind, MetricResult<MetricValue>>,
}

impl Default for MetricBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricBoard {
    /// Every card starts pending
    pub fn new() -> Self {
        Self {
            cards: MetricKind::ALL
                .iter()
                .map(|&kind| (kind, MetricResult::Pending))
                .collect(),
        }
    }

    pub fn apply(&mut self, update: MetricUpdate) {
        self.cards.insert(update.kind, update.result);
    }

    pub fn get(&self, kind: MetricKind) -> &MetricResult<MetricValue> {
        self.cards.get(&kind).unwrap_or(&MetricResult::Pending)
    }

    /// Cards in [`MetricKind::ALL`] order
    pub fn cards(&self) -> impl Iterator<Item = (MetricKind, &MetricResult<MetricValue>)> {
        self.cards.iter().map(|(kind, result)| (*kind, result))
    }

    pub fn status(&self) -> BoardStatus {
        if self.cards.values().any(MetricResult::is_pending) {
            BoardStatus::Loading
        } else if self.cards.values().any(MetricResult::is_failed) {
            BoardStatus::Degraded
        } else {
            BoardStatus::Complete
        }
    }

    /// Marks cards that never reported as failed
    pub fn finish(&mut self) {
        for result in self.cards.values_mut() {
            if result.is_pending() {
                *result = MetricResult::Failed(MetricFailure::new(
                    FailureKind::Other,
                    "metric did not complete",
                ));
            }
        }
    }
}
