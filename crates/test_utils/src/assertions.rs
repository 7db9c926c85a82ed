//! Custom Test Assertions
//!
//! Assertion helpers for dashboard boards and cards with failure messages
//! that name the card involved.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::PortError;
use domain_dashboard::{
    Direction, FailureKind, KpiCard, MetricBoard, MetricKind, MetricResult, MetricValue, Share,
};

/// Returns the KPI card for `kind`, panicking if the card is not a ready KPI
pub fn expect_kpi(board: &MetricBoard, kind: MetricKind) -> KpiCard {
    match board.get(kind) {
        MetricResult::Ready(MetricValue::Kpi(card)) => card.clone(),
        other => panic!("Expected {} to be a ready KPI card, got {:?}", kind, other),
    }
}

/// Asserts the value of a KPI card
pub fn assert_kpi_value(board: &MetricBoard, kind: MetricKind, expected: Decimal) {
    let card = expect_kpi(board, kind);
    assert_eq!(
        card.value, expected,
        "{}: expected value {}, got {}",
        kind, expected, card.value
    );
}

/// Asserts the trend of a KPI card
pub fn assert_trend(board: &MetricBoard, kind: MetricKind, direction: Direction, percentage: Decimal) {
    let card = expect_kpi(board, kind);
    assert_eq!(
        (card.trend.direction, card.trend.percentage),
        (direction, percentage),
        "{}: unexpected trend (value {}, previous {})",
        kind,
        card.value,
        card.previous
    );
}

/// Asserts that a card failed with the given kind
pub fn assert_card_failed(board: &MetricBoard, kind: MetricKind, failure: FailureKind) {
    match board.get(kind) {
        MetricResult::Failed(actual) => assert_eq!(
            actual.kind, failure,
            "{} failed with {:?} ({}), expected {:?}",
            kind, actual.kind, actual.message, failure
        ),
        other => panic!("Expected {} to fail, got {:?}", kind, other),
    }
}

/// Asserts that share percentages sum to 100 within one point per share
pub fn assert_shares_sum_to_hundred(shares: &[Share]) {
    if shares.is_empty() {
        return;
    }
    let sum: Decimal = shares.iter().map(|s| s.percentage).sum();
    let tolerance = Decimal::from(shares.len() as i64);
    assert!(
        (sum - dec!(100)).abs() <= tolerance,
        "Share percentages sum to {}, expected 100 +/- {}",
        sum,
        tolerance
    );
}

/// Asserts that a port result failed as transient
pub fn assert_transient<T: std::fmt::Debug>(result: &Result<T, PortError>) {
    match result {
        Err(e) => assert!(e.is_transient(), "Expected a transient error, got {:?}", e),
        Ok(v) => panic!("Expected a transient error, got Ok({:?})", v),
    }
}
