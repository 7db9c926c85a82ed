//! Period-over-period trend calculation

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Sign of a change; the magnitude lives in [`Trend::percentage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Stable,
}

/// Change of a metric between two adjacent windows of equal length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    /// Absolute, whole-number percentage
    pub percentage: Decimal,
    pub direction: Direction,
}

impl Trend {
    pub fn stable() -> Self {
        Self {
            percentage: Decimal::ZERO,
            direction: Direction::Stable,
        }
    }

    /// Compares `current` against `previous`.
    ///
    /// A zero previous value always yields a stable trend of 0%.
    pub fn between(current: Decimal, previous: Decimal) -> Self {
        if previous.is_zero() {
            return Self::stable();
        }

        let change = current
            .checked_sub(previous)
            .and_then(|delta| delta.checked_div(previous))
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
            .map(round_whole);

        match change {
            Some(pct) if pct > Decimal::ZERO => Self {
                percentage: pct,
                direction: Direction::Up,
            },
            Some(pct) if pct < Decimal::ZERO => Self {
                percentage: pct.abs(),
                direction: Direction::Down,
            },
            _ => Self::stable(),
        }
    }
}

/// Rounds to a whole number, halves away from zero
pub(crate) fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}
