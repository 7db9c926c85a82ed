//! Cost lines and credit notes
//!
//! Both are positive amounts attached to a claim. A cost line adds to the
//! claim's total and a credit note reduces it, so the sign lives in the type
//! and never in the stored amount.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, CostLineId, CreditNoteId};
use crate::claim::Claim;
use crate::error::ClaimError;

/// Fields common to both line kinds
pub trait LedgerLine {
    fn claim_id(&self) -> ClaimId;
    fn amount(&self) -> Decimal;
    fn account_code(&self) -> Option<i32>;
}

/// Amounts are stored as NUMERIC(14, 2)
pub const AMOUNT_SCALE: u32 = 2;

/// Input for a new cost line or credit note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLine {
    pub claim_id: ClaimId,
    pub amount: Decimal,
    pub account_code: Option<i32>,
    pub created_on: NaiveDate,
}

impl NewLine {
    fn validate(&self) -> Result<(), ClaimError> {
        if self.amount <= Decimal::ZERO {
            return Err(ClaimError::InvalidAmount(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        if self.amount.normalize().scale() > AMOUNT_SCALE {
            return Err(ClaimError::InvalidAmount(format!(
                "amount must have at most {} decimal places, got {}",
                AMOUNT_SCALE, self.amount
            )));
        }
        Ok(())
    }
}

/// A warranty-related expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLine {
    pub id: CostLineId,
    pub claim_id: ClaimId,
    pub amount: Decimal,
    pub account_code: Option<i32>,
    pub created_on: NaiveDate,
}

impl CostLine {
    pub fn new(line: NewLine) -> Result<Self, ClaimError> {
        line.validate()?;
        Ok(Self {
            id: CostLineId::new_v7(),
            claim_id: line.claim_id,
            amount: line.amount,
            account_code: line.account_code,
            created_on: line.created_on,
        })
    }
}

/// A reduction netted against a claim's cost lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditNote {
    pub id: CreditNoteId,
    pub claim_id: ClaimId,
    pub amount: Decimal,
    pub account_code: Option<i32>,
    pub created_on: NaiveDate,
}

impl CreditNote {
    pub fn new(line: NewLine) -> Result<Self, ClaimError> {
        line.validate()?;
        Ok(Self {
            id: CreditNoteId::new_v7(),
            claim_id: line.claim_id,
            amount: line.amount,
            account_code: line.account_code,
            created_on: line.created_on,
        })
    }
}

impl LedgerLine for CostLine {
    fn claim_id(&self) -> ClaimId {
        self.claim_id
    }

    fn amount(&self) -> Decimal {
        self.amount
    }

    fn account_code(&self) -> Option<i32> {
        self.account_code
    }
}

impl LedgerLine for CreditNote {
    fn claim_id(&self) -> ClaimId {
        self.claim_id
    }

    fn amount(&self) -> Decimal {
        self.amount
    }

    fn account_code(&self) -> Option<i32> {
        self.account_code
    }
}

/// A line together with the parent claim it was selected through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joined<L> {
    pub line: L,
    pub claim: Claim,
}

/// Sum of line amounts
pub fn total<'a, L, I>(lines: I) -> Decimal
where
    L: LedgerLine + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines.into_iter().map(LedgerLine::amount).sum()
}

/// Net total = Σcost − Σcredit
pub fn net_total<'a, C, N>(costs: C, credits: N) -> Decimal
where
    C: IntoIterator<Item = &'a CostLine>,
    N: IntoIterator<Item = &'a CreditNote>,
{
    total(costs) - total(credits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_line(amount: Decimal) -> NewLine {
        NewLine {
            claim_id: ClaimId::new(),
            amount,
            account_code: Some(4010),
            created_on: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
        }
    }

    #[test]
    fn test_non_positive_amounts_are_rejected() {
        assert!(matches!(CostLine::new(new_line(dec!(0))), Err(ClaimError::InvalidAmount(_))));
        assert!(CreditNote::new(new_line(dec!(-12.50))).is_err());
    }

    #[test]
    fn test_amounts_finer_than_cents_are_rejected() {
        assert!(matches!(CostLine::new(new_line(dec!(0.004))), Err(ClaimError::InvalidAmount(_))));
        assert!(CreditNote::new(new_line(dec!(10.005))).is_err());
        // Trailing zeros do not count
        assert_eq!(CostLine::new(new_line(dec!(10.5000))).unwrap().amount, dec!(10.5000));
        assert!(CostLine::new(new_line(dec!(0.01))).is_ok());
    }

    #[test]
    fn test_net_total() {
        let costs = vec![
            CostLine::new(new_line(dec!(1200.00))).unwrap(),
            CostLine::new(new_line(dec!(300.50))).unwrap(),
        ];
        let credits = vec![CreditNote::new(new_line(dec!(500.25))).unwrap()];
        assert_eq!(net_total(&costs, &credits), dec!(1000.25));
    }

    #[test]
    fn test_net_total_of_nothing_is_zero() {
        let costs: Vec<CostLine> = Vec::new();
        let credits: Vec<CreditNote> = Vec::new();
        assert_eq!(net_total(&costs, &credits), Decimal::ZERO);
    }
}
