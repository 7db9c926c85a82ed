//! Test Data Builders
//!
//! Builders for claims and ledger lines. Tests set only the fields they
//! care about; everything else comes from the fixtures.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use core_kernel::{SupplierId, TechnicianId};
use domain_claims::ports::mock::InMemoryClaimsStore;
use domain_claims::{Claim, ClaimDetails, ClaimStatus, CostLine, CreditNote, NewLine, Supplier};

use crate::fixtures::{LedgerFixtures, StringFixtures, TemporalFixtures};

/// Claim-number sequence shared by every built claim. Starts high so built
/// claims never collide with numbers a test database hands out.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(900_000);

/// Builder for claims in any lifecycle state
#[derive(Debug, Clone)]
pub struct ClaimBuilder {
    details: ClaimDetails,
    status: ClaimStatus,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Default for ClaimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimBuilder {
    pub fn new() -> Self {
        Self {
            details: ClaimDetails {
                machine_model: StringFixtures::machine_model().to_string(),
                department: StringFixtures::department().to_string(),
                ..ClaimDetails::default()
            },
            status: ClaimStatus::New,
            created_at: TemporalFixtures::in_period(1),
            closed_at: None,
            deleted_at: None,
        }
    }

    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        self.status = status;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Closes the claim at the given instant
    pub fn closed_at(mut self, at: DateTime<Utc>) -> Self {
        self.status = ClaimStatus::Closed;
        self.closed_at = Some(at);
        self
    }

    pub fn deleted_at(mut self, at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(at);
        self
    }

    pub fn with_supplier(mut self, id: SupplierId) -> Self {
        self.details.supplier_id = Some(id);
        self
    }

    pub fn with_technician(mut self, id: TechnicianId) -> Self {
        self.details.technician_id = Some(id);
        self
    }

    pub fn with_machine_model(mut self, model: impl Into<String>) -> Self {
        self.details.machine_model = model.into();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.details.department = department.into();
        self
    }

    pub fn with_root_cause(mut self, cause: impl Into<String>) -> Self {
        self.details.root_cause = Some(cause.into());
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.details.due_date = Some(date);
        self
    }

    pub fn warranty(mut self) -> Self {
        self.details.warranty = true;
        self
    }

    /// The details as they would arrive from a create request
    pub fn details(&self) -> ClaimDetails {
        self.details.clone()
    }

    pub fn build(self) -> Claim {
        let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let mut claim = Claim::register(self.details, self.created_at, sequence);
        claim.status = self.status;
        claim.closed_at = self.closed_at;
        if let Some(at) = self.deleted_at {
            claim.soft_delete(at);
        }
        claim
    }
}

/// Builder for cost lines and credit notes; both share the same shape
#[derive(Debug, Clone)]
pub struct CostLineBuilder {
    line: NewLine,
}

impl CostLineBuilder {
    /// A parts line on the claim's creation date
    pub fn for_claim(claim: &Claim) -> Self {
        Self {
            line: NewLine {
                claim_id: claim.id,
                amount: LedgerFixtures::repair_cost(),
                account_code: Some(LedgerFixtures::parts_account()),
                created_on: claim.created_at.date_naive(),
            },
        }
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.line.amount = amount;
        self
    }

    pub fn account(mut self, code: i32) -> Self {
        self.line.account_code = Some(code);
        self
    }

    pub fn without_account(mut self) -> Self {
        self.line.account_code = None;
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.line.created_on = date;
        self
    }

    pub fn new_line(self) -> NewLine {
        self.line
    }

    pub fn cost_line(self) -> CostLine {
        CostLine::new(self.line).expect("builder amounts must be positive")
    }

    pub fn credit_note(self) -> CreditNote {
        CreditNote::new(self.line).expect("builder amounts must be positive")
    }
}

/// Seeds an in-memory store with a small, known data set
#[derive(Debug, Default)]
pub struct StoreSeeder {
    claims: Vec<Claim>,
    cost_lines: Vec<CostLine>,
    credit_notes: Vec<CreditNote>,
    suppliers: Vec<Supplier>,
}

impl StoreSeeder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    pub fn cost_line(mut self, line: CostLine) -> Self {
        self.cost_lines.push(line);
        self
    }

    pub fn credit_note(mut self, note: CreditNote) -> Self {
        self.credit_notes.push(note);
        self
    }

    pub fn supplier(mut self, supplier: Supplier) -> Self {
        self.suppliers.push(supplier);
        self
    }

    pub async fn seed(self) -> InMemoryClaimsStore {
        let store = InMemoryClaimsStore::new();
        for supplier in self.suppliers {
            store.insert_supplier(supplier).await;
        }
        for claim in self.claims {
            store.insert_claim(claim).await;
        }
        for line in self.cost_lines {
            store.insert_cost_line(line).await;
        }
        for note in self.credit_notes {
            store.insert_credit_note(note).await;
        }
        store
    }
}
