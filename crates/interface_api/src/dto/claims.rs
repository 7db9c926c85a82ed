//! Claims DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ClaimId, SupplierId, TechnicianId};
use domain_claims::{Claim, ClaimDetails, ClaimStatus, CostLine, CreditNote, NewLine, Supplier};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClaimRequest {
    pub supplier_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub machine_model: String,
    #[serde(default)]
    pub warranty: bool,
    #[validate(length(min = 1, max = 100))]
    pub department: String,
    #[validate(length(max = 200))]
    pub root_cause: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl From<CreateClaimRequest> for ClaimDetails {
    fn from(request: CreateClaimRequest) -> Self {
        ClaimDetails {
            supplier_id: request.supplier_id.map(SupplierId::from_uuid),
            technician_id: request.technician_id.map(TechnicianId::from_uuid),
            machine_model: request.machine_model,
            warranty: request.warranty,
            department: request.department,
            root_cause: request.root_cause,
            due_date: request.due_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ClaimStatus,
}

/// Body of both cost-line and credit-note requests
#[derive(Debug, Deserialize, Validate)]
pub struct AddLineRequest {
    pub amount: Decimal,
    #[validate(range(min = 1, max = 999999))]
    pub account_code: Option<i32>,
    /// Defaults to the day of the request
    pub created_on: Option<NaiveDate>,
}

impl AddLineRequest {
    pub fn into_line(self, claim_id: ClaimId, today: NaiveDate) -> NewLine {
        NewLine {
            claim_id,
            amount: self.amount,
            account_code: self.account_code,
            created_on: self.created_on.unwrap_or(today),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub id: Uuid,
    pub claim_number: String,
    pub status: ClaimStatus,
    pub supplier_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
    pub machine_model: String,
    pub warranty: bool,
    pub department: String,
    pub root_cause: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<Claim> for ClaimResponse {
    fn from(claim: Claim) -> Self {
        Self {
            id: claim.id.into(),
            claim_number: claim.claim_number,
            status: claim.status,
            supplier_id: claim.supplier_id.map(Uuid::from),
            technician_id: claim.technician_id.map(Uuid::from),
            machine_model: claim.machine_model,
            warranty: claim.warranty,
            department: claim.department,
            root_cause: claim.root_cause,
            due_date: claim.due_date,
            created_at: claim.created_at,
            closed_at: claim.closed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LineResponse {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub amount: Decimal,
    pub account_code: Option<i32>,
    pub created_on: NaiveDate,
}

impl From<CostLine> for LineResponse {
    fn from(line: CostLine) -> Self {
        Self {
            id: line.id.into(),
            claim_id: line.claim_id.into(),
            amount: line.amount,
            account_code: line.account_code,
            created_on: line.created_on,
        }
    }
}

impl From<CreditNote> for LineResponse {
    fn from(note: CreditNote) -> Self {
        Self {
            id: note.id.into(),
            claim_id: note.claim_id.into(),
            amount: note.amount,
            account_code: note.account_code,
            created_on: note.created_on,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupplierResponse {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

impl From<Supplier> for SupplierResponse {
    fn from(supplier: Supplier) -> Self {
        Self {
            id: supplier.id.into(),
            active: supplier.is_active(),
            name: supplier.name,
        }
    }
}
