//! Claim aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, SupplierId, TechnicianId};
use crate::error::ClaimError;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Registered, not yet picked up
    New,
    /// Waiting on supplier or technician feedback
    Pending,
    /// Accepted by the supplier
    Approved,
    Rejected,
    /// Credit booked in accounting
    Booked,
    Closed,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 6] = [
        ClaimStatus::New,
        ClaimStatus::Pending,
        ClaimStatus::Approved,
        ClaimStatus::Rejected,
        ClaimStatus::Booked,
        ClaimStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::New => "new",
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::Booked => "booked",
            ClaimStatus::Closed => "closed",
        }
    }

    /// Pending or Approved
    pub fn is_open(&self) -> bool {
        matches!(self, ClaimStatus::Pending | ClaimStatus::Approved)
    }

    /// Booked and Closed claims can no longer become overdue
    pub fn is_settled(&self) -> bool {
        matches!(self, ClaimStatus::Booked | ClaimStatus::Closed)
    }

    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (self, target),
            (New, Pending)
                | (New, Rejected)
                | (Pending, New)
                | (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Booked)
                | (Approved, Rejected)
                | (Booked, Closed)
                | (Rejected, Closed)
        )
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ClaimError::UnknownStatus(s.to_string()))
    }
}

/// The user-supplied part of a claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDetails {
    pub supplier_id: Option<SupplierId>,
    pub technician_id: Option<TechnicianId>,
    pub machine_model: String,
    pub warranty: bool,
    pub department: String,
    pub root_cause: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// A warranty claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub claim_number: String,
    pub status: ClaimStatus,
    pub supplier_id: Option<SupplierId>,
    pub technician_id: Option<TechnicianId>,
    /// Free text as typed by the user
    pub machine_model: String,
    pub warranty: bool,
    pub department: String,
    pub root_cause: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Soft-delete marker; deleted claims never take part in aggregates
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Registers a new claim in status `New`
    ///
    /// `sequence` comes from the store's claim-number allocator and must be
    /// unique; it becomes the numeric part of the claim number.
    pub fn register(details: ClaimDetails, created_at: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            id: ClaimId::new_v7(),
            claim_number: claim_number(sequence, created_at),
            status: ClaimStatus::New,
            supplier_id: details.supplier_id,
            technician_id: details.technician_id,
            machine_model: details.machine_model,
            warranty: details.warranty,
            department: details.department,
            root_cause: details.root_cause,
            due_date: details.due_date,
            created_at,
            closed_at: None,
            deleted_at: None,
            updated_at: created_at,
        }
    }

    /// Moves the claim along its lifecycle; closing stamps `closed_at`
    pub fn update_status(&mut self, status: ClaimStatus, at: DateTime<Utc>) -> Result<(), ClaimError> {
        if self.is_deleted() {
            return Err(ClaimError::ClaimDeleted(self.id));
        }
        if !self.status.can_transition_to(status) {
            return Err(ClaimError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        if status == ClaimStatus::Closed {
            self.closed_at = Some(at);
        }
        self.updated_at = at;
        Ok(())
    }

    /// Marks the claim deleted. Deleting twice keeps the first timestamp.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(at);
            self.updated_at = at;
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Past its due date and not yet booked or closed
    pub fn is_overdue(&self, as_of: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => due < as_of.date_naive() && !self.status.is_settled(),
            None => false,
        }
    }

    /// Whole days between registration and closing
    pub fn lead_time_days(&self) -> Option<i64> {
        self.closed_at.map(|closed| (closed - self.created_at).num_days())
    }
}

fn claim_number(sequence: u64, created_at: DateTime<Utc>) -> String {
    // Format: WC-YYYY-NNNNNN, widening past six digits
    format!("WC-{}-{:06}", created_at.format("%Y"), sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn registered() -> Claim {
        Claim::register(
            ClaimDetails {
                machine_model: "TX-400".to_string(),
                department: "Service".to_string(),
                ..Default::default()
            },
            t0(),
            42,
        )
    }

    #[test]
    fn test_register_starts_new() {
        let claim = registered();
        assert_eq!(claim.status, ClaimStatus::New);
        assert_eq!(claim.claim_number, "WC-2024-000042");
        assert!(claim.closed_at.is_none());
        assert!(!claim.is_deleted());
    }

    #[test]
    fn test_claim_number_widens_past_six_digits() {
        let claim = Claim::register(ClaimDetails::default(), t0(), 12_345_678);
        assert_eq!(claim.claim_number, "WC-2024-12345678");
    }

    #[test]
    fn test_full_lifecycle_stamps_closed_at() {
        let mut claim = registered();
        let closed_at = t0() + Duration::days(12);
        claim.update_status(ClaimStatus::Pending, t0()).unwrap();
        claim.update_status(ClaimStatus::Approved, t0()).unwrap();
        claim.update_status(ClaimStatus::Booked, t0()).unwrap();
        claim.update_status(ClaimStatus::Closed, closed_at).unwrap();
        assert_eq!(claim.closed_at, Some(closed_at));
        assert_eq!(claim.lead_time_days(), Some(12));
    }

    #[test]
    fn test_invalid_transition() {
        let mut claim = registered();
        let err = claim.update_status(ClaimStatus::Booked, t0()).unwrap_err();
        assert_eq!(
            err,
            ClaimError::InvalidStatusTransition {
                from: "new".to_string(),
                to: "booked".to_string()
            }
        );
        assert_eq!(claim.status, ClaimStatus::New);
    }

    #[test]
    fn test_deleted_claim_cannot_move() {
        let mut claim = registered();
        claim.soft_delete(t0());
        assert!(matches!(
            claim.update_status(ClaimStatus::Pending, t0()),
            Err(ClaimError::ClaimDeleted(_))
        ));
    }

    #[test]
    fn test_soft_delete_is_idempotent() {
        let mut claim = registered();
        claim.soft_delete(t0());
        claim.soft_delete(t0() + Duration::days(3));
        assert_eq!(claim.deleted_at, Some(t0()));
    }

    #[test]
    fn test_overdue_requires_unsettled_status() {
        let mut claim = registered();
        claim.due_date = Some(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
        let later = Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap();
        assert!(claim.is_overdue(later));
        // Due today is not overdue yet
        assert!(!claim.is_overdue(Utc.with_ymd_and_hms(2024, 5, 10, 23, 0, 0).unwrap()));

        claim.status = ClaimStatus::Booked;
        assert!(!claim.is_overdue(later));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Approved".parse::<ClaimStatus>().unwrap(), ClaimStatus::Approved);
        assert_eq!(" closed ".parse::<ClaimStatus>().unwrap(), ClaimStatus::Closed);
        assert!("archived".parse::<ClaimStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ClaimStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
