//! Dashboard filters and the claim query predicate
//!
//! A [`FilterSet`] is what the user picked on the dashboard. Every data-access
//! call is made with a [`ClaimQuery`]: the same narrowing criteria plus the
//! window a particular metric needs, which may differ from the dashboard range
//! (trailing 30 days, current month, the preceding period for trends).
//!
//! All criteria are conjunctive. Soft-deleted claims never match.

use serde::Serialize;

use core_kernel::{DateRange, SupplierId, TechnicianId};
use crate::claim::Claim;

/// Optional narrowing criteria shared by every dashboard query
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ClaimCriteria {
    pub supplier_id: Option<SupplierId>,
    pub technician_id: Option<TechnicianId>,
    /// Lower-cased, trimmed substring; never empty
    machine_model: Option<String>,
    /// Applies to cost and credit lines only
    pub account_code: Option<i32>,
}

impl ClaimCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_supplier(mut self, supplier_id: SupplierId) -> Self {
        self.supplier_id = Some(supplier_id);
        self
    }

    pub fn with_technician(mut self, technician_id: TechnicianId) -> Self {
        self.technician_id = Some(technician_id);
        self
    }

    /// Sets the machine-model substring; a blank value clears the criterion
    pub fn with_machine_model(mut self, model: impl AsRef<str>) -> Self {
        let model = model.as_ref().trim();
        self.machine_model = if model.is_empty() {
            None
        } else {
            Some(model.to_lowercase())
        };
        self
    }

    pub fn with_account_code(mut self, account_code: i32) -> Self {
        self.account_code = Some(account_code);
        self
    }

    pub fn machine_model(&self) -> Option<&str> {
        self.machine_model.as_deref()
    }

    /// The machine-model criterion as an `ILIKE` pattern with wildcards escaped
    pub fn machine_model_like_pattern(&self) -> Option<String> {
        self.machine_model.as_ref().map(|model| {
            let mut pattern = String::with_capacity(model.len() + 2);
            pattern.push('%');
            for ch in model.chars() {
                if matches!(ch, '%' | '_' | '\\') {
                    pattern.push('\\');
                }
                pattern.push(ch);
            }
            pattern.push('%');
            pattern
        })
    }

    /// Supplier, technician and machine-model criteria against a claim
    pub fn matches_claim(&self, claim: &Claim) -> bool {
        if let Some(supplier_id) = self.supplier_id {
            if claim.supplier_id != Some(supplier_id) {
                return false;
            }
        }
        if let Some(technician_id) = self.technician_id {
            if claim.technician_id != Some(technician_id) {
                return false;
            }
        }
        if let Some(model) = &self.machine_model {
            if !claim.machine_model.to_lowercase().contains(model.as_str()) {
                return false;
            }
        }
        true
    }

    /// Account-code criterion against a line's account code
    pub fn matches_account(&self, account_code: Option<i32>) -> bool {
        match self.account_code {
            Some(wanted) => account_code == Some(wanted),
            None => true,
        }
    }
}

/// Which claim timestamp a window is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    Created,
    Closed,
}

/// A date window bound to a claim timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClaimWindow {
    pub field: DateField,
    pub range: DateRange,
}

impl ClaimWindow {
    pub fn created(range: DateRange) -> Self {
        Self { field: DateField::Created, range }
    }

    pub fn closed(range: DateRange) -> Self {
        Self { field: DateField::Closed, range }
    }

    /// Claims without a closing timestamp never fall in a closed window
    pub fn contains(&self, claim: &Claim) -> bool {
        match self.field {
            DateField::Created => self.range.contains(claim.created_at),
            DateField::Closed => claim.closed_at.is_some_and(|closed| self.range.contains(closed)),
        }
    }

    /// Same field, the preceding window of equal length
    pub fn preceding(&self) -> Self {
        Self {
            field: self.field,
            range: self.range.preceding(),
        }
    }
}

/// Criteria plus window: the unit every data-access call is parameterized by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClaimQuery {
    pub criteria: ClaimCriteria,
    pub window: ClaimWindow,
}

impl ClaimQuery {
    pub fn new(criteria: ClaimCriteria, window: ClaimWindow) -> Self {
        Self { criteria, window }
    }

    /// The full claim predicate: not deleted, inside the window, every criterion met
    pub fn matches(&self, claim: &Claim) -> bool {
        !claim.is_deleted() && self.window.contains(claim) && self.criteria.matches_claim(claim)
    }

    /// Line predicate: the parent claim must match, then the account code
    pub fn matches_line(&self, claim: &Claim, account_code: Option<i32>) -> bool {
        self.matches(claim) && self.criteria.matches_account(account_code)
    }

    pub fn preceding(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            window: self.window.preceding(),
        }
    }
}

/// The dashboard's active filter selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterSet {
    pub criteria: ClaimCriteria,
    pub range: DateRange,
}

impl FilterSet {
    pub fn new(range: DateRange) -> Self {
        Self {
            criteria: ClaimCriteria::default(),
            range,
        }
    }

    pub fn with_criteria(mut self, criteria: ClaimCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Claims created inside the dashboard range
    pub fn created_query(&self) -> ClaimQuery {
        ClaimQuery::new(self.criteria.clone(), ClaimWindow::created(self.range))
    }

    /// The dashboard criteria applied to a different window
    pub fn query(&self, window: ClaimWindow) -> ClaimQuery {
        ClaimQuery::new(self.criteria.clone(), window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimDetails;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 9, 0, 0).unwrap()
    }

    fn april() -> DateRange {
        DateRange::new(
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn claim(model: &str, supplier: Option<SupplierId>) -> Claim {
        Claim::register(
            ClaimDetails {
                supplier_id: supplier,
                machine_model: model.to_string(),
                ..Default::default()
            },
            t0(),
            1,
        )
    }

    #[test]
    fn test_machine_model_is_case_insensitive_substring() {
        let criteria = ClaimCriteria::new().with_machine_model("tx-4");
        assert!(criteria.matches_claim(&claim("Heatpump TX-400", None)));
        assert!(!criteria.matches_claim(&claim("Heatpump TX-300", None)));
    }

    #[test]
    fn test_blank_machine_model_is_no_filter() {
        let criteria = ClaimCriteria::new().with_machine_model("   ");
        assert_eq!(criteria, ClaimCriteria::default());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        let criteria = ClaimCriteria::new().with_machine_model("50%_Unit");
        assert_eq!(
            criteria.machine_model_like_pattern().as_deref(),
            Some("%50\\%\\_unit%")
        );
    }

    #[test]
    fn test_criteria_are_conjunctive() {
        let supplier = SupplierId::new();
        let criteria = ClaimCriteria::new()
            .with_supplier(supplier)
            .with_machine_model("tx");
        assert!(criteria.matches_claim(&claim("TX-1", Some(supplier))));
        assert!(!criteria.matches_claim(&claim("TX-1", Some(SupplierId::new()))));
        assert!(!criteria.matches_claim(&claim("AB-1", Some(supplier))));
        assert!(!criteria.matches_claim(&claim("TX-1", None)));
    }

    #[test]
    fn test_deleted_claims_never_match() {
        let query = FilterSet::new(april()).created_query();
        let mut c = claim("TX-1", None);
        assert!(query.matches(&c));
        c.soft_delete(t0());
        assert!(!query.matches(&c));
    }

    #[test]
    fn test_closed_window_ignores_open_claims() {
        let window = ClaimWindow::closed(april());
        let mut c = claim("TX-1", None);
        assert!(!window.contains(&c));
        c.closed_at = Some(t0() + Duration::days(2));
        assert!(window.contains(&c));
    }

    #[test]
    fn test_account_code_only_narrows_lines() {
        let filter = FilterSet::new(april())
            .with_criteria(ClaimCriteria::new().with_account_code(4010));
        let query = filter.created_query();
        let c = claim("TX-1", None);
        assert!(query.matches(&c));
        assert!(query.matches_line(&c, Some(4010)));
        assert!(!query.matches_line(&c, Some(4020)));
        assert!(!query.matches_line(&c, None));
    }
}
