//! Claims Domain Ports
//!
//! The dashboard reads through [`ClaimsQueryPort`] and the rest of the
//! application writes through [`ClaimsCommandPort`]. Adapters:
//!
//! - **PostgreSQL**: `infra_db::PgClaimsAdapter`
//! - **In-memory**: [`mock::InMemoryClaimsStore`], for tests and local runs
//!
//! Every query is made with a [`ClaimQuery`] so that cost and credit lines are
//! always selected through their parent claim's predicate, never independently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, DomainPort, HealthCheckable, PortError};

use crate::claim::{Claim, ClaimDetails, ClaimStatus};
use crate::filter::ClaimQuery;
use crate::line::{CostLine, CreditNote, Joined, NewLine};
use crate::supplier::Supplier;

/// Logical backend tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Claims,
    CostLine,
    CreditNote,
    Suppliers,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Claims, Table::CostLine, Table::CreditNote, Table::Suppliers];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Claims => "claims",
            Table::CostLine => "cost_line",
            Table::CreditNote => "credit_note",
            Table::Suppliers => "suppliers",
        }
    }
}

/// Write operations, by the tables whose cached reads they invalidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    CreateClaim,
    UpdateClaimStatus,
    SoftDeleteClaim,
    AddCostLine,
    AddCreditNote,
    CreateSupplier,
}

impl Mutation {
    /// Line queries join on claims, so claim writes invalidate line reads too
    pub fn touched_tables(&self) -> &'static [Table] {
        match self {
            Mutation::CreateClaim | Mutation::UpdateClaimStatus | Mutation::SoftDeleteClaim => {
                &[Table::Claims, Table::CostLine, Table::CreditNote]
            }
            Mutation::AddCostLine => &[Table::CostLine],
            Mutation::AddCreditNote => &[Table::CreditNote],
            Mutation::CreateSupplier => &[Table::Suppliers],
        }
    }
}

/// Read side used by the dashboard
#[async_trait]
pub trait ClaimsQueryPort: DomainPort + HealthCheckable {
    /// Claims matching the query, newest first
    async fn fetch_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, PortError>;

    /// Cost lines whose parent claim matches the query
    async fn fetch_cost_lines(&self, query: &ClaimQuery) -> Result<Vec<Joined<CostLine>>, PortError>;

    /// Credit notes whose parent claim matches the query
    async fn fetch_credit_notes(&self, query: &ClaimQuery) -> Result<Vec<Joined<CreditNote>>, PortError>;

    /// All suppliers, including soft-deleted ones, as a name lookup
    async fn fetch_suppliers(&self) -> Result<Vec<Supplier>, PortError>;
}

/// Write side
#[async_trait]
pub trait ClaimsCommandPort: DomainPort {
    async fn create_claim(&self, details: ClaimDetails) -> Result<Claim, PortError>;

    async fn update_claim_status(&self, id: ClaimId, status: ClaimStatus) -> Result<Claim, PortError>;

    /// Sets the deletion timestamp; claims are never hard-deleted
    async fn soft_delete_claim(&self, id: ClaimId) -> Result<(), PortError>;

    async fn add_cost_line(&self, line: NewLine) -> Result<CostLine, PortError>;

    async fn add_credit_note(&self, line: NewLine) -> Result<CreditNote, PortError>;

    async fn create_supplier(&self, name: String) -> Result<Supplier, PortError>;
}

/// In-memory adapter with fault injection
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{Mutex, RwLock};

    use core_kernel::{AdapterHealth, HealthCheckResult};
    use crate::line::LedgerLine;

    #[derive(Debug, Default)]
    struct StoreState {
        claims: HashMap<ClaimId, Claim>,
        cost_lines: Vec<CostLine>,
        credit_notes: Vec<CreditNote>,
        suppliers: Vec<Supplier>,
        last_claim_sequence: u64,
    }

    #[derive(Debug, Clone, Copy)]
    struct Fault {
        remaining: u32,
        make: fn() -> PortError,
    }

    /// Thread-safe in-memory store implementing both claims ports
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryClaimsStore {
        state: Arc<RwLock<StoreState>>,
        faults: Arc<Mutex<HashMap<Table, Fault>>>,
        reads: Arc<Mutex<HashMap<Table, usize>>>,
    }

    impl InMemoryClaimsStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Inserts a fully-formed claim, bypassing the lifecycle
        pub async fn insert_claim(&self, claim: Claim) {
            self.state.write().await.claims.insert(claim.id, claim);
        }

        pub async fn insert_cost_line(&self, line: CostLine) {
            self.state.write().await.cost_lines.push(line);
        }

        pub async fn insert_credit_note(&self, note: CreditNote) {
            self.state.write().await.credit_notes.push(note);
        }

        pub async fn insert_supplier(&self, supplier: Supplier) {
            self.state.write().await.suppliers.push(supplier);
        }

        /// Makes the next `times` reads of `table` fail with `make()`
        pub async fn fail_next(&self, table: Table, times: u32, make: fn() -> PortError) {
            self.faults
                .lock()
                .await
                .insert(table, Fault { remaining: times, make });
        }

        /// Number of read calls that reached the store for `table`
        pub async fn read_count(&self, table: Table) -> usize {
            self.reads.lock().await.get(&table).copied().unwrap_or(0)
        }

        async fn begin_read(&self, table: Table) -> Result<(), PortError> {
            *self.reads.lock().await.entry(table).or_insert(0) += 1;

            let mut faults = self.faults.lock().await;
            if let Some(fault) = faults.get_mut(&table) {
                if fault.remaining > 0 {
                    fault.remaining -= 1;
                    return Err((fault.make)());
                }
                faults.remove(&table);
            }
            Ok(())
        }

        fn join<L: LedgerLine + Clone>(
            state: &StoreState,
            lines: &[L],
            query: &ClaimQuery,
        ) -> Vec<Joined<L>> {
            lines
                .iter()
                .filter_map(|line| {
                    let claim = state.claims.get(&line.claim_id())?;
                    query
                        .matches_line(claim, line.account_code())
                        .then(|| Joined { line: line.clone(), claim: claim.clone() })
                })
                .collect()
        }

        async fn live_claim(&self, id: ClaimId) -> Result<(), PortError> {
            let state = self.state.read().await;
            match state.claims.get(&id) {
                Some(claim) if !claim.is_deleted() => Ok(()),
                Some(_) => Err(PortError::ForeignKeyConflict {
                    message: format!("claim {} is deleted", id),
                }),
                None => Err(PortError::ForeignKeyConflict {
                    message: format!("claim {} does not exist", id),
                }),
            }
        }

        fn now() -> DateTime<Utc> {
            Utc::now()
        }
    }

    impl DomainPort for InMemoryClaimsStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryClaimsStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "in-memory-claims".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: None,
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl ClaimsQueryPort for InMemoryClaimsStore {
        async fn fetch_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, PortError> {
            self.begin_read(Table::Claims).await?;
            let state = self.state.read().await;
            let mut claims: Vec<Claim> = state
                .claims
                .values()
                .filter(|claim| query.matches(claim))
                .cloned()
                .collect();
            claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(claims)
        }

        async fn fetch_cost_lines(&self, query: &ClaimQuery) -> Result<Vec<Joined<CostLine>>, PortError> {
            self.begin_read(Table::CostLine).await?;
            let state = self.state.read().await;
            Ok(Self::join(&state, &state.cost_lines, query))
        }

        async fn fetch_credit_notes(&self, query: &ClaimQuery) -> Result<Vec<Joined<CreditNote>>, PortError> {
            self.begin_read(Table::CreditNote).await?;
            let state = self.state.read().await;
            Ok(Self::join(&state, &state.credit_notes, query))
        }

        async fn fetch_suppliers(&self) -> Result<Vec<Supplier>, PortError> {
            self.begin_read(Table::Suppliers).await?;
            Ok(self.state.read().await.suppliers.clone())
        }
    }

    #[async_trait]
    impl ClaimsCommandPort for InMemoryClaimsStore {
        async fn create_claim(&self, details: ClaimDetails) -> Result<Claim, PortError> {
            let mut state = self.state.write().await;
            state.last_claim_sequence += 1;
            let claim = Claim::register(details, Self::now(), state.last_claim_sequence);
            state.claims.insert(claim.id, claim.clone());
            Ok(claim)
        }

        async fn update_claim_status(&self, id: ClaimId, status: ClaimStatus) -> Result<Claim, PortError> {
            let mut state = self.state.write().await;
            let claim = state
                .claims
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Claim", id))?;
            claim.update_status(status, Self::now())?;
            Ok(claim.clone())
        }

        async fn soft_delete_claim(&self, id: ClaimId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let claim = state
                .claims
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Claim", id))?;
            claim.soft_delete(Self::now());
            Ok(())
        }

        async fn add_cost_line(&self, line: NewLine) -> Result<CostLine, PortError> {
            self.live_claim(line.claim_id).await?;
            let line = CostLine::new(line)?;
            self.state.write().await.cost_lines.push(line.clone());
            Ok(line)
        }

        async fn add_credit_note(&self, line: NewLine) -> Result<CreditNote, PortError> {
            self.live_claim(line.claim_id).await?;
            let note = CreditNote::new(line)?;
            self.state.write().await.credit_notes.push(note.clone());
            Ok(note)
        }

        async fn create_supplier(&self, name: String) -> Result<Supplier, PortError> {
            let name = name.trim();
            if name.is_empty() {
                return Err(PortError::malformed_field("supplier name must not be empty", "name"));
            }
            let mut state = self.state.write().await;
            if state
                .suppliers
                .iter()
                .any(|s| s.is_active() && s.name.eq_ignore_ascii_case(name))
            {
                return Err(PortError::UniqueConflict {
                    message: format!("supplier '{}' already exists", name),
                });
            }
            let supplier = Supplier::new(name);
            state.suppliers.push(supplier.clone());
            Ok(supplier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::mock::InMemoryClaimsStore;
    use crate::filter::{ClaimCriteria, FilterSet};
    use chrono::{Duration, NaiveDate, Utc};
    use core_kernel::DateRange;
    use rust_decimal_macros::dec;

    fn around_now() -> FilterSet {
        let now = Utc::now();
        FilterSet::new(DateRange::new(now - Duration::days(1), now + Duration::days(1)).unwrap())
    }

    fn details(model: &str) -> ClaimDetails {
        ClaimDetails {
            machine_model: model.to_string(),
            department: "Service".to_string(),
            ..Default::default()
        }
    }

    fn line(claim_id: ClaimId, amount: rust_decimal::Decimal, account_code: i32) -> NewLine {
        NewLine {
            claim_id,
            amount,
            account_code: Some(account_code),
            created_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_lines_follow_parent_predicate() {
        let store = InMemoryClaimsStore::new();
        let kept = store.create_claim(details("TX-400")).await.unwrap();
        let other = store.create_claim(details("AB-100")).await.unwrap();
        store.add_cost_line(line(kept.id, dec!(100), 4010)).await.unwrap();
        store.add_cost_line(line(other.id, dec!(50), 4010)).await.unwrap();

        let query = around_now()
            .with_criteria(ClaimCriteria::new().with_machine_model("tx"))
            .created_query();
        let lines = store.fetch_cost_lines(&query).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].claim.id, kept.id);
    }

    #[tokio::test]
    async fn test_soft_deleted_claims_and_their_lines_disappear() {
        let store = InMemoryClaimsStore::new();
        let claim = store.create_claim(details("TX-400")).await.unwrap();
        store.add_cost_line(line(claim.id, dec!(100), 4010)).await.unwrap();
        store.soft_delete_claim(claim.id).await.unwrap();

        let query = around_now().created_query();
        assert!(store.fetch_claims(&query).await.unwrap().is_empty());
        assert!(store.fetch_cost_lines(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lines_on_deleted_claim_are_rejected() {
        let store = InMemoryClaimsStore::new();
        let claim = store.create_claim(details("TX-400")).await.unwrap();
        store.soft_delete_claim(claim.id).await.unwrap();
        let err = store.add_credit_note(line(claim.id, dec!(10), 4010)).await.unwrap_err();
        assert!(matches!(err, PortError::ForeignKeyConflict { .. }));
    }

    #[tokio::test]
    async fn test_invalid_transition_is_malformed_input() {
        let store = InMemoryClaimsStore::new();
        let claim = store.create_claim(details("TX-400")).await.unwrap();
        let err = store
            .update_claim_status(claim.id, ClaimStatus::Closed)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::MalformedInput { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_supplier_is_unique_conflict() {
        let store = InMemoryClaimsStore::new();
        store.create_supplier("Nordic Parts".to_string()).await.unwrap();
        let err = store.create_supplier("nordic parts".to_string()).await.unwrap_err();
        assert!(matches!(err, PortError::UniqueConflict { .. }));
    }

    #[tokio::test]
    async fn test_supplier_names_are_trimmed_and_must_not_be_blank() {
        let store = InMemoryClaimsStore::new();
        let supplier = store.create_supplier("  Nordic Parts ".to_string()).await.unwrap();
        assert_eq!(supplier.name, "Nordic Parts");

        let err = store.create_supplier("   ".to_string()).await.unwrap_err();
        assert!(matches!(err, PortError::MalformedInput { .. }));
        let err = store.create_supplier(" nordic parts".to_string()).await.unwrap_err();
        assert!(matches!(err, PortError::UniqueConflict { .. }));
    }

    #[tokio::test]
    async fn test_claim_numbers_stay_unique_within_a_year() {
        let store = InMemoryClaimsStore::new();
        let mut numbers = std::collections::HashSet::new();
        for _ in 0..5000 {
            let claim = store.create_claim(details("TX-400")).await.unwrap();
            assert!(numbers.insert(claim.claim_number), "claim number reused");
        }
        assert_eq!(numbers.len(), 5000);
    }

    #[tokio::test]
    async fn test_fault_injection_then_recovery() {
        let store = InMemoryClaimsStore::new();
        store
            .fail_next(Table::Claims, 2, || PortError::connection("reset"))
            .await;
        let query = around_now().created_query();
        assert!(store.fetch_claims(&query).await.is_err());
        assert!(store.fetch_claims(&query).await.is_err());
        assert!(store.fetch_claims(&query).await.is_ok());
        assert_eq!(store.read_count(Table::Claims).await, 3);
    }

    #[test]
    fn test_claim_mutations_invalidate_line_tables() {
        let touched = Mutation::SoftDeleteClaim.touched_tables();
        assert!(touched.contains(&Table::Claims));
        assert!(touched.contains(&Table::CostLine));
        assert!(touched.contains(&Table::CreditNote));
        assert_eq!(Mutation::AddCostLine.touched_tables(), &[Table::CostLine]);
    }
}
