//! PostgreSQL Claims Adapter
//!
//! Implements [`ClaimsQueryPort`] and [`ClaimsCommandPort`] on top of
//! [`ClaimsRepository`]. Database errors are translated to `PortError`
//! through `From<DatabaseError>`; domain rule violations (invalid status
//! transitions, non-positive amounts) are checked here before any write.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError,
};
use domain_claims::{
    Claim, ClaimDetails, ClaimQuery, ClaimStatus, ClaimsCommandPort, ClaimsQueryPort, CostLine,
    CreditNote, Joined, NewLine, Supplier,
};

use crate::error::DatabaseError;
use crate::repositories::claims::{ClaimsRepository, LineTable};

/// PostgreSQL-backed implementation of both claims ports
#[derive(Debug, Clone)]
pub struct PgClaimsAdapter {
    repository: ClaimsRepository,
}

impl PgClaimsAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimsRepository::new(pool),
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &ClaimsRepository {
        &self.repository
    }

    fn pool(&self) -> &PgPool {
        self.repository.pool()
    }
}

impl DomainPort for PgClaimsAdapter {}

#[async_trait]
impl HealthCheckable for PgClaimsAdapter {
    /// Performs a `SELECT 1` round trip
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool())
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            adapter_id: "postgres-claims-adapter".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ClaimsQueryPort for PgClaimsAdapter {
    #[instrument(skip(self, query), fields(window = ?query.window.field))]
    async fn fetch_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, PortError> {
        let rows = self.repository.find_claims(query).await?;
        debug!(rows = rows.len(), "Fetched claims");
        rows.into_iter()
            .map(|row| Claim::try_from(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self, query), fields(window = ?query.window.field))]
    async fn fetch_cost_lines(&self, query: &ClaimQuery) -> Result<Vec<Joined<CostLine>>, PortError> {
        let rows = self.repository.find_lines(LineTable::CostLine, query).await?;
        debug!(rows = rows.len(), "Fetched cost lines");
        rows.into_iter()
            .map(|row| row.into_cost_line().map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self, query), fields(window = ?query.window.field))]
    async fn fetch_credit_notes(&self, query: &ClaimQuery) -> Result<Vec<Joined<CreditNote>>, PortError> {
        let rows = self.repository.find_lines(LineTable::CreditNote, query).await?;
        debug!(rows = rows.len(), "Fetched credit notes");
        rows.into_iter()
            .map(|row| row.into_credit_note().map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self))]
    async fn fetch_suppliers(&self) -> Result<Vec<Supplier>, PortError> {
        let rows = self.repository.list_suppliers().await?;
        Ok(rows.into_iter().map(Supplier::from).collect())
    }
}

#[async_trait]
impl ClaimsCommandPort for PgClaimsAdapter {
    #[instrument(skip(self, details))]
    async fn create_claim(&self, details: ClaimDetails) -> Result<Claim, PortError> {
        let sequence = self.repository.next_claim_sequence().await?;
        let claim = Claim::register(details, Utc::now(), sequence);
        self.repository.insert_claim(&claim).await?;
        debug!(claim_id = %claim.id, "Inserted claim");
        Ok(claim)
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn update_claim_status(&self, id: ClaimId, status: ClaimStatus) -> Result<Claim, PortError> {
        let mut tx = self.pool().begin().await.map_err(DatabaseError::from)?;

        let row = self
            .repository
            .find_claim_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", id))?;
        let mut claim = Claim::try_from(row)?;
        claim.update_status(status, Utc::now())?;

        self.repository.save_status(&mut tx, &claim).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(claim)
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn soft_delete_claim(&self, id: ClaimId) -> Result<(), PortError> {
        if self.repository.soft_delete_claim(id, Utc::now()).await? {
            Ok(())
        } else {
            Err(PortError::not_found("Claim", id))
        }
    }

    #[instrument(skip(self, line), fields(claim_id = %line.claim_id))]
    async fn add_cost_line(&self, line: NewLine) -> Result<CostLine, PortError> {
        let line = CostLine::new(line)?;
        let inserted = self
            .repository
            .insert_line(
                LineTable::CostLine,
                Uuid::from(line.id),
                line.claim_id,
                line.amount,
                line.account_code,
                line.created_on,
            )
            .await?;
        if !inserted {
            return Err(missing_claim(line.claim_id));
        }
        Ok(line)
    }

    #[instrument(skip(self, line), fields(claim_id = %line.claim_id))]
    async fn add_credit_note(&self, line: NewLine) -> Result<CreditNote, PortError> {
        let note = CreditNote::new(line)?;
        let inserted = self
            .repository
            .insert_line(
                LineTable::CreditNote,
                Uuid::from(note.id),
                note.claim_id,
                note.amount,
                note.account_code,
                note.created_on,
            )
            .await?;
        if !inserted {
            return Err(missing_claim(note.claim_id));
        }
        Ok(note)
    }

    #[instrument(skip(self))]
    async fn create_supplier(&self, name: String) -> Result<Supplier, PortError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PortError::malformed_field("supplier name must not be empty", "name"));
        }
        let supplier = Supplier::new(name);
        self.repository.insert_supplier(&supplier).await?;
        Ok(supplier)
    }
}

fn missing_claim(id: ClaimId) -> PortError {
    PortError::ForeignKeyConflict {
        message: format!("claim {} does not exist or is deleted", id),
    }
}
