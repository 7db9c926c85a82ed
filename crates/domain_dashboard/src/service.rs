//! Dashboard service: metric fan-out and cache-invalidating writes
//!
//! [`DashboardService::stream`] spawns one task per card on a `JoinSet` and
//! forwards each result the moment it resolves. Dropping the receiver aborts
//! whatever is still in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    ClaimId, DateRange, HealthCheckResult, HealthCheckable, PortError, RetryPolicy, Timezone,
};
use domain_claims::{
    Claim, ClaimDetails, ClaimQuery, ClaimStatus, ClaimWindow, ClaimsCommandPort, ClaimsQueryPort,
    CostLine, CreditNote, FilterSet, Joined, Mutation, NewLine, Supplier,
};

use crate::aggregator::{self, StatusCount};
use crate::cache::{CachedQueryPort, QueryCache, DEFAULT_TTL};
use crate::error::DashboardError;
use crate::metric::{KpiCard, MetricBoard, MetricKind, MetricResult, MetricUpdate, MetricValue};

/// Trailing window of the warranty-cost card
pub const WARRANTY_COST_DAYS: u32 = 30;

/// Trailing window of the lead-time card
pub const LEAD_TIME_DAYS: u32 = 90;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
    /// Resolves "this month" for the closed-this-period card
    pub timezone: Timezone,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            retry: RetryPolicy::default(),
            timezone: Timezone::default(),
        }
    }
}

/// One dashboard load: the user's filters and the instant treated as "now"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardRequest {
    pub filter: FilterSet,
    pub as_of: DateTime<Utc>,
}

impl DashboardRequest {
    pub fn new(filter: FilterSet, as_of: DateTime<Utc>) -> Self {
        Self { filter, as_of }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    reads: Arc<dyn ClaimsQueryPort>,
    commands: Arc<dyn ClaimsCommandPort>,
    cache: Arc<QueryCache>,
    timezone: Timezone,
}

impl DashboardService {
    /// Wraps `reads` with the query cache and retry policy from `config`
    pub fn new(
        reads: Arc<dyn ClaimsQueryPort>,
        commands: Arc<dyn ClaimsCommandPort>,
        config: DashboardConfig,
    ) -> Self {
        let cache = Arc::new(QueryCache::new(config.cache_ttl));
        let reads: Arc<dyn ClaimsQueryPort> =
            Arc::new(CachedQueryPort::new(reads, cache.clone(), config.retry));
        Self {
            reads,
            commands,
            cache,
            timezone: config.timezone,
        }
    }

    /// Builds the service over an adapter implementing both ports
    pub fn over<S>(store: Arc<S>, config: DashboardConfig) -> Self
    where
        S: ClaimsQueryPort + ClaimsCommandPort,
    {
        Self::new(store.clone(), store, config)
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn timezone(&self) -> Timezone {
        self.timezone
    }

    pub async fn health_check(&self) -> HealthCheckResult {
        self.reads.health_check().await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Computes every card concurrently, yielding each as it resolves
    pub fn stream(&self, request: DashboardRequest) -> mpsc::Receiver<MetricUpdate> {
        let (tx, rx) = mpsc::channel(MetricKind::ALL.len());
        let request = Arc::new(request);
        let mut tasks = JoinSet::new();

        for kind in MetricKind::ALL {
            let reads = self.reads.clone();
            let request = request.clone();
            let timezone = self.timezone;
            tasks.spawn(async move {
                let started = Instant::now();
                let result = compute(reads.as_ref(), kind, &request, timezone).await;
                match &result {
                    Ok(_) => debug!(
                        metric = %kind,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Metric ready"
                    ),
                    Err(e) => warn!(metric = %kind, error = %e, "Metric failed"),
                }
                MetricUpdate {
                    kind,
                    result: result.into(),
                }
            });
        }

        tokio::spawn(forward(tasks, tx));
        rx
    }

    /// Drains [`Self::stream`] into a finished board
    pub async fn load(&self, request: DashboardRequest) -> MetricBoard {
        let mut updates = self.stream(request);
        let mut board = MetricBoard::new();
        while let Some(update) = updates.recv().await {
            board.apply(update);
        }
        board.finish();
        board
    }

    /// A single card, computed on its own
    pub async fn metric(&self, kind: MetricKind, request: &DashboardRequest) -> MetricResult<MetricValue> {
        compute(self.reads.as_ref(), kind, request, self.timezone)
            .await
            .into()
    }

    /// Σ cost − Σ credit over lines of claims matching the filter
    pub async fn net_cost(&self, filter: &FilterSet) -> Result<Decimal, DashboardError> {
        let query = filter.created_query();
        let (costs, credits) = tokio::try_join!(
            self.reads.fetch_cost_lines(&query),
            self.reads.fetch_credit_notes(&query),
        )?;
        Ok(aggregator::net_cost(&costs, &credits))
    }

    pub async fn status_breakdown(&self, filter: &FilterSet) -> Result<Vec<StatusCount>, DashboardError> {
        let claims = self.reads.fetch_claims(&filter.created_query()).await?;
        Ok(aggregator::status_breakdown(&claims))
    }

    pub async fn suppliers(&self) -> Result<Vec<Supplier>, PortError> {
        self.reads.fetch_suppliers().await
    }

    // ========================================================================
    // Writes
    // ========================================================================

    #[instrument(skip(self, details))]
    pub async fn create_claim(&self, details: ClaimDetails) -> Result<Claim, PortError> {
        let claim = self.commands.create_claim(details).await?;
        self.invalidate(Mutation::CreateClaim).await;
        info!(claim_id = %claim.id, claim_number = %claim.claim_number, "Claim created");
        Ok(claim)
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    pub async fn update_claim_status(&self, id: ClaimId, status: ClaimStatus) -> Result<Claim, PortError> {
        let claim = self.commands.update_claim_status(id, status).await?;
        self.invalidate(Mutation::UpdateClaimStatus).await;
        info!(status = %claim.status, "Claim status updated");
        Ok(claim)
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    pub async fn soft_delete_claim(&self, id: ClaimId) -> Result<(), PortError> {
        self.commands.soft_delete_claim(id).await?;
        self.invalidate(Mutation::SoftDeleteClaim).await;
        info!("Claim deleted");
        Ok(())
    }

    #[instrument(skip(self, line), fields(claim_id = %line.claim_id))]
    pub async fn add_cost_line(&self, line: NewLine) -> Result<CostLine, PortError> {
        let line = self.commands.add_cost_line(line).await?;
        self.invalidate(Mutation::AddCostLine).await;
        Ok(line)
    }

    #[instrument(skip(self, line), fields(claim_id = %line.claim_id))]
    pub async fn add_credit_note(&self, line: NewLine) -> Result<CreditNote, PortError> {
        let note = self.commands.add_credit_note(line).await?;
        self.invalidate(Mutation::AddCreditNote).await;
        Ok(note)
    }

    #[instrument(skip(self))]
    pub async fn create_supplier(&self, name: String) -> Result<Supplier, PortError> {
        let supplier = self.commands.create_supplier(name).await?;
        self.invalidate(Mutation::CreateSupplier).await;
        Ok(supplier)
    }

    async fn invalidate(&self, mutation: Mutation) {
        self.cache.invalidate(mutation.touched_tables()).await;
    }
}

/// Forwards finished metrics; stops and aborts the rest once nobody listens
async fn forward(mut tasks: JoinSet<MetricUpdate>, tx: mpsc::Sender<MetricUpdate>) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(update) => {
                if tx.send(update).await.is_err() {
                    debug!(remaining = tasks.len(), "Dashboard receiver dropped, aborting metrics");
                    tasks.abort_all();
                    return;
                }
            }
            Err(e) => warn!(error = %e, "Metric task did not complete"),
        }
    }
}

// ============================================================================
// Metric computation
// ============================================================================

async fn compute(
    reads: &dyn ClaimsQueryPort,
    kind: MetricKind,
    request: &DashboardRequest,
    timezone: Timezone,
) -> Result<MetricValue, DashboardError> {
    let filter = &request.filter;
    let as_of = request.as_of;

    let value = match kind {
        MetricKind::NewClaims => {
            let (current, previous) = claim_pair(reads, &filter.created_query()).await?;
            MetricValue::Kpi(KpiCard::compare(
                count(aggregator::count_new(&current)),
                count(aggregator::count_new(&previous)),
            ))
        }
        MetricKind::OpenClaims => {
            let (current, previous) = claim_pair(reads, &filter.created_query()).await?;
            MetricValue::Kpi(KpiCard::compare(
                count(aggregator::count_open(&current)),
                count(aggregator::count_open(&previous)),
            ))
        }
        MetricKind::OverdueClaims => {
            // The previous window is judged as of its own end
            let (current, previous) = claim_pair(reads, &filter.created_query()).await?;
            MetricValue::Kpi(KpiCard::compare(
                count(aggregator::count_overdue(&current, as_of)),
                count(aggregator::count_overdue(&previous, filter.range.start())),
            ))
        }
        MetricKind::ClosedThisPeriod => {
            let month = timezone.calendar_month(as_of)?;
            let (current, previous) = claim_pair(reads, &filter.query(ClaimWindow::closed(month))).await?;
            MetricValue::Kpi(KpiCard::compare(
                count(aggregator::count_closed_within(&current, &month)),
                count(aggregator::count_closed_within(&previous, &month.preceding())),
            ))
        }
        MetricKind::WarrantyCost => {
            let window = DateRange::trailing_days(as_of, WARRANTY_COST_DAYS)?;
            let (current, previous) = cost_pair(reads, &filter.query(ClaimWindow::created(window))).await?;
            MetricValue::Kpi(KpiCard::compare(
                aggregator::warranty_cost(&current),
                aggregator::warranty_cost(&previous),
            ))
        }
        MetricKind::AverageLeadTime => {
            let window = DateRange::trailing_days(as_of, LEAD_TIME_DAYS)?;
            let (current, previous) = claim_pair(reads, &filter.query(ClaimWindow::closed(window))).await?;
            MetricValue::Kpi(KpiCard::compare(
                aggregator::average_lead_time(&current),
                aggregator::average_lead_time(&previous),
            ))
        }
        MetricKind::TopAccountCodes => {
            let lines = reads.fetch_cost_lines(&filter.created_query()).await?;
            MetricValue::Buckets {
                buckets: aggregator::top_account_codes(&lines),
            }
        }
        MetricKind::SupplierDistribution => {
            let query = filter.created_query();
            let (lines, claims, suppliers) = tokio::try_join!(
                reads.fetch_cost_lines(&query),
                reads.fetch_claims(&query),
                reads.fetch_suppliers(),
            )?;
            MetricValue::Distribution(aggregator::supplier_distribution(&lines, &claims, &suppliers))
        }
        MetricKind::RootCauses => {
            let claims = reads.fetch_claims(&filter.created_query()).await?;
            MetricValue::Buckets {
                buckets: aggregator::root_causes(&claims),
            }
        }
    };

    Ok(value)
}

/// Claims for the query's window and for the window preceding it
async fn claim_pair(
    reads: &dyn ClaimsQueryPort,
    query: &ClaimQuery,
) -> Result<(Vec<Claim>, Vec<Claim>), PortError> {
    let previous = query.preceding();
    tokio::try_join!(reads.fetch_claims(query), reads.fetch_claims(&previous))
}

async fn cost_pair(
    reads: &dyn ClaimsQueryPort,
    query: &ClaimQuery,
) -> Result<(Vec<Joined<CostLine>>, Vec<Joined<CostLine>>), PortError> {
    let previous = query.preceding();
    tokio::try_join!(reads.fetch_cost_lines(query), reads.fetch_cost_lines(&previous))
}

fn count(n: usize) -> Decimal {
    Decimal::from(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_claims::ports::mock::InMemoryClaimsStore;
    use domain_claims::Table;

    fn service(store: &Arc<InMemoryClaimsStore>) -> DashboardService {
        DashboardService::over(store.clone(), DashboardConfig::default())
    }

    fn request() -> DashboardRequest {
        let now = Utc::now();
        let range = DateRange::new(now - chrono::Duration::days(7), now + chrono::Duration::hours(1)).unwrap();
        DashboardRequest::new(FilterSet::new(range), now)
    }

    #[tokio::test]
    async fn test_writes_invalidate_cached_reads() {
        let store = Arc::new(InMemoryClaimsStore::new());
        let service = service(&store);
        let filter = request().filter;

        assert_eq!(service.status_breakdown(&filter).await.unwrap()[0].count, 0);
        service
            .create_claim(ClaimDetails {
                machine_model: "TX-400".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let breakdown = service.status_breakdown(&filter).await.unwrap();
        assert_eq!(breakdown[0].status, ClaimStatus::New);
        assert_eq!(breakdown[0].count, 1);
        assert_eq!(store.read_count(Table::Claims).await, 2);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache() {
        let store = Arc::new(InMemoryClaimsStore::new());
        let service = service(&store);
        let filter = request().filter;

        service.status_breakdown(&filter).await.unwrap();
        assert!(service.update_claim_status(ClaimId::new(), ClaimStatus::Pending).await.is_err());
        service.status_breakdown(&filter).await.unwrap();
        assert_eq!(store.read_count(Table::Claims).await, 1);
    }

    #[tokio::test]
    async fn test_stream_yields_every_metric_once() {
        let store = Arc::new(InMemoryClaimsStore::new());
        let mut updates = service(&store).stream(request());

        let mut seen = Vec::new();
        while let Some(update) = updates.recv().await {
            seen.push(update.kind);
        }
        seen.sort();
        assert_eq!(seen, MetricKind::ALL.to_vec());
    }
}
