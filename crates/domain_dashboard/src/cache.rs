//! Query cache and the caching, retrying read port
//!
//! Identical reads within the TTL are served from memory. Entries are keyed by
//! table and [`ClaimQuery`], and every write invalidates the tables it touches.
//! Each table carries a generation counter so that a read which started before
//! an invalidation cannot repopulate the cache with stale rows.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError, RetryPolicy};
use domain_claims::{Claim, ClaimQuery, ClaimsQueryPort, CostLine, CreditNote, Joined, Supplier, Table};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    table: Table,
    query: Option<ClaimQuery>,
}

#[derive(Debug, Clone)]
enum Rows {
    Claims(Vec<Claim>),
    CostLines(Vec<Joined<CostLine>>),
    CreditNotes(Vec<Joined<CreditNote>>),
    Suppliers(Vec<Supplier>),
}

/// Row types that can be cached, one per table
trait Rowset: Sized + Clone {
    const TABLE: Table;

    fn wrap(rows: Vec<Self>) -> Rows;

    fn unwrap(rows: &Rows) -> Option<&Vec<Self>>;
}

impl Rowset for Claim {
    const TABLE: Table = Table::Claims;

    fn wrap(rows: Vec<Self>) -> Rows {
        Rows::Claims(rows)
    }

    fn unwrap(rows: &Rows) -> Option<&Vec<Self>> {
        match rows {
            Rows::Claims(rows) => Some(rows),
            _ => None,
        }
    }
}

impl Rowset for Joined<CostLine> {
    const TABLE: Table = Table::CostLine;

    fn wrap(rows: Vec<Self>) -> Rows {
        Rows::CostLines(rows)
    }

    fn unwrap(rows: &Rows) -> Option<&Vec<Self>> {
        match rows {
            Rows::CostLines(rows) => Some(rows),
            _ => None,
        }
    }
}

impl Rowset for Joined<CreditNote> {
    const TABLE: Table = Table::CreditNote;

    fn wrap(rows: Vec<Self>) -> Rows {
        Rows::CreditNotes(rows)
    }

    fn unwrap(rows: &Rows) -> Option<&Vec<Self>> {
        match rows {
            Rows::CreditNotes(rows) => Some(rows),
            _ => None,
        }
    }
}

impl Rowset for Supplier {
    const TABLE: Table = Table::Suppliers;

    fn wrap(rows: Vec<Self>) -> Rows {
        Rows::Suppliers(rows)
    }

    fn unwrap(rows: &Rows) -> Option<&Vec<Self>> {
        match rows {
            Rows::Suppliers(rows) => Some(rows),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    rows: Rows,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, Entry>,
    generations: HashMap<Table, u64>,
}

impl CacheState {
    fn generation(&self, table: Table) -> u64 {
        self.generations.get(&table).copied().unwrap_or(0)
    }
}

enum Lookup<R> {
    Hit(Vec<R>),
    Miss { generation: u64 },
}

/// TTL cache of query results
#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every entry of the given tables
    pub async fn invalidate(&self, tables: &[Table]) {
        let mut state = self.state.write().await;
        for table in tables {
            *state.generations.entry(*table).or_insert(0) += 1;
        }
        let before = state.entries.len();
        state.entries.retain(|key, _| !tables.contains(&key.table));
        debug!(
            tables = ?tables,
            dropped = before - state.entries.len(),
            "Query cache invalidated"
        );
    }

    pub async fn clear(&self) {
        self.invalidate(&Table::ALL).await;
    }

    async fn lookup<R: Rowset>(&self, key: &CacheKey) -> Lookup<R> {
        let state = self.state.read().await;
        let fresh = state
            .entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .and_then(|entry| R::unwrap(&entry.rows));
        match fresh {
            Some(rows) => Lookup::Hit(rows.clone()),
            None => Lookup::Miss {
                generation: state.generation(key.table),
            },
        }
    }

    /// Stores rows read at `generation`; no-op if the table was invalidated since
    async fn store(&self, key: CacheKey, rows: Rows, generation: u64) -> bool {
        let mut state = self.state.write().await;
        if state.generation(key.table) != generation {
            return false;
        }
        let ttl = self.ttl;
        state.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        state.entries.insert(
            key,
            Entry {
                rows,
                stored_at: Instant::now(),
            },
        );
        true
    }
}

/// A [`ClaimsQueryPort`] decorated with the query cache and a retry policy
pub struct CachedQueryPort<P: ?Sized> {
    inner: Arc<P>,
    cache: Arc<QueryCache>,
    retry: RetryPolicy,
}

impl<P: ClaimsQueryPort + ?Sized> CachedQueryPort<P> {
    pub fn new(inner: Arc<P>, cache: Arc<QueryCache>, retry: RetryPolicy) -> Self {
        Self { inner, cache, retry }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn cached<R, F, Fut>(
        &self,
        query: Option<&ClaimQuery>,
        operation: &str,
        fetch: F,
    ) -> Result<Vec<R>, PortError>
    where
        R: Rowset,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<R>, PortError>>,
    {
        let key = CacheKey {
            table: R::TABLE,
            query: query.cloned(),
        };

        let generation = match self.cache.lookup::<R>(&key).await {
            Lookup::Hit(rows) => {
                debug!(table = R::TABLE.as_str(), rows = rows.len(), "Query cache hit");
                return Ok(rows);
            }
            Lookup::Miss { generation } => generation,
        };

        debug!(table = R::TABLE.as_str(), "Query cache miss");
        let rows = self.retry.run(operation, fetch).await?;
        if !self.cache.store(key, R::wrap(rows.clone()), generation).await {
            debug!(table = R::TABLE.as_str(), "Table invalidated during read, result not cached");
        }
        Ok(rows)
    }
}

impl<P: ClaimsQueryPort + ?Sized> DomainPort for CachedQueryPort<P> {}

#[async_trait]
impl<P: ClaimsQueryPort + ?Sized> HealthCheckable for CachedQueryPort<P> {
    async fn health_check(&self) -> HealthCheckResult {
        self.inner.health_check().await
    }
}

#[async_trait]
impl<P: ClaimsQueryPort + ?Sized> ClaimsQueryPort for CachedQueryPort<P> {
    async fn fetch_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, PortError> {
        let inner = &self.inner;
        self.cached(Some(query), "fetch_claims", || inner.fetch_claims(query))
            .await
    }

    async fn fetch_cost_lines(&self, query: &ClaimQuery) -> Result<Vec<Joined<CostLine>>, PortError> {
        let inner = &self.inner;
        self.cached(Some(query), "fetch_cost_lines", || inner.fetch_cost_lines(query))
            .await
    }

    async fn fetch_credit_notes(&self, query: &ClaimQuery) -> Result<Vec<Joined<CreditNote>>, PortError> {
        let inner = &self.inner;
        self.cached(Some(query), "fetch_credit_notes", || inner.fetch_credit_notes(query))
            .await
    }

    async fn fetch_suppliers(&self) -> Result<Vec<Supplier>, PortError> {
        let inner = &self.inner;
        self.cached(None, "fetch_suppliers", || inner.fetch_suppliers())
            .await
    }
}
