//! Dashboard Domain
//!
//! Turns filtered claim, cost-line and credit-note rows into the KPI cards of
//! the warranty dashboard:
//!
//! - **Aggregator**: pure counts, sums, averages and groupings
//! - **Trend**: current window against the preceding window of equal length
//! - **Metrics**: per-card results that resolve and fail independently
//! - **Cache**: TTL query cache plus retry at the data-access boundary
//! - **Service**: concurrent fan-out of every card and cache-invalidating writes

pub mod aggregator;
pub mod trend;
pub mod metric;
pub mod cache;
pub mod service;
pub mod error;

pub use aggregator::{Bucket, Share, ShareBasis, StatusCount, SupplierDistribution};
pub use trend::{Direction, Trend};
pub use metric::{
    Assessment, BoardStatus, FailureKind, KpiCard, MetricBoard, MetricFailure, MetricKind,
    MetricResult, MetricUpdate, MetricValue, Polarity,
};
pub use cache::{CachedQueryPort, QueryCache};
pub use service::{DashboardConfig, DashboardRequest, DashboardService};
pub use error::DashboardError;
