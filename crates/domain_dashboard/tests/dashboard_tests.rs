//! Dashboard behaviour over the in-memory store

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{DateRange, PortError, RetryPolicy, Timezone};
use domain_claims::ports::mock::InMemoryClaimsStore;
use domain_claims::{
    Claim, ClaimCriteria, ClaimDetails, ClaimStatus, ClaimsQueryPort, CostLine, FilterSet, NewLine,
    Supplier, Table,
};
use domain_dashboard::aggregator::{shares_of, Bucket};
use domain_dashboard::{
    BoardStatus, DashboardConfig, DashboardRequest, DashboardService, Direction, FailureKind,
    MetricKind, MetricResult, MetricValue, Trend,
};

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 20, 12, 0, 0).unwrap()
}

/// 1 June to 1 July; the preceding window is 2 May to 1 June
fn june() -> DateRange {
    DateRange::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

fn config() -> DashboardConfig {
    DashboardConfig {
        retry: RetryPolicy::new(3, std::time::Duration::ZERO, core_kernel::Backoff::Fixed),
        timezone: Timezone::parse("Europe/Oslo").unwrap(),
        ..DashboardConfig::default()
    }
}

static CLAIM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn claim(created: DateTime<Utc>, status: ClaimStatus) -> Claim {
    let mut claim = Claim::register(
        ClaimDetails {
            machine_model: "TX-400".to_string(),
            department: "Service".to_string(),
            ..Default::default()
        },
        created,
        CLAIM_SEQUENCE.fetch_add(1, Ordering::Relaxed),
    );
    claim.status = status;
    claim
}

fn cost(claim: &Claim, amount: Decimal, account_code: i32) -> CostLine {
    CostLine::new(NewLine {
        claim_id: claim.id,
        amount,
        account_code: Some(account_code),
        created_on: claim.created_at.date_naive(),
    })
    .unwrap()
}

fn kpi(result: &MetricResult<MetricValue>) -> (Decimal, Trend) {
    match result {
        MetricResult::Ready(MetricValue::Kpi(card)) => (card.value, card.trend),
        other => panic!("expected a KPI card, got {:?}", other),
    }
}

async fn scenario() -> (Arc<InMemoryClaimsStore>, DashboardService) {
    let store = Arc::new(InMemoryClaimsStore::new());
    let nordic = Supplier::new("Nordic Parts");
    store.insert_supplier(nordic.clone()).await;

    // Current window: three new, one pending, one approved and overdue
    for day in [2, 3, 4] {
        store
            .insert_claim(claim(june().start() + Duration::days(day), ClaimStatus::New))
            .await;
    }
    store
        .insert_claim(claim(june().start() + Duration::days(5), ClaimStatus::Pending))
        .await;
    let mut overdue = claim(june().start() + Duration::days(6), ClaimStatus::Approved);
    overdue.due_date = NaiveDate::from_ymd_opt(2024, 6, 15);
    overdue.supplier_id = Some(nordic.id);
    overdue.warranty = true;
    store.insert_claim(overdue.clone()).await;
    store.insert_cost_line(cost(&overdue, dec!(400), 4010)).await;

    // Previous window: six new claims, one of them deleted
    for day in 1..=6 {
        let mut c = claim(june().start() - Duration::days(day), ClaimStatus::New);
        if day == 6 {
            c.soft_delete(june().start());
        }
        store.insert_claim(c).await;
    }

    // Closed this month, created in the previous window
    let mut closed = claim(june().start() - Duration::days(10), ClaimStatus::Closed);
    closed.closed_at = Some(june().start() + Duration::days(2));
    closed.root_cause = Some("Compressor".to_string());
    store.insert_claim(closed).await;

    let service = DashboardService::over(store.clone(), config());
    (store, service)
}

#[tokio::test]
async fn test_full_board() {
    let (_store, service) = scenario().await;
    let board = service
        .load(DashboardRequest::new(FilterSet::new(june()), as_of()))
        .await;

    assert_eq!(board.status(), BoardStatus::Complete);

    // 3 now vs 5 live claims in New before (one deleted, one closed)
    let (new_claims, trend) = kpi(board.get(MetricKind::NewClaims));
    assert_eq!(new_claims, dec!(3));
    assert_eq!(trend.direction, Direction::Down);
    assert_eq!(trend.percentage, dec!(40));

    let (open, trend) = kpi(board.get(MetricKind::OpenClaims));
    assert_eq!(open, dec!(2));
    assert_eq!(trend.direction, Direction::Stable);

    let (overdue, _) = kpi(board.get(MetricKind::OverdueClaims));
    assert_eq!(overdue, dec!(1));

    let (closed, _) = kpi(board.get(MetricKind::ClosedThisPeriod));
    assert_eq!(closed, dec!(1));

    let (warranty, _) = kpi(board.get(MetricKind::WarrantyCost));
    assert_eq!(warranty, dec!(400));

    let (lead_time, _) = kpi(board.get(MetricKind::AverageLeadTime));
    assert_eq!(lead_time, dec!(12));
}

#[tokio::test]
async fn test_grouped_cards() {
    let (_store, service) = scenario().await;
    let request = DashboardRequest::new(FilterSet::new(june()), as_of());

    match service.metric(MetricKind::SupplierDistribution, &request).await {
        MetricResult::Ready(MetricValue::Distribution(dist)) => {
            assert_eq!(dist.shares.len(), 1);
            assert_eq!(dist.shares[0].label, "Nordic Parts");
            assert_eq!(dist.shares[0].percentage, dec!(100));
        }
        other => panic!("unexpected {:?}", other),
    }

    match service.metric(MetricKind::TopAccountCodes, &request).await {
        MetricResult::Ready(MetricValue::Buckets { buckets }) => {
            assert_eq!(buckets, vec![Bucket { label: "4010".to_string(), value: dec!(400) }]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_one_failing_table_only_fails_its_cards() {
    let (store, service) = scenario().await;
    store
        .fail_next(Table::CostLine, 100, || PortError::permission_denied("row level security"))
        .await;

    let board = service
        .load(DashboardRequest::new(FilterSet::new(june()), as_of()))
        .await;

    assert_eq!(board.status(), BoardStatus::Degraded);
    for kind in [MetricKind::WarrantyCost, MetricKind::TopAccountCodes, MetricKind::SupplierDistribution] {
        match board.get(kind) {
            MetricResult::Failed(failure) => assert_eq!(failure.kind, FailureKind::Permission),
            other => panic!("{} should have failed, got {:?}", kind, other),
        }
    }
    for kind in [MetricKind::NewClaims, MetricKind::OpenClaims, MetricKind::RootCauses] {
        assert!(board.get(kind).ready().is_some(), "{} should be ready", kind);
    }
}

#[tokio::test]
async fn test_machine_model_filter_narrows_every_card() {
    let (store, service) = scenario().await;
    let mut other = claim(june().start() + Duration::days(1), ClaimStatus::New);
    other.machine_model = "AB-100".to_string();
    store.insert_claim(other).await;

    let unfiltered = service
        .load(DashboardRequest::new(FilterSet::new(june()), as_of()))
        .await;
    let filtered = service
        .load(DashboardRequest::new(
            FilterSet::new(june()).with_criteria(ClaimCriteria::new().with_machine_model("ab-1")),
            as_of(),
        ))
        .await;

    assert_eq!(kpi(unfiltered.get(MetricKind::NewClaims)).0, dec!(4));
    assert_eq!(kpi(filtered.get(MetricKind::NewClaims)).0, dec!(1));
    assert_eq!(kpi(filtered.get(MetricKind::WarrantyCost)).0, Decimal::ZERO);
}

#[tokio::test]
async fn test_dropping_the_receiver_is_harmless() {
    let (_store, service) = scenario().await;
    let updates = service.stream(DashboardRequest::new(FilterSet::new(june()), as_of()));
    drop(updates);

    // The service stays usable afterwards
    let board = service
        .load(DashboardRequest::new(FilterSet::new(june()), as_of()))
        .await;
    assert_eq!(board.status(), BoardStatus::Complete);
}

#[tokio::test]
async fn test_net_cost() {
    let (store, service) = scenario().await;
    let claims = store
        .fetch_claims(&FilterSet::new(june()).created_query())
        .await
        .unwrap();
    let target = claims.iter().find(|c| c.warranty).unwrap();
    service
        .add_credit_note(NewLine {
            claim_id: target.id,
            amount: dec!(150),
            account_code: Some(4010),
            created_on: NaiveDate::from_ymd_opt(2024, 6, 18).unwrap(),
        })
        .await
        .unwrap();

    assert_eq!(service.net_cost(&FilterSet::new(june())).await.unwrap(), dec!(250));
}

#[tokio::test]
async fn test_warranty_cost_ignores_the_dashboard_range() {
    let store = Arc::new(InMemoryClaimsStore::new());
    let mut repair = claim(june().start() + Duration::days(14), ClaimStatus::Pending);
    repair.warranty = true;
    store.insert_claim(repair.clone()).await;
    store.insert_cost_line(cost(&repair, dec!(275), 4010)).await;
    let service = DashboardService::over(store, config());

    // 1 to 8 June does not contain the 15 June claim, the trailing 30 days do
    let first_week = DateRange::new(june().start(), june().start() + Duration::days(7)).unwrap();
    let board = service
        .load(DashboardRequest::new(FilterSet::new(first_week), as_of()))
        .await;

    assert_eq!(kpi(board.get(MetricKind::NewClaims)).0, Decimal::ZERO);
    assert_eq!(kpi(board.get(MetricKind::WarrantyCost)).0, dec!(275));
}

#[tokio::test]
async fn test_lead_time_uses_trailing_ninety_days() {
    let store = Arc::new(InMemoryClaimsStore::new());
    for (closed_days_ago, lead_time) in [(60, 8), (100, 30)] {
        let closed_at = as_of() - Duration::days(closed_days_ago);
        let mut c = claim(closed_at - Duration::days(lead_time), ClaimStatus::Closed);
        c.closed_at = Some(closed_at);
        store.insert_claim(c).await;
    }
    let service = DashboardService::over(store, config());

    let first_week = DateRange::new(june().start(), june().start() + Duration::days(7)).unwrap();
    let board = service
        .load(DashboardRequest::new(FilterSet::new(first_week), as_of()))
        .await;

    // Only the claim closed 60 days ago is inside the window; the other one
    // lands in the preceding 90 days
    let (lead_time, trend) = kpi(board.get(MetricKind::AverageLeadTime));
    assert_eq!(lead_time, dec!(8));
    assert_eq!(trend.direction, Direction::Down);
}

#[tokio::test]
async fn test_deleted_supplier_keeps_its_label() {
    let store = Arc::new(InMemoryClaimsStore::new());
    let mut retired = Supplier::new("Retired Parts AS");
    retired.deleted_at = Some(june().start());
    store.insert_supplier(retired.clone()).await;

    let mut c = claim(june().start() + Duration::days(3), ClaimStatus::New);
    c.supplier_id = Some(retired.id);
    store.insert_claim(c.clone()).await;
    store.insert_cost_line(cost(&c, dec!(120), 4010)).await;
    let service = DashboardService::over(store, config());

    let request = DashboardRequest::new(FilterSet::new(june()), as_of());
    match service.metric(MetricKind::SupplierDistribution, &request).await {
        MetricResult::Ready(MetricValue::Distribution(dist)) => {
            assert_eq!(dist.shares.len(), 1);
            assert_eq!(dist.shares[0].label, "Retired Parts AS");
        }
        other => panic!("unexpected {:?}", other),
    }
}

proptest! {
    #[test]
    fn trend_zero_previous_is_stable(current in -1_000_000i64..1_000_000) {
        prop_assert_eq!(Trend::between(Decimal::from(current), Decimal::ZERO), Trend::stable());
    }

    #[test]
    fn trend_direction_follows_sign_of_change(current in 1i64..100_000, previous in 1i64..100_000) {
        let forward = Trend::between(Decimal::from(current), Decimal::from(previous));
        let backward = Trend::between(Decimal::from(previous), Decimal::from(current));

        prop_assert!(forward.percentage >= Decimal::ZERO);
        match forward.direction {
            Direction::Up => {
                prop_assert!(current > previous);
                prop_assert_ne!(backward.direction, Direction::Up);
            }
            Direction::Down => {
                prop_assert!(current < previous);
                prop_assert_ne!(backward.direction, Direction::Down);
            }
            Direction::Stable => prop_assert!(forward.percentage.is_zero()),
        }
    }

    #[test]
    fn supplier_shares_sum_to_one_hundred(values in proptest::collection::vec(1u32..10_000, 1..12)) {
        let buckets: Vec<Bucket> = values
            .iter()
            .enumerate()
            .map(|(i, v)| Bucket { label: format!("S{}", i), value: Decimal::from(*v) })
            .collect();
        let count = buckets.len() as i64;
        let shares = shares_of(buckets);

        let sum: Decimal = shares.iter().map(|s| s.percentage).sum();
        prop_assert!((sum - dec!(100)).abs() <= Decimal::from(count));
    }

    #[test]
    fn zero_total_gives_no_shares(labels in proptest::collection::vec("[A-Z]{3}", 0..6)) {
        let buckets: Vec<Bucket> = labels
            .into_iter()
            .map(|label| Bucket { label, value: Decimal::ZERO })
            .collect();
        prop_assert!(shares_of(buckets).is_empty());
    }
}
