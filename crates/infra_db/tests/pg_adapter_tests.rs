//! PostgreSQL adapter tests
//!
//! These need a container runtime: `cargo test -p infra_db -- --ignored`

use rust_decimal_macros::dec;

use core_kernel::{AdapterHealth, DateRange, ErrorKind, HealthCheckable};
use domain_claims::{
    ClaimCriteria, ClaimStatus, ClaimsCommandPort, ClaimsQueryPort, FilterSet,
};
use infra_db::PgClaimsAdapter;
use test_utils::{create_isolated_test_database, ClaimBuilder, CostLineBuilder, TemporalFixtures};

fn everything() -> FilterSet {
    // Wide enough to cover Utc::now() stamped by the adapter
    FilterSet::new(
        DateRange::new(
            TemporalFixtures::before_period(3650),
            chrono::Utc::now() + chrono::Duration::days(1),
        )
        .unwrap(),
    )
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_health_check() {
    let db = create_isolated_test_database().await.unwrap();
    let adapter = PgClaimsAdapter::new(db.pool().clone());

    let health = adapter.health_check().await;
    assert_eq!(health.status, AdapterHealth::Healthy);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_claim_lifecycle_round_trip() {
    let db = create_isolated_test_database().await.unwrap();
    let adapter = PgClaimsAdapter::new(db.pool().clone());

    let claim = adapter
        .create_claim(ClaimBuilder::new().warranty().details())
        .await
        .unwrap();
    assert_eq!(claim.status, ClaimStatus::New);

    let claim = adapter.update_claim_status(claim.id, ClaimStatus::Pending).await.unwrap();
    let claim = adapter.update_claim_status(claim.id, ClaimStatus::Approved).await.unwrap();
    let claim = adapter.update_claim_status(claim.id, ClaimStatus::Booked).await.unwrap();
    let closed = adapter.update_claim_status(claim.id, ClaimStatus::Closed).await.unwrap();
    assert!(closed.closed_at.is_some());

    let fetched = adapter.fetch_claims(&everything().created_query()).await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].status, ClaimStatus::Closed);
    assert_eq!(fetched[0].claim_number, closed.claim_number);

    // Closed is terminal
    let err = adapter
        .update_claim_status(claim.id, ClaimStatus::Pending)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_lines_join_their_claim() {
    let db = create_isolated_test_database().await.unwrap();
    let adapter = PgClaimsAdapter::new(db.pool().clone());

    let claim = adapter.create_claim(ClaimBuilder::new().details()).await.unwrap();
    adapter
        .add_cost_line(CostLineBuilder::for_claim(&claim).amount(dec!(400)).account(4010).new_line())
        .await
        .unwrap();
    adapter
        .add_cost_line(CostLineBuilder::for_claim(&claim).amount(dec!(80)).account(4020).new_line())
        .await
        .unwrap();
    adapter
        .add_credit_note(CostLineBuilder::for_claim(&claim).amount(dec!(150)).new_line())
        .await
        .unwrap();

    let filter = everything();
    let costs = adapter.fetch_cost_lines(&filter.created_query()).await.unwrap();
    assert_eq!(costs.len(), 2);
    assert!(costs.iter().all(|c| c.claim.id == claim.id));

    let narrowed = filter.with_criteria(ClaimCriteria::new().with_account_code(4020));
    let costs = adapter.fetch_cost_lines(&narrowed.created_query()).await.unwrap();
    assert_eq!(costs.len(), 1);
    assert_eq!(costs[0].line.amount, dec!(80));

    let credits = adapter.fetch_credit_notes(&everything().created_query()).await.unwrap();
    assert_eq!(credits.len(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_soft_delete_hides_claim_and_rejects_lines() {
    let db = create_isolated_test_database().await.unwrap();
    let adapter = PgClaimsAdapter::new(db.pool().clone());

    let claim = adapter.create_claim(ClaimBuilder::new().details()).await.unwrap();
    adapter
        .add_cost_line(CostLineBuilder::for_claim(&claim).new_line())
        .await
        .unwrap();
    adapter.soft_delete_claim(claim.id).await.unwrap();

    let filter = everything();
    assert!(adapter.fetch_claims(&filter.created_query()).await.unwrap().is_empty());
    assert!(adapter.fetch_cost_lines(&filter.created_query()).await.unwrap().is_empty());

    let err = adapter
        .add_cost_line(CostLineBuilder::for_claim(&claim).new_line())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_machine_model_filter_is_case_insensitive() {
    let db = create_isolated_test_database().await.unwrap();
    let adapter = PgClaimsAdapter::new(db.pool().clone());

    adapter
        .create_claim(ClaimBuilder::new().with_machine_model("TX-400").details())
        .await
        .unwrap();
    adapter
        .create_claim(ClaimBuilder::new().with_machine_model("AB-100").details())
        .await
        .unwrap();

    let filter = everything().with_criteria(ClaimCriteria::new().with_machine_model("tx-4"));
    let claims = adapter.fetch_claims(&filter.created_query()).await.unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].machine_model, "TX-400");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_duplicate_supplier_is_a_conflict() {
    let db = create_isolated_test_database().await.unwrap();
    let adapter = PgClaimsAdapter::new(db.pool().clone());

    adapter.create_supplier("Nordic Parts".to_string()).await.unwrap();
    let err = adapter
        .create_supplier("nordic parts".to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let suppliers = adapter.fetch_suppliers().await.unwrap();
    assert_eq!(suppliers.len(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_missing_claim_is_not_found() {
    let db = create_isolated_test_database().await.unwrap();
    let adapter = PgClaimsAdapter::new(db.pool().clone());

    let err = adapter
        .update_claim_status(test_utils::IdFixtures::claim_id(), ClaimStatus::Pending)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = adapter
        .soft_delete_claim(test_utils::IdFixtures::claim_id())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_claim_numbers_come_from_the_sequence() {
    let db = create_isolated_test_database().await.unwrap();
    let adapter = PgClaimsAdapter::new(db.pool().clone());

    let mut numbers = std::collections::HashSet::new();
    for _ in 0..2000 {
        let claim = adapter.create_claim(ClaimBuilder::new().details()).await.unwrap();
        assert!(numbers.insert(claim.claim_number), "claim number reused");
    }

    let first = adapter.create_claim(ClaimBuilder::new().details()).await.unwrap();
    let second = adapter.create_claim(ClaimBuilder::new().details()).await.unwrap();
    assert!(first.claim_number.ends_with("-002001"));
    assert!(second.claim_number.ends_with("-002002"));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_deleted_suppliers_stay_in_the_name_lookup() {
    let db = create_isolated_test_database().await.unwrap();
    let adapter = PgClaimsAdapter::new(db.pool().clone());

    let supplier = adapter.create_supplier("Nordic Parts".to_string()).await.unwrap();
    sqlx::query("UPDATE suppliers SET deleted_at = now() WHERE supplier_id = $1")
        .bind(uuid::Uuid::from(supplier.id))
        .execute(db.pool())
        .await
        .unwrap();

    let suppliers = adapter.fetch_suppliers().await.unwrap();
    assert_eq!(suppliers.len(), 1);
    assert_eq!(suppliers[0].name, "Nordic Parts");
    assert!(!suppliers[0].is_active());

    // The name is free again for a new active supplier
    adapter.create_supplier("Nordic Parts".to_string()).await.unwrap();
}
