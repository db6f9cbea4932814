//! End-to-end tests for the sale creation saga against an in-memory
//! database and a scripted provider: happy path, idempotent rejection,
//! the availability gate, and the partial-failure policy.

mod common;

use assert_matches::assert_matches;
use common::{
    create_command, default_tour, services_with, FailAt, ScriptedProvider, BOOKING_ID, SALES_CODE,
};
use once_cell::sync::Lazy;
use regex::Regex;

use toursales_api::entities::sale::SaleStatus;
use toursales_api::errors::ServiceError;
use toursales_api::services::sales::{ProviderSnapshot, SnapshotStatus};

static SECURE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^TUR-\d{8}-[A-Z0-9]{4}$").unwrap());

fn snapshot_of(raw: Option<&str>) -> ProviderSnapshot {
    serde_json::from_str(raw.expect("sale should embed a provider snapshot"))
        .expect("snapshot should be valid JSON")
}

#[tokio::test]
async fn successful_saga_confirms_the_sale() {
    let services = services_with(ScriptedProvider::happy()).await;

    let sale = services
        .sales
        .create_sale(create_command("prov-ok-1", 2))
        .await
        .expect("creation should succeed");

    assert_eq!(sale.status, SaleStatus::Confirmed.to_string());
    assert_eq!(sale.qty_pax, 2);
    assert_eq!(sale.cart_items.len(), 2);
    assert_eq!(sale.ozytrip_booking_id.as_deref(), Some(BOOKING_ID));
    assert_eq!(sale.ozytrip_sales_code.as_deref(), Some(SALES_CODE));
    assert!(SECURE_ID_RE.is_match(&sale.id), "unexpected id: {}", sale.id);

    // All six remote steps ran, in order.
    assert_eq!(
        services.provider.call_log(),
        vec!["tourInformation", "addToCart", "addPassengers", "rater", "pay"]
    );

    // The persisted row matches the response.
    let stored = services
        .repository
        .find_by_provider_id("prov-ok-1")
        .await
        .unwrap()
        .expect("sale row should exist");
    assert_eq!(stored.qty_pax, 2);
    assert_eq!(stored.secure_id, sale.id);
    let snapshot = snapshot_of(stored.ozytrip_response.as_deref());
    assert_eq!(snapshot.status, SnapshotStatus::Success);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn duplicate_provider_id_is_rejected_before_any_remote_call() {
    let services = services_with(ScriptedProvider::happy()).await;

    let first = services
        .sales
        .create_sale(create_command("prov-dup", 1))
        .await
        .expect("first creation should succeed");
    let calls_after_first = services.provider.call_log().len();

    let err = services
        .sales
        .create_sale(create_command("prov-dup", 1))
        .await
        .expect_err("second creation must be rejected");

    assert_matches!(
        err,
        ServiceError::DuplicateSale { ref secure_id, .. } if *secure_id == first.id
    );
    // No additional remote traffic for the rejected attempt.
    assert_eq!(services.provider.call_log().len(), calls_after_first);

    // And still exactly the first row.
    let stored = services
        .repository
        .find_by_provider_id("prov-dup")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.secure_id, first.id);
}

#[tokio::test]
async fn unavailable_date_aborts_without_a_sale() {
    let services = services_with(ScriptedProvider::happy()).await;

    let mut command = create_command("prov-date", 1);
    command.date = "2025-05-16".into();

    let err = services.sales.create_sale(command).await.unwrap_err();
    assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    assert!(err.to_string().contains("availability"));

    assert!(services
        .repository
        .find_by_provider_id("prov-date")
        .await
        .unwrap()
        .is_none());
    // The saga stopped at the gate: no cart mutation happened remotely.
    assert_eq!(services.provider.call_log(), vec!["tourInformation"]);
}

#[tokio::test]
async fn unavailable_time_aborts_without_a_sale() {
    let services = services_with(ScriptedProvider::happy()).await;

    let mut command = create_command("prov-time", 1);
    command.time = "09:00:00".into();

    let err = services.sales.create_sale(command).await.unwrap_err();
    assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);

    assert!(services
        .repository
        .find_by_provider_id("prov-time")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn exceeded_quota_aborts_without_a_sale() {
    let mut provider = ScriptedProvider::happy();
    provider.tour = default_tour();
    provider.tour.dates[0].quotas[0].available_quota = 2;
    let services = services_with(provider).await;

    let err = services
        .sales
        .create_sale(create_command("prov-quota", 3))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    assert!(err.to_string().contains("quota"));

    assert!(services
        .repository
        .find_by_provider_id("prov-quota")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn quota_boundary_is_inclusive() {
    let mut provider = ScriptedProvider::happy();
    provider.tour.dates[0].quotas[0].available_quota = 2;
    let services = services_with(provider).await;

    let sale = services
        .sales
        .create_sale(create_command("prov-exact", 2))
        .await
        .expect("exact quota fits");
    assert_eq!(sale.status, SaleStatus::Confirmed.to_string());
}

#[tokio::test]
async fn passenger_failure_after_booking_persists_partial_success() {
    let services = services_with(ScriptedProvider::failing_at(FailAt::PassengersAdd)).await;

    let sale = services
        .sales
        .create_sale(create_command("prov-partial", 2))
        .await
        .expect("sale must still be created");

    assert_eq!(sale.status, SaleStatus::Processing.to_string());
    assert_eq!(sale.ozytrip_booking_id.as_deref(), Some(BOOKING_ID));
    assert!(sale.ozytrip_sales_code.is_none());

    let stored = services
        .repository
        .find_by_provider_id("prov-partial")
        .await
        .unwrap()
        .unwrap();
    let snapshot = snapshot_of(stored.ozytrip_response.as_deref());
    assert_eq!(snapshot.status, SnapshotStatus::PartialSuccess);
    let error = snapshot.error.expect("snapshot should carry the failure");
    assert!(error.contains("PASSENGERS_ADD"), "got: {error}");
    assert!(error.contains("passenger"), "got: {error}");

    // No rater or payment traffic after the failed step.
    assert_eq!(
        services.provider.call_log(),
        vec!["tourInformation", "addToCart", "addPassengers"]
    );
}

#[tokio::test]
async fn payment_failure_persists_partial_success() {
    let services = services_with(ScriptedProvider::failing_at(FailAt::Payment)).await;

    let sale = services
        .sales
        .create_sale(create_command("prov-payfail", 1))
        .await
        .expect("sale must still be created");

    assert_eq!(sale.status, SaleStatus::Processing.to_string());

    let stored = services
        .repository
        .find_by_provider_id("prov-payfail")
        .await
        .unwrap()
        .unwrap();
    let snapshot = snapshot_of(stored.ozytrip_response.as_deref());
    assert_eq!(snapshot.status, SnapshotStatus::PartialSuccess);
    assert!(snapshot.error.unwrap().contains("PAYMENT"));
}

#[tokio::test]
async fn tour_fetch_failure_degrades_to_error_snapshot() {
    let services = services_with(ScriptedProvider::failing_at(FailAt::TourInformation)).await;

    let sale = services
        .sales
        .create_sale(create_command("prov-tourfail", 1))
        .await
        .expect("local bookkeeping proceeds past a best-effort remote failure");

    assert_eq!(sale.status, SaleStatus::Processing.to_string());
    assert!(sale.ozytrip_booking_id.is_none());

    let stored = services
        .repository
        .find_by_provider_id("prov-tourfail")
        .await
        .unwrap()
        .unwrap();
    let snapshot = snapshot_of(stored.ozytrip_response.as_deref());
    assert_eq!(snapshot.status, SnapshotStatus::Error);
    assert!(snapshot.error.unwrap().contains("TOUR_INFORMATION"));
}

#[tokio::test]
async fn cart_failure_aborts_as_a_client_error() {
    let services = services_with(ScriptedProvider::failing_at(FailAt::CartAdd)).await;

    let err = services
        .sales
        .create_sale(create_command("prov-cartfail", 1))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    assert!(services
        .repository
        .find_by_provider_id("prov-cartfail")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn invalid_time_format_is_rejected_before_any_remote_call() {
    let services = services_with(ScriptedProvider::happy()).await;

    let mut command = create_command("prov-badtime", 1);
    command.time = "2pm".into();

    let err = services.sales.create_sale(command).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidTimeFormat(_));
    assert!(services.provider.call_log().is_empty());
}

#[tokio::test]
async fn created_sale_is_retrievable_by_either_id() {
    let services = services_with(ScriptedProvider::happy()).await;

    let sale = services
        .sales
        .create_sale(create_command("prov-lookup", 1))
        .await
        .unwrap();

    let by_secure = services.sales.get_sale(&sale.id).await.unwrap();
    assert_eq!(by_secure.id_sale_provider, "prov-lookup");

    let by_provider = services.sales.get_sale("prov-lookup").await.unwrap();
    assert_eq!(by_provider.id, sale.id);

    let missing = services.sales.get_sale("no-such-sale").await.unwrap_err();
    assert_matches!(missing, ServiceError::NotFound(_));
}
