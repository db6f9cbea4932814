//! Lifecycle tests: customer-detail updates, partial passenger
//! cancellation, and full cancellation, including the terminal-status
//! freeze and the transactional item/parent invariants.

mod common;

use assert_matches::assert_matches;
use common::{create_command, services_with, ScriptedProvider, TestServices};

use toursales_api::entities::sale::SaleStatus;
use toursales_api::errors::ServiceError;
use toursales_api::services::lifecycle::UpdateSaleCommand;
use toursales_api::services::sales::SaleResponse;

async fn seeded(id_sale_provider: &str, qty_pax: i32) -> (TestServices, SaleResponse) {
    let services = services_with(ScriptedProvider::happy()).await;
    let sale = services
        .sales
        .create_sale(create_command(id_sale_provider, qty_pax))
        .await
        .expect("seed sale should be created");
    (services, sale)
}

async fn active_item_count(services: &TestServices, sale_id: &str) -> usize {
    let stored = services
        .repository
        .find_by_any_id(sale_id)
        .await
        .unwrap()
        .unwrap();
    services
        .repository
        .items_for(stored.id)
        .await
        .unwrap()
        .iter()
        .filter(|item| item.is_active())
        .count()
}

// ==================== Detail updates ====================

#[tokio::test]
async fn update_details_changes_only_the_given_fields() {
    let (services, sale) = seeded("life-upd", 2).await;

    let updated = services
        .lifecycle
        .update_details(
            &sale.id,
            UpdateSaleCommand {
                name: Some("Beatriz".into()),
                time: Some("16:30:00".into()),
                ..Default::default()
            },
        )
        .await
        .expect("update should succeed");

    assert_eq!(updated.name, "Beatriz");
    assert_eq!(updated.time, "16:30:00");
    // Untouched fields survive.
    assert_eq!(updated.last_name, "Reyes");
    assert_eq!(updated.qty_pax, 2);
    assert_eq!(updated.status, SaleStatus::Confirmed.to_string());
}

#[tokio::test]
async fn update_details_accepts_either_identifier() {
    let (services, sale) = seeded("life-upd-byprov", 1).await;

    let updated = services
        .lifecycle
        .update_details(
            "life-upd-byprov",
            UpdateSaleCommand {
                city: Some("Valparaiso".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.id, sale.id);
    assert_eq!(updated.city, "Valparaiso");
}

#[tokio::test]
async fn update_details_rejects_malformed_time() {
    let (services, sale) = seeded("life-badtime", 1).await;

    for bad in ["14:00", "25:61:00", "2pm"] {
        let err = services
            .lifecycle
            .update_details(
                &sale.id,
                UpdateSaleCommand {
                    time: Some(bad.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidTimeFormat(_), "time: {bad}");
    }
}

#[tokio::test]
async fn update_details_unknown_sale_is_not_found() {
    let services = services_with(ScriptedProvider::happy()).await;
    let err = services
        .lifecycle
        .update_details("missing", UpdateSaleCommand::default())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

// ==================== Partial cancellation ====================

#[tokio::test]
async fn cancel_partial_decrements_pax_and_items() {
    let (services, sale) = seeded("life-pax", 3).await;
    assert_eq!(active_item_count(&services, &sale.id).await, 3);

    let updated = services
        .lifecycle
        .cancel_partial(&sale.id, 1, Some("schedule conflict".into()))
        .await
        .expect("partial cancellation should succeed");

    assert_eq!(updated.qty_pax, 2);
    assert_eq!(active_item_count(&services, &sale.id).await, 2);
    // Status is untouched while passengers remain.
    assert_eq!(updated.status, SaleStatus::Confirmed.to_string());

    let cancelled: Vec<_> = updated
        .cart_items
        .iter()
        .filter(|item| item.status == "CANCELLED")
        .collect();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(
        cancelled[0].cancel_reason.as_deref(),
        Some("schedule conflict")
    );
}

#[tokio::test]
async fn cancel_partial_to_zero_cancels_the_sale() {
    let (services, sale) = seeded("life-pax-zero", 2).await;

    let updated = services
        .lifecycle
        .cancel_partial(&sale.id, 2, None)
        .await
        .unwrap();

    assert_eq!(updated.qty_pax, 0);
    assert_eq!(updated.status, SaleStatus::Cancelled.to_string());
    assert!(updated.cancel_reason.is_some());
    assert_eq!(active_item_count(&services, &sale.id).await, 0);
}

#[tokio::test]
async fn cancel_partial_rejects_non_positive_counts() {
    let (services, sale) = seeded("life-pax-nonpos", 2).await;

    for bad in [0, -1] {
        let err = services
            .lifecycle
            .cancel_partial(&sale.id, bad, None)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_), "qtypax: {bad}");
    }
    // Nothing changed.
    assert_eq!(active_item_count(&services, &sale.id).await, 2);
}

#[tokio::test]
async fn cancel_partial_rejects_more_than_available() {
    let (services, sale) = seeded("life-pax-over", 2).await;

    let err = services
        .lifecycle
        .cancel_partial(&sale.id, 3, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidPaxOperation(_));
    assert_eq!(active_item_count(&services, &sale.id).await, 2);
}

#[tokio::test]
async fn repeated_partial_cancellations_converge_to_cancelled() {
    let (services, sale) = seeded("life-pax-steps", 3).await;

    let step1 = services
        .lifecycle
        .cancel_partial(&sale.id, 2, None)
        .await
        .unwrap();
    assert_eq!(step1.qty_pax, 1);
    assert_eq!(step1.status, SaleStatus::Confirmed.to_string());

    let step2 = services
        .lifecycle
        .cancel_partial(&sale.id, 1, None)
        .await
        .unwrap();
    assert_eq!(step2.qty_pax, 0);
    assert_eq!(step2.status, SaleStatus::Cancelled.to_string());

    // Once cancelled, further pax operations are frozen.
    let err = services
        .lifecycle
        .cancel_partial(&sale.id, 1, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

// ==================== Full cancellation ====================

#[tokio::test]
async fn cancel_full_cancels_every_active_item() {
    let (services, sale) = seeded("life-full", 3).await;

    let updated = services
        .lifecycle
        .cancel_full(&sale.id, Some("customer request".into()))
        .await
        .expect("full cancellation should succeed");

    assert_eq!(updated.status, SaleStatus::Cancelled.to_string());
    assert_eq!(updated.cancel_reason.as_deref(), Some("customer request"));
    assert_eq!(active_item_count(&services, &sale.id).await, 0);

    for item in &updated.cart_items {
        assert_eq!(item.status, "CANCELLED");
        let reason = item.cancel_reason.as_deref().unwrap();
        assert!(
            reason.starts_with("Full sale cancellation."),
            "got: {reason}"
        );
        assert!(reason.contains("customer request"));
    }
}

#[tokio::test]
async fn cancel_full_defaults_the_reason() {
    let (services, sale) = seeded("life-full-default", 1).await;

    let updated = services.lifecycle.cancel_full(&sale.id, None).await.unwrap();
    assert_eq!(updated.cancel_reason.as_deref(), Some("No reason specified"));
}

#[tokio::test]
async fn cancel_full_twice_is_rejected() {
    let (services, sale) = seeded("life-full-twice", 1).await;

    services.lifecycle.cancel_full(&sale.id, None).await.unwrap();
    let err = services
        .lifecycle
        .cancel_full(&sale.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(msg) if msg.contains("CANCELLED"));
}

// ==================== Terminal-status freeze ====================

#[tokio::test]
async fn terminal_sales_reject_every_mutation() {
    let (services, sale) = seeded("life-frozen", 2).await;
    services.lifecycle.cancel_full(&sale.id, None).await.unwrap();

    let before = services
        .repository
        .find_by_any_id(&sale.id)
        .await
        .unwrap()
        .unwrap();

    let update_err = services
        .lifecycle
        .update_details(
            &sale.id,
            UpdateSaleCommand {
                name: Some("Nope".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(update_err, ServiceError::InvalidStatus(_));

    let pax_err = services
        .lifecycle
        .cancel_partial(&sale.id, 1, None)
        .await
        .unwrap_err();
    assert_matches!(pax_err, ServiceError::InvalidStatus(_));

    let cancel_err = services
        .lifecycle
        .cancel_full(&sale.id, None)
        .await
        .unwrap_err();
    assert_matches!(cancel_err, ServiceError::InvalidStatus(_));

    // All fields unchanged after the rejected mutations.
    let after = services
        .repository
        .find_by_any_id(&sale.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before, after);
}
