mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use mise_api::{
    entities::stock_ledger_entry::LedgerEntryType,
    errors::ServiceError,
    services::orders::{CreateOrderRequest, OrderItemInput},
    workflow::{kitchen::KitchenStatus, DocumentKind, DocumentStatus},
};
use uuid::Uuid;

use common::TestApp;

async fn open_order(
    app: &TestApp,
    location_id: Uuid,
    number: &str,
    items: Vec<OrderItemInput>,
) -> mise_api::services::orders::OrderResponse {
    app.orders
        .create_order(
            &app.ctx,
            CreateOrderRequest {
                location_id,
                number: number.to_string(),
                note: None,
                items,
            },
        )
        .await
        .expect("create order")
}

#[tokio::test]
async fn post_then_void_restores_on_hand_via_reversal() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;
    let product_id = app.seed_product("ESPRESSO-01").await;

    let order = open_order(
        &app,
        location_id,
        "ORD-0001",
        vec![OrderItemInput {
            product_id,
            quantity: dec!(5),
            unit_price: dec!(3.5),
        }],
    )
    .await;

    let posted = app
        .orders
        .post_order(&app.ctx, order.id)
        .await
        .expect("post order");
    assert_eq!(posted.status, DocumentStatus::Posted);

    let on_hand = app
        .ledger
        .on_hand(&app.ctx, location_id, product_id, None)
        .await
        .expect("on hand after post");
    assert_eq!(on_hand, dec!(-5));

    let voided = app
        .orders
        .void_order(&app.ctx, order.id)
        .await
        .expect("void order");
    assert_eq!(voided.status, DocumentStatus::Voided);
    assert!(voided.voided_at.is_some());

    let on_hand = app
        .ledger
        .on_hand(&app.ctx, location_id, product_id, None)
        .await
        .expect("on hand after void");
    assert_eq!(on_hand, dec!(0));

    // The issue row survives; the correction is a new row.
    let entries = app
        .ledger
        .entries_for_reference(&app.ctx, DocumentKind::Order, order.id)
        .await
        .expect("ledger entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].entry_type, LedgerEntryType::Issue);
    assert_eq!(entries[0].qty_delta, dec!(-5));
    assert_eq!(entries[1].entry_type, LedgerEntryType::IssueReversal);
    assert_eq!(entries[1].qty_delta, dec!(5));
}

#[tokio::test]
async fn empty_order_cannot_post() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;

    let order = open_order(&app, location_id, "ORD-0002", Vec::new()).await;

    let err = app.orders.post_order(&app.ctx, order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::PreconditionFailed(_));

    let entries = app
        .ledger
        .entries_for_reference(&app.ctx, DocumentKind::Order, order.id)
        .await
        .expect("ledger entries");
    assert!(entries.is_empty());
}

#[tokio::test]
async fn voiding_an_unposted_order_writes_no_ledger_rows() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;
    let product_id = app.seed_product("ESPRESSO-01").await;

    let order = open_order(
        &app,
        location_id,
        "ORD-0003",
        vec![OrderItemInput {
            product_id,
            quantity: dec!(1),
            unit_price: dec!(3.5),
        }],
    )
    .await;

    let voided = app
        .orders
        .void_order(&app.ctx, order.id)
        .await
        .expect("void order");
    assert_eq!(voided.status, DocumentStatus::Voided);

    let entries = app
        .ledger
        .entries_for_reference(&app.ctx, DocumentKind::Order, order.id)
        .await
        .expect("ledger entries");
    assert!(entries.is_empty());

    // A voided order cannot be posted afterwards.
    let err = app.orders.post_order(&app.ctx, order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition { .. });
}

#[tokio::test]
async fn posting_twice_is_rejected() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;
    let product_id = app.seed_product("ESPRESSO-01").await;

    let order = open_order(
        &app,
        location_id,
        "ORD-0004",
        vec![OrderItemInput {
            product_id,
            quantity: dec!(2),
            unit_price: dec!(3.5),
        }],
    )
    .await;

    app.orders
        .post_order(&app.ctx, order.id)
        .await
        .expect("first post");
    let err = app.orders.post_order(&app.ctx, order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition { .. });

    let entries = app
        .ledger
        .entries_for_reference(&app.ctx, DocumentKind::Order, order.id)
        .await
        .expect("ledger entries");
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn items_cannot_be_added_after_posting() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;
    let product_id = app.seed_product("ESPRESSO-01").await;

    let order = open_order(
        &app,
        location_id,
        "ORD-0005",
        vec![OrderItemInput {
            product_id,
            quantity: dec!(1),
            unit_price: dec!(3.5),
        }],
    )
    .await;
    app.orders
        .post_order(&app.ctx, order.id)
        .await
        .expect("post order");

    let err = app
        .orders
        .add_item(
            &app.ctx,
            order.id,
            OrderItemInput {
                product_id,
                quantity: dec!(1),
                unit_price: dec!(3.5),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::DocumentLocked(_));
}

#[tokio::test]
async fn item_quantities_must_be_positive() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;
    let product_id = app.seed_product("ESPRESSO-01").await;

    let err = app
        .orders
        .create_order(
            &app.ctx,
            CreateOrderRequest {
                location_id,
                number: "ORD-0006".to_string(),
                note: None,
                items: vec![OrderItemInput {
                    product_id,
                    quantity: dec!(0),
                    unit_price: dec!(3.5),
                }],
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;

    let err = app
        .orders
        .create_order(
            &app.ctx,
            CreateOrderRequest {
                location_id,
                number: "ORD-0007".to_string(),
                note: None,
                items: vec![OrderItemInput {
                    product_id: Uuid::new_v4(),
                    quantity: dec!(1),
                    unit_price: dec!(3.5),
                }],
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn fefo_capability_flag_rejects_posting_instead_of_allocating() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;
    let product_id = app.seed_product("ESPRESSO-01").await;

    let order = open_order(
        &app,
        location_id,
        "ORD-0011",
        vec![OrderItemInput {
            product_id,
            quantity: dec!(1),
            unit_price: dec!(3.5),
        }],
    )
    .await;

    let fefo_orders = mise_api::services::orders::OrderService::new(
        app.db.clone(),
        None,
        mise_api::config::CapabilityFlags {
            fefo_allocation: true,
        },
    );

    let err = fefo_orders
        .post_order(&app.ctx, order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let entries = app
        .ledger
        .entries_for_reference(&app.ctx, DocumentKind::Order, order.id)
        .await
        .expect("ledger entries");
    assert!(entries.is_empty());
}

#[tokio::test]
async fn single_item_prep_sequence_serves_the_order() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;
    let product_id = app.seed_product("ESPRESSO-01").await;

    let order = open_order(
        &app,
        location_id,
        "ORD-0008",
        vec![OrderItemInput {
            product_id,
            quantity: dec!(1),
            unit_price: dec!(3.5),
        }],
    )
    .await;
    let item_id = order.items[0].id;

    let after_preparing = app
        .orders
        .update_item_prep_status(&app.ctx, order.id, item_id, KitchenStatus::Preparing)
        .await
        .expect("to preparing");
    assert_eq!(after_preparing.kitchen_status, KitchenStatus::Preparing);

    let after_ready = app
        .orders
        .update_item_prep_status(&app.ctx, order.id, item_id, KitchenStatus::Ready)
        .await
        .expect("to ready");
    assert_eq!(after_ready.kitchen_status, KitchenStatus::Ready);

    let after_served = app
        .orders
        .update_item_prep_status(&app.ctx, order.id, item_id, KitchenStatus::Served)
        .await
        .expect("to served");
    assert_eq!(after_served.kitchen_status, KitchenStatus::Served);
    assert_eq!(after_served.items[0].prep_status, KitchenStatus::Served);
}

#[tokio::test]
async fn kitchen_machine_rejects_skipping_states() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;
    let product_id = app.seed_product("ESPRESSO-01").await;

    let order = open_order(
        &app,
        location_id,
        "ORD-0009",
        vec![OrderItemInput {
            product_id,
            quantity: dec!(1),
            unit_price: dec!(3.5),
        }],
    )
    .await;
    let item_id = order.items[0].id;

    let err = app
        .orders
        .update_item_prep_status(&app.ctx, order.id, item_id, KitchenStatus::Ready)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition { .. });

    // The item is untouched by the failed transition.
    let order = app.orders.get_order(&app.ctx, order.id).await.expect("get");
    assert_eq!(order.items[0].prep_status, KitchenStatus::Open);
    assert_eq!(order.kitchen_status, KitchenStatus::Open);
}

#[tokio::test]
async fn order_becomes_ready_when_items_settle() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Front Bar").await;
    let product_a = app.seed_product("ESPRESSO-01").await;
    let product_b = app.seed_product("CROISSANT-01").await;

    let order = open_order(
        &app,
        location_id,
        "ORD-0010",
        vec![
            OrderItemInput {
                product_id: product_a,
                quantity: dec!(1),
                unit_price: dec!(3.5),
            },
            OrderItemInput {
                product_id: product_b,
                quantity: dec!(1),
                unit_price: dec!(4.25),
            },
        ],
    )
    .await;
    let first = order.items[0].id;
    let second = order.items[1].id;

    app.orders
        .update_item_prep_status(&app.ctx, order.id, first, KitchenStatus::Preparing)
        .await
        .expect("first to preparing");
    let state = app
        .orders
        .update_item_prep_status(&app.ctx, order.id, second, KitchenStatus::Preparing)
        .await
        .expect("second to preparing");
    assert_eq!(state.kitchen_status, KitchenStatus::Preparing);

    app.orders
        .update_item_prep_status(&app.ctx, order.id, first, KitchenStatus::Ready)
        .await
        .expect("first to ready");
    let state = app
        .orders
        .update_item_prep_status(&app.ctx, order.id, second, KitchenStatus::Cancelled)
        .await
        .expect("second cancelled");

    // All items settled in {ready, served, cancelled} while preparing.
    assert_eq!(state.kitchen_status, KitchenStatus::Ready);
}
