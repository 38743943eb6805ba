mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use mise_api::{
    errors::ServiceError,
    services::goods_receipts::{CreateGoodsReceiptRequest, ReceiptLineInput},
    services::ledger::LedgerDelta,
    services::stock_counts::{AddCountLineRequest, CreateStockCountRequest, UpdateCountLineRequest},
    entities::stock_ledger_entry::LedgerEntryType,
    workflow::{DocumentKind, DocumentStatus},
};

use common::TestApp;

async fn draft_count(app: &TestApp, location_id: uuid::Uuid, number: &str) -> uuid::Uuid {
    app.stock_counts
        .create_count(
            &app.ctx,
            CreateStockCountRequest {
                location_id,
                number: number.to_string(),
                note: None,
            },
        )
        .await
        .expect("create count")
        .id
}

#[tokio::test]
async fn fresh_location_line_has_zero_system_qty() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Main Kitchen").await;
    let product_id = app.seed_product("FLOUR-01").await;

    let count_id = draft_count(&app, location_id, "SC-0001").await;

    let line = app
        .stock_counts
        .add_line(
            &app.ctx,
            count_id,
            AddCountLineRequest {
                product_id,
                lot_id: None,
                counted_qty_base: dec!(10),
            },
        )
        .await
        .expect("add line");

    assert_eq!(line.system_qty_base, dec!(0));
    assert_eq!(line.counted_qty_base, dec!(10));
    assert_eq!(line.variance_qty_base, dec!(10));

    let count = app
        .stock_counts
        .get_count(&app.ctx, count_id)
        .await
        .expect("get count");
    let json = serde_json::to_value(&count).expect("serialize count");
    assert_eq!(json["status"], "draft");
}

#[tokio::test]
async fn posting_writes_one_adjustment_per_nonzero_variance() {
    let mut app = TestApp::new().await;
    let location_id = app.seed_location("Main Kitchen").await;
    let product_a = app.seed_product("FLOUR-01").await;
    let product_b = app.seed_product("SUGAR-01").await;

    let count_id = draft_count(&app, location_id, "SC-0002").await;

    // Variance +3 for product A, zero for product B.
    app.stock_counts
        .add_line(
            &app.ctx,
            count_id,
            AddCountLineRequest {
                product_id: product_a,
                lot_id: None,
                counted_qty_base: dec!(3),
            },
        )
        .await
        .expect("add line a");
    app.stock_counts
        .add_line(
            &app.ctx,
            count_id,
            AddCountLineRequest {
                product_id: product_b,
                lot_id: None,
                counted_qty_base: dec!(0),
            },
        )
        .await
        .expect("add line b");

    let reviewed = app
        .stock_counts
        .review(&app.ctx, count_id)
        .await
        .expect("review");
    assert_eq!(reviewed.status, DocumentStatus::Review);

    let posted = app
        .stock_counts
        .post(&app.ctx, count_id)
        .await
        .expect("post");
    assert_eq!(posted.status, DocumentStatus::Posted);
    assert!(posted.posted_at.is_some());
    // The zero-variance line stays on the count.
    assert_eq!(posted.lines.len(), 2);

    let entries = app
        .ledger
        .entries_for_reference(&app.ctx, DocumentKind::StockCount, count_id)
        .await
        .expect("ledger entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type, LedgerEntryType::Adjustment);
    assert_eq!(entries[0].qty_delta, dec!(3));
    assert_eq!(entries[0].product_id, product_a);

    let on_hand = app
        .ledger
        .on_hand(&app.ctx, location_id, product_a, None)
        .await
        .expect("on hand");
    assert_eq!(on_hand, dec!(3));

    // The posting emitted its domain event with the adjustment count.
    let mut posted_event = None;
    while let Ok(event) = app.events.try_recv() {
        if let mise_api::events::Event::StockCountPosted {
            count_id: id,
            adjustments,
        } = event
        {
            posted_event = Some((id, adjustments));
        }
    }
    assert_eq!(posted_event, Some((count_id, 1)));
}

#[tokio::test]
async fn lines_are_locked_outside_draft() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Main Kitchen").await;
    let product_id = app.seed_product("FLOUR-01").await;

    let count_id = draft_count(&app, location_id, "SC-0003").await;
    app.stock_counts
        .add_line(
            &app.ctx,
            count_id,
            AddCountLineRequest {
                product_id,
                lot_id: None,
                counted_qty_base: dec!(2),
            },
        )
        .await
        .expect("add line");

    app.stock_counts
        .review(&app.ctx, count_id)
        .await
        .expect("review");

    let err = app
        .stock_counts
        .add_line(
            &app.ctx,
            count_id,
            AddCountLineRequest {
                product_id,
                lot_id: None,
                counted_qty_base: dec!(5),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::DocumentLocked(_));
}

#[tokio::test]
async fn review_recomputes_variances_against_fresh_ledger() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Main Kitchen").await;
    let product_id = app.seed_product("FLOUR-01").await;

    let count_id = draft_count(&app, location_id, "SC-0004").await;
    let line = app
        .stock_counts
        .add_line(
            &app.ctx,
            count_id,
            AddCountLineRequest {
                product_id,
                lot_id: None,
                counted_qty_base: dec!(5),
            },
        )
        .await
        .expect("add line");
    assert_eq!(line.variance_qty_base, dec!(5));

    // A goods receipt lands while the count is still being entered.
    let receipt = app
        .goods_receipts
        .create_receipt(
            &app.ctx,
            CreateGoodsReceiptRequest {
                location_id,
                number: "GR-0001".to_string(),
                supplier_ref: None,
                lines: vec![ReceiptLineInput {
                    product_id,
                    lot_id: None,
                    quantity: dec!(2),
                    unit_cost: None,
                }],
            },
        )
        .await
        .expect("create receipt");
    app.goods_receipts
        .post_receipt(&app.ctx, receipt.id)
        .await
        .expect("post receipt");

    let reviewed = app
        .stock_counts
        .review(&app.ctx, count_id)
        .await
        .expect("review");
    assert_eq!(reviewed.lines.len(), 1);
    assert_eq!(reviewed.lines[0].system_qty_base, dec!(2));
    assert_eq!(reviewed.lines[0].variance_qty_base, dec!(3));
}

#[tokio::test]
async fn updating_a_line_recomputes_its_variance() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Main Kitchen").await;
    let product_id = app.seed_product("FLOUR-01").await;

    let count_id = draft_count(&app, location_id, "SC-0005").await;
    let line = app
        .stock_counts
        .add_line(
            &app.ctx,
            count_id,
            AddCountLineRequest {
                product_id,
                lot_id: None,
                counted_qty_base: dec!(5),
            },
        )
        .await
        .expect("add line");

    let updated = app
        .stock_counts
        .update_line(
            &app.ctx,
            count_id,
            line.id,
            UpdateCountLineRequest {
                counted_qty_base: dec!(7.5),
            },
        )
        .await
        .expect("update line");
    assert_eq!(updated.counted_qty_base, dec!(7.5));
    assert_eq!(updated.variance_qty_base, dec!(7.5));

    let err = app
        .stock_counts
        .update_line(
            &app.ctx,
            count_id,
            line.id,
            UpdateCountLineRequest {
                counted_qty_base: dec!(-1),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn all_zero_variance_count_cannot_post() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Main Kitchen").await;
    let product_id = app.seed_product("FLOUR-01").await;

    let count_id = draft_count(&app, location_id, "SC-0006").await;
    app.stock_counts
        .add_line(
            &app.ctx,
            count_id,
            AddCountLineRequest {
                product_id,
                lot_id: None,
                counted_qty_base: dec!(0),
            },
        )
        .await
        .expect("add line");

    app.stock_counts
        .review(&app.ctx, count_id)
        .await
        .expect("review");

    let err = app.stock_counts.post(&app.ctx, count_id).await.unwrap_err();
    assert_matches!(err, ServiceError::PreconditionFailed(_));

    // Nothing was written and the count stays in review, retryable.
    let entries = app
        .ledger
        .entries_for_reference(&app.ctx, DocumentKind::StockCount, count_id)
        .await
        .expect("ledger entries");
    assert!(entries.is_empty());
    let count = app
        .stock_counts
        .get_count(&app.ctx, count_id)
        .await
        .expect("get count");
    assert_eq!(count.status, DocumentStatus::Review);
}

#[tokio::test]
async fn skipping_review_is_an_invalid_transition() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Main Kitchen").await;
    let product_id = app.seed_product("FLOUR-01").await;

    let count_id = draft_count(&app, location_id, "SC-0007").await;
    app.stock_counts
        .add_line(
            &app.ctx,
            count_id,
            AddCountLineRequest {
                product_id,
                lot_id: None,
                counted_qty_base: dec!(4),
            },
        )
        .await
        .expect("add line");

    let err = app.stock_counts.post(&app.ctx, count_id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition { .. });

    let count = app
        .stock_counts
        .get_count(&app.ctx, count_id)
        .await
        .expect("get count");
    assert_eq!(count.status, DocumentStatus::Draft);
}

#[tokio::test]
async fn racing_post_loses_with_precondition_failed() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Main Kitchen").await;
    let product_id = app.seed_product("FLOUR-01").await;

    let count_id = draft_count(&app, location_id, "SC-0008").await;
    app.stock_counts
        .add_line(
            &app.ctx,
            count_id,
            AddCountLineRequest {
                product_id,
                lot_id: None,
                counted_qty_base: dec!(3),
            },
        )
        .await
        .expect("add line");
    app.stock_counts
        .review(&app.ctx, count_id)
        .await
        .expect("review");

    // First caller wins.
    app.stock_counts
        .post(&app.ctx, count_id)
        .await
        .expect("first post");

    // Second caller observed 'review' before the winner committed; its
    // compare-and-swap finds the document already posted.
    let stale_deltas = vec![LedgerDelta {
        product_id,
        lot_id: None,
        entry_type: LedgerEntryType::Adjustment,
        qty_delta: dec!(3),
        unit_cost: None,
        note: None,
    }];
    let err = app
        .coordinator
        .post(
            &app.ctx,
            DocumentKind::StockCount,
            count_id,
            location_id,
            DocumentStatus::Review,
            DocumentStatus::Posted,
            stale_deltas,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::PreconditionFailed(_));

    // The adjustment exists exactly once.
    let entries = app
        .ledger
        .entries_for_reference(&app.ctx, DocumentKind::StockCount, count_id)
        .await
        .expect("ledger entries");
    assert_eq!(entries.len(), 1);

    // Re-posting through the service is rejected up front.
    let err = app.stock_counts.post(&app.ctx, count_id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition { .. });
}

#[tokio::test]
async fn counts_are_tenant_scoped() {
    let app = TestApp::new().await;
    let location_id = app.seed_location("Main Kitchen").await;
    let count_id = draft_count(&app, location_id, "SC-0009").await;

    let stranger = app.other_tenant();
    let err = app
        .stock_counts
        .get_count(&stranger, count_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
