use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    context::RequestContext,
    entities::stock_count::{
        self, ActiveModel as StockCountActiveModel, Entity as StockCountEntity,
        Model as StockCountModel,
    },
    entities::stock_count_line::{
        self, ActiveModel as LineActiveModel, Entity as LineEntity, Model as LineModel,
    },
    entities::stock_ledger_entry::LedgerEntryType,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        ensure_location_exists, ensure_lot_matches_product, ensure_product_exists,
        ledger::{self, LedgerDelta},
        posting::PostingCoordinator,
        variance,
    },
    workflow::{self, DocumentKind, DocumentStatus},
};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateStockCountRequest {
    pub location_id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Count number is required"))]
    pub number: String,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddCountLineRequest {
    pub product_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub counted_qty_base: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateCountLineRequest {
    pub counted_qty_base: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StockCountLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub system_qty_base: Decimal,
    pub counted_qty_base: Decimal,
    pub variance_qty_base: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StockCountResponse {
    pub id: Uuid,
    pub number: String,
    pub location_id: Uuid,
    pub status: DocumentStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub lines: Vec<StockCountLineResponse>,
}

/// Service for the stock-count reconciliation workflow:
/// draft (lines editable) -> review (variances frozen) -> posted (ledger).
#[derive(Clone)]
pub struct StockCountService {
    db: Arc<DatabaseConnection>,
    coordinator: PostingCoordinator,
    event_sender: Option<EventSender>,
}

impl StockCountService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        let coordinator = PostingCoordinator::new(db.clone());
        Self {
            db,
            coordinator,
            event_sender,
        }
    }

    /// Creates a stock count in draft at the given location.
    #[instrument(skip(self, ctx, request), fields(tenant_id = %ctx.tenant_id, number = %request.number))]
    pub async fn create_count(
        &self,
        ctx: &RequestContext,
        request: CreateStockCountRequest,
    ) -> Result<StockCountResponse, ServiceError> {
        request.validate()?;
        ensure_location_exists(&*self.db, ctx, request.location_id).await?;

        let now = Utc::now();
        let count = StockCountActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            location_id: Set(request.location_id),
            number: Set(request.number),
            status: Set(DocumentStatus::Draft),
            note: Set(request.note),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            reviewed_at: Set(None),
            reviewed_by: Set(None),
            posted_at: Set(None),
            posted_by: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(count_id = %count.id, "stock count created");
        self.emit(Event::StockCountCreated(count.id)).await;

        Ok(model_to_response(count, Vec::new()))
    }

    /// Adds a line while the count is in draft, snapshotting the current
    /// ledger-derived quantity for the (product, lot-or-all-lots) key.
    #[instrument(skip(self, ctx, request), fields(tenant_id = %ctx.tenant_id, count_id = %count_id))]
    pub async fn add_line(
        &self,
        ctx: &RequestContext,
        count_id: Uuid,
        request: AddCountLineRequest,
    ) -> Result<StockCountLineResponse, ServiceError> {
        if request.counted_qty_base < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Counted quantity cannot be negative".to_string(),
            ));
        }

        let count = self.find_count(ctx, count_id).await?;
        workflow::ensure_editable(DocumentKind::StockCount, count.status, &count.number)?;

        ensure_product_exists(&*self.db, ctx, request.product_id).await?;
        if let Some(lot_id) = request.lot_id {
            ensure_lot_matches_product(&*self.db, ctx, lot_id, request.product_id).await?;
        }

        let system_qty = ledger::on_hand_qty(
            &*self.db,
            ctx,
            count.location_id,
            request.product_id,
            request.lot_id,
        )
        .await?;
        let variance_qty = variance::variance_qty(request.counted_qty_base, system_qty);

        let line = LineActiveModel {
            id: Set(Uuid::new_v4()),
            count_id: Set(count.id),
            product_id: Set(request.product_id),
            lot_id: Set(request.lot_id),
            system_qty_base: Set(system_qty),
            counted_qty_base: Set(request.counted_qty_base),
            variance_qty_base: Set(variance_qty),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        Ok(line_to_response(line))
    }

    /// Updates a line's counted quantity while the count is in draft. The
    /// variance is recomputed against the stored system snapshot; the
    /// snapshot itself only refreshes at review.
    #[instrument(skip(self, ctx, request), fields(tenant_id = %ctx.tenant_id, count_id = %count_id, line_id = %line_id))]
    pub async fn update_line(
        &self,
        ctx: &RequestContext,
        count_id: Uuid,
        line_id: Uuid,
        request: UpdateCountLineRequest,
    ) -> Result<StockCountLineResponse, ServiceError> {
        if request.counted_qty_base < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Counted quantity cannot be negative".to_string(),
            ));
        }

        let count = self.find_count(ctx, count_id).await?;
        workflow::ensure_editable(DocumentKind::StockCount, count.status, &count.number)?;

        let line = LineEntity::find_by_id(line_id)
            .filter(stock_count_line::Column::CountId.eq(count.id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Count line {} not found", line_id)))?;

        let variance_qty = variance::variance_qty(request.counted_qty_base, line.system_qty_base);

        let mut active: LineActiveModel = line.into();
        active.counted_qty_base = Set(request.counted_qty_base);
        active.variance_qty_base = Set(variance_qty);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        Ok(line_to_response(updated))
    }

    /// Moves the count from draft to review, re-reading the ledger for every
    /// line and freezing the recomputed variances. The recompute and the
    /// status flip commit together, so ledger writes that landed during data
    /// entry are always reflected in what gets posted.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, count_id = %count_id))]
    pub async fn review(
        &self,
        ctx: &RequestContext,
        count_id: Uuid,
    ) -> Result<StockCountResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let count = StockCountEntity::find_by_id(count_id)
            .filter(stock_count::Column::TenantId.eq(ctx.tenant_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock count {} not found", count_id)))?;

        workflow::ensure_transition(DocumentKind::StockCount, count.status, DocumentStatus::Review)?;

        let lines = LineEntity::find()
            .filter(stock_count_line::Column::CountId.eq(count.id))
            .all(&txn)
            .await?;

        for line in lines {
            let system_qty =
                ledger::on_hand_qty(&txn, ctx, count.location_id, line.product_id, line.lot_id)
                    .await?;
            let variance_qty = variance::variance_qty(line.counted_qty_base, system_qty);

            let mut active: LineActiveModel = line.into();
            active.system_qty_base = Set(system_qty);
            active.variance_qty_base = Set(variance_qty);
            active.updated_at = Set(Some(Utc::now()));
            active.update(&txn).await?;
        }

        self.coordinator
            .transition_on(
                &txn,
                ctx,
                DocumentKind::StockCount,
                count.id,
                count.status,
                DocumentStatus::Review,
            )
            .await?;

        txn.commit().await?;

        info!(count_id = %count_id, "stock count moved to review");
        self.emit(Event::StockCountReviewed(count_id)).await;

        self.get_count(ctx, count_id).await
    }

    /// Posts the reviewed count: one `adjustment` ledger entry per line whose
    /// frozen variance clears the posting epsilon. A count whose variances
    /// are all zero is rejected before anything is written.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, count_id = %count_id))]
    pub async fn post(
        &self,
        ctx: &RequestContext,
        count_id: Uuid,
    ) -> Result<StockCountResponse, ServiceError> {
        let count = self.find_count(ctx, count_id).await?;
        let lines = self.find_lines(count.id).await?;

        let deltas: Vec<LedgerDelta> = lines
            .iter()
            .filter(|line| variance::is_postable(line.variance_qty_base))
            .map(|line| LedgerDelta {
                product_id: line.product_id,
                lot_id: line.lot_id,
                entry_type: LedgerEntryType::Adjustment,
                qty_delta: line.variance_qty_base,
                unit_cost: None,
                note: None,
            })
            .collect();

        let entries = self
            .coordinator
            .post(
                ctx,
                DocumentKind::StockCount,
                count.id,
                count.location_id,
                count.status,
                DocumentStatus::Posted,
                deltas,
            )
            .await?;

        self.emit(Event::StockCountPosted {
            count_id: count.id,
            adjustments: entries.len(),
        })
        .await;

        self.get_count(ctx, count_id).await
    }

    /// Retrieves a count with its lines.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, count_id = %count_id))]
    pub async fn get_count(
        &self,
        ctx: &RequestContext,
        count_id: Uuid,
    ) -> Result<StockCountResponse, ServiceError> {
        let count = self.find_count(ctx, count_id).await?;
        let lines = self.find_lines(count.id).await?;
        Ok(model_to_response(count, lines))
    }

    async fn find_count(
        &self,
        ctx: &RequestContext,
        count_id: Uuid,
    ) -> Result<StockCountModel, ServiceError> {
        StockCountEntity::find_by_id(count_id)
            .filter(stock_count::Column::TenantId.eq(ctx.tenant_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock count {} not found", count_id)))
    }

    async fn find_lines(&self, count_id: Uuid) -> Result<Vec<LineModel>, ServiceError> {
        let lines = LineEntity::find()
            .filter(stock_count_line::Column::CountId.eq(count_id))
            .order_by_asc(stock_count_line::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(lines)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send stock count event");
            }
        }
    }
}

fn model_to_response(model: StockCountModel, lines: Vec<LineModel>) -> StockCountResponse {
    StockCountResponse {
        id: model.id,
        number: model.number,
        location_id: model.location_id,
        status: model.status,
        note: model.note,
        created_at: model.created_at,
        reviewed_at: model.reviewed_at,
        posted_at: model.posted_at,
        lines: lines.into_iter().map(line_to_response).collect(),
    }
}

fn line_to_response(line: LineModel) -> StockCountLineResponse {
    StockCountLineResponse {
        id: line.id,
        product_id: line.product_id,
        lot_id: line.lot_id,
        system_qty_base: line.system_qty_base,
        counted_qty_base: line.counted_qty_base,
        variance_qty_base: line.variance_qty_base,
    }
}
