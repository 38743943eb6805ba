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
    entities::goods_receipt::{
        self, ActiveModel as ReceiptActiveModel, Entity as ReceiptEntity, Model as ReceiptModel,
    },
    entities::goods_receipt_line::{
        self, ActiveModel as ReceiptLineActiveModel, Entity as ReceiptLineEntity,
        Model as ReceiptLineModel,
    },
    entities::stock_ledger_entry::LedgerEntryType,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        ensure_location_exists, ensure_lot_matches_product, ensure_product_exists,
        ledger::LedgerDelta,
        posting::PostingCoordinator,
    },
    workflow::{self, DocumentKind, DocumentStatus},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptLineInput {
    pub product_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateGoodsReceiptRequest {
    pub location_id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Receipt number is required"))]
    pub number: String,
    pub supplier_ref: Option<String>,
    pub lines: Vec<ReceiptLineInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoodsReceiptResponse {
    pub id: Uuid,
    pub number: String,
    pub location_id: Uuid,
    pub status: DocumentStatus,
    pub supplier_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    pub lines: Vec<ReceiptLineResponse>,
}

/// Service for goods receipts: created with lines, then posted as positive
/// `receipt` ledger entries carrying the unit cost.
#[derive(Clone)]
pub struct GoodsReceiptService {
    db: Arc<DatabaseConnection>,
    coordinator: PostingCoordinator,
    event_sender: Option<EventSender>,
}

impl GoodsReceiptService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        let coordinator = PostingCoordinator::new(db.clone());
        Self {
            db,
            coordinator,
            event_sender,
        }
    }

    /// Creates a receipt with its lines in one transaction.
    #[instrument(skip(self, ctx, request), fields(tenant_id = %ctx.tenant_id, number = %request.number))]
    pub async fn create_receipt(
        &self,
        ctx: &RequestContext,
        request: CreateGoodsReceiptRequest,
    ) -> Result<GoodsReceiptResponse, ServiceError> {
        request.validate()?;
        ensure_location_exists(&*self.db, ctx, request.location_id).await?;
        for line in &request.lines {
            validate_line_input(line)?;
            ensure_product_exists(&*self.db, ctx, line.product_id).await?;
            if let Some(lot_id) = line.lot_id {
                ensure_lot_matches_product(&*self.db, ctx, lot_id, line.product_id).await?;
            }
        }

        let now = Utc::now();
        let receipt_id = Uuid::new_v4();

        let txn = self.db.begin().await?;

        let receipt = ReceiptActiveModel {
            id: Set(receipt_id),
            tenant_id: Set(ctx.tenant_id),
            location_id: Set(request.location_id),
            number: Set(request.number),
            status: Set(DocumentStatus::Created),
            supplier_ref: Set(request.supplier_ref),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            posted_at: Set(None),
            posted_by: Set(None),
        }
        .insert(&txn)
        .await?;

        for line in request.lines {
            ReceiptLineActiveModel {
                id: Set(Uuid::new_v4()),
                receipt_id: Set(receipt_id),
                product_id: Set(line.product_id),
                lot_id: Set(line.lot_id),
                quantity: Set(line.quantity),
                unit_cost: Set(line.unit_cost),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(receipt_id = %receipt_id, "goods receipt created");
        self.emit(Event::GoodsReceiptCreated(receipt_id)).await;

        let lines = self.find_lines(receipt.id).await?;
        Ok(model_to_response(receipt, lines))
    }

    /// Adds a line while the receipt has not been posted.
    #[instrument(skip(self, ctx, line), fields(tenant_id = %ctx.tenant_id, receipt_id = %receipt_id))]
    pub async fn add_line(
        &self,
        ctx: &RequestContext,
        receipt_id: Uuid,
        line: ReceiptLineInput,
    ) -> Result<ReceiptLineResponse, ServiceError> {
        validate_line_input(&line)?;

        let receipt = self.find_receipt(ctx, receipt_id).await?;
        workflow::ensure_editable(DocumentKind::GoodsReceipt, receipt.status, &receipt.number)?;

        ensure_product_exists(&*self.db, ctx, line.product_id).await?;
        if let Some(lot_id) = line.lot_id {
            ensure_lot_matches_product(&*self.db, ctx, lot_id, line.product_id).await?;
        }

        let created = ReceiptLineActiveModel {
            id: Set(Uuid::new_v4()),
            receipt_id: Set(receipt.id),
            product_id: Set(line.product_id),
            lot_id: Set(line.lot_id),
            quantity: Set(line.quantity),
            unit_cost: Set(line.unit_cost),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        Ok(line_to_response(created))
    }

    /// Posts the receipt: one positive `receipt` entry per line.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, receipt_id = %receipt_id))]
    pub async fn post_receipt(
        &self,
        ctx: &RequestContext,
        receipt_id: Uuid,
    ) -> Result<GoodsReceiptResponse, ServiceError> {
        let receipt = self.find_receipt(ctx, receipt_id).await?;
        let lines = self.find_lines(receipt.id).await?;
        if lines.is_empty() {
            return Err(ServiceError::PreconditionFailed(format!(
                "Goods receipt {} has no lines to post",
                receipt.number
            )));
        }

        let deltas: Vec<LedgerDelta> = lines
            .iter()
            .map(|line| LedgerDelta {
                product_id: line.product_id,
                lot_id: line.lot_id,
                entry_type: LedgerEntryType::Receipt,
                qty_delta: line.quantity,
                unit_cost: line.unit_cost,
                note: None,
            })
            .collect();

        self.coordinator
            .post(
                ctx,
                DocumentKind::GoodsReceipt,
                receipt.id,
                receipt.location_id,
                receipt.status,
                DocumentStatus::Posted,
                deltas,
            )
            .await?;

        self.emit(Event::GoodsReceiptPosted(receipt.id)).await;
        self.get_receipt(ctx, receipt_id).await
    }

    /// Retrieves a receipt with its lines.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, receipt_id = %receipt_id))]
    pub async fn get_receipt(
        &self,
        ctx: &RequestContext,
        receipt_id: Uuid,
    ) -> Result<GoodsReceiptResponse, ServiceError> {
        let receipt = self.find_receipt(ctx, receipt_id).await?;
        let lines = self.find_lines(receipt.id).await?;
        Ok(model_to_response(receipt, lines))
    }

    async fn find_receipt(
        &self,
        ctx: &RequestContext,
        receipt_id: Uuid,
    ) -> Result<ReceiptModel, ServiceError> {
        ReceiptEntity::find_by_id(receipt_id)
            .filter(goods_receipt::Column::TenantId.eq(ctx.tenant_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Goods receipt {} not found", receipt_id))
            })
    }

    async fn find_lines(&self, receipt_id: Uuid) -> Result<Vec<ReceiptLineModel>, ServiceError> {
        let lines = ReceiptLineEntity::find()
            .filter(goods_receipt_line::Column::ReceiptId.eq(receipt_id))
            .order_by_asc(goods_receipt_line::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(lines)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send goods receipt event");
            }
        }
    }
}

fn validate_line_input(line: &ReceiptLineInput) -> Result<(), ServiceError> {
    if line.quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Received quantity must be positive".to_string(),
        ));
    }
    if matches!(line.unit_cost, Some(cost) if cost < Decimal::ZERO) {
        return Err(ServiceError::ValidationError(
            "Unit cost cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn model_to_response(model: ReceiptModel, lines: Vec<ReceiptLineModel>) -> GoodsReceiptResponse {
    GoodsReceiptResponse {
        id: model.id,
        number: model.number,
        location_id: model.location_id,
        status: model.status,
        supplier_ref: model.supplier_ref,
        created_at: model.created_at,
        posted_at: model.posted_at,
        lines: lines.into_iter().map(line_to_response).collect(),
    }
}

fn line_to_response(line: ReceiptLineModel) -> ReceiptLineResponse {
    ReceiptLineResponse {
        id: line.id,
        product_id: line.product_id,
        lot_id: line.lot_id,
        quantity: line.quantity,
        unit_cost: line.unit_cost,
    }
}
