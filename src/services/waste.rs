use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    context::RequestContext,
    entities::stock_ledger_entry::LedgerEntryType,
    entities::waste_line::{
        self, ActiveModel as WasteLineActiveModel, Entity as WasteLineEntity,
        Model as WasteLineModel,
    },
    entities::waste_record::{
        self, ActiveModel as WasteActiveModel, Entity as WasteEntity, Model as WasteModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        ensure_location_exists, ensure_lot_matches_product, ensure_product_exists,
        ledger::LedgerDelta,
        posting::PostingCoordinator,
    },
    workflow::{self, DocumentKind, DocumentStatus},
};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateWasteRecordRequest {
    pub location_id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Waste record number is required"))]
    pub number: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddWasteLineRequest {
    pub product_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WasteLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WasteRecordResponse {
    pub id: Uuid,
    pub number: String,
    pub location_id: Uuid,
    pub status: DocumentStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub lines: Vec<WasteLineResponse>,
}

/// Service for waste records: spoilage is recorded in draft, then approval
/// posts one negative `adjustment` per line and records the approver.
#[derive(Clone)]
pub struct WasteService {
    db: Arc<DatabaseConnection>,
    coordinator: PostingCoordinator,
    event_sender: Option<EventSender>,
}

impl WasteService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        let coordinator = PostingCoordinator::new(db.clone());
        Self {
            db,
            coordinator,
            event_sender,
        }
    }

    #[instrument(skip(self, ctx, request), fields(tenant_id = %ctx.tenant_id, number = %request.number))]
    pub async fn create_waste_record(
        &self,
        ctx: &RequestContext,
        request: CreateWasteRecordRequest,
    ) -> Result<WasteRecordResponse, ServiceError> {
        request.validate()?;
        ensure_location_exists(&*self.db, ctx, request.location_id).await?;

        let now = Utc::now();
        let record = WasteActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            location_id: Set(request.location_id),
            number: Set(request.number),
            status: Set(DocumentStatus::Draft),
            reason: Set(request.reason),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            approved_at: Set(None),
            approved_by: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(waste_id = %record.id, "waste record created");
        self.emit(Event::WasteRecordCreated(record.id)).await;

        Ok(model_to_response(record, Vec::new()))
    }

    /// Adds a wasted quantity while the record is in draft.
    #[instrument(skip(self, ctx, request), fields(tenant_id = %ctx.tenant_id, waste_id = %waste_id))]
    pub async fn add_line(
        &self,
        ctx: &RequestContext,
        waste_id: Uuid,
        request: AddWasteLineRequest,
    ) -> Result<WasteLineResponse, ServiceError> {
        if request.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Wasted quantity must be positive".to_string(),
            ));
        }

        let record = self.find_record(ctx, waste_id).await?;
        workflow::ensure_editable(DocumentKind::WasteRecord, record.status, &record.number)?;

        ensure_product_exists(&*self.db, ctx, request.product_id).await?;
        if let Some(lot_id) = request.lot_id {
            ensure_lot_matches_product(&*self.db, ctx, lot_id, request.product_id).await?;
        }

        let line = WasteLineActiveModel {
            id: Set(Uuid::new_v4()),
            waste_id: Set(record.id),
            product_id: Set(request.product_id),
            lot_id: Set(request.lot_id),
            quantity: Set(request.quantity),
            reason: Set(request.reason),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        Ok(line_to_response(line))
    }

    /// Approves the record: draft -> posted, one `adjustment` of minus the
    /// wasted quantity per line, approver recorded on the document.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, waste_id = %waste_id))]
    pub async fn approve(
        &self,
        ctx: &RequestContext,
        waste_id: Uuid,
    ) -> Result<WasteRecordResponse, ServiceError> {
        let record = self.find_record(ctx, waste_id).await?;
        let lines = self.find_lines(record.id).await?;
        if lines.is_empty() {
            return Err(ServiceError::PreconditionFailed(format!(
                "Waste record {} has no lines to approve",
                record.number
            )));
        }

        let deltas: Vec<LedgerDelta> = lines
            .iter()
            .map(|line| LedgerDelta {
                product_id: line.product_id,
                lot_id: line.lot_id,
                entry_type: LedgerEntryType::Adjustment,
                qty_delta: -line.quantity,
                unit_cost: None,
                note: line.reason.clone(),
            })
            .collect();

        self.coordinator
            .post(
                ctx,
                DocumentKind::WasteRecord,
                record.id,
                record.location_id,
                record.status,
                DocumentStatus::Posted,
                deltas,
            )
            .await?;

        self.emit(Event::WasteApproved(record.id)).await;
        self.get_record(ctx, waste_id).await
    }

    /// Retrieves a waste record with its lines.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, waste_id = %waste_id))]
    pub async fn get_record(
        &self,
        ctx: &RequestContext,
        waste_id: Uuid,
    ) -> Result<WasteRecordResponse, ServiceError> {
        let record = self.find_record(ctx, waste_id).await?;
        let lines = self.find_lines(record.id).await?;
        Ok(model_to_response(record, lines))
    }

    async fn find_record(
        &self,
        ctx: &RequestContext,
        waste_id: Uuid,
    ) -> Result<WasteModel, ServiceError> {
        WasteEntity::find_by_id(waste_id)
            .filter(waste_record::Column::TenantId.eq(ctx.tenant_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Waste record {} not found", waste_id)))
    }

    async fn find_lines(&self, waste_id: Uuid) -> Result<Vec<WasteLineModel>, ServiceError> {
        let lines = WasteLineEntity::find()
            .filter(waste_line::Column::WasteId.eq(waste_id))
            .order_by_asc(waste_line::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(lines)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send waste event");
            }
        }
    }
}

fn model_to_response(model: WasteModel, lines: Vec<WasteLineModel>) -> WasteRecordResponse {
    WasteRecordResponse {
        id: model.id,
        number: model.number,
        location_id: model.location_id,
        status: model.status,
        reason: model.reason,
        created_at: model.created_at,
        approved_at: model.approved_at,
        approved_by: model.approved_by,
        lines: lines.into_iter().map(line_to_response).collect(),
    }
}

fn line_to_response(line: WasteLineModel) -> WasteLineResponse {
    WasteLineResponse {
        id: line.id,
        product_id: line.product_id,
        lot_id: line.lot_id,
        quantity: line.quantity,
        reason: line.reason,
    }
}
