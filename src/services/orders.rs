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
    config::CapabilityFlags,
    context::RequestContext,
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
    },
    entities::order_item::{
        self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity,
        Model as OrderItemModel,
    },
    entities::stock_ledger_entry::{self, Entity as LedgerEntity, LedgerEntryType},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        ensure_location_exists, ensure_product_exists,
        ledger::LedgerDelta,
        posting::PostingCoordinator,
    },
    workflow::{
        self,
        kitchen::{self, KitchenStatus},
        DocumentKind, DocumentStatus,
    },
};

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub location_id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Order number is required"))]
    pub number: String,
    pub note: Option<String>,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub prep_status: KitchenStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub number: String,
    pub location_id: Uuid,
    pub status: DocumentStatus,
    pub kitchen_status: KitchenStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
}

/// Service for POS orders. Posting issues stock (one negative `issue` entry
/// per item, unlotted); voiding a posted order writes mirroring
/// `issue_reversal` entries instead of touching the original rows.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    coordinator: PostingCoordinator,
    event_sender: Option<EventSender>,
    capabilities: CapabilityFlags,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Option<EventSender>,
        capabilities: CapabilityFlags,
    ) -> Self {
        let coordinator = PostingCoordinator::new(db.clone());
        Self {
            db,
            coordinator,
            event_sender,
            capabilities,
        }
    }

    /// Creates an open order with its initial items in one transaction.
    #[instrument(skip(self, ctx, request), fields(tenant_id = %ctx.tenant_id, number = %request.number))]
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        ensure_location_exists(&*self.db, ctx, request.location_id).await?;
        for item in &request.items {
            validate_item_input(item)?;
            ensure_product_exists(&*self.db, ctx, item.product_id).await?;
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = self.db.begin().await?;

        let order = OrderActiveModel {
            id: Set(order_id),
            tenant_id: Set(ctx.tenant_id),
            location_id: Set(request.location_id),
            number: Set(request.number),
            status: Set(DocumentStatus::Open),
            kitchen_status: Set(KitchenStatus::Open),
            note: Set(request.note),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            posted_at: Set(None),
            posted_by: Set(None),
            voided_at: Set(None),
            voided_by: Set(None),
        }
        .insert(&txn)
        .await?;

        for item in request.items {
            OrderItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                prep_status: Set(KitchenStatus::Open),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(order_id = %order_id, "order created");
        self.emit(Event::OrderCreated(order_id)).await;

        let items = self.find_items(order.id).await?;
        Ok(model_to_response(order, items))
    }

    /// Adds an item while the order is still open.
    #[instrument(skip(self, ctx, item), fields(tenant_id = %ctx.tenant_id, order_id = %order_id))]
    pub async fn add_item(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        item: OrderItemInput,
    ) -> Result<OrderItemResponse, ServiceError> {
        validate_item_input(&item)?;

        let order = self.find_order(ctx, order_id).await?;
        workflow::ensure_editable(DocumentKind::Order, order.status, &order.number)?;
        ensure_product_exists(&*self.db, ctx, item.product_id).await?;

        let created = OrderItemActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            prep_status: Set(KitchenStatus::Open),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        Ok(item_to_response(created))
    }

    /// Posts the order: one `issue` entry of minus the item quantity per
    /// item. Issues are unlotted — lot (FEFO) allocation is deliberately not
    /// implemented, and enabling the capability flag rejects posting rather
    /// than silently allocating.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, order_id = %order_id))]
    pub async fn post_order(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        if self.capabilities.fefo_allocation {
            return Err(ServiceError::ValidationError(
                "FEFO lot allocation is not implemented; disable the fefo_allocation capability"
                    .to_string(),
            ));
        }

        let order = self.find_order(ctx, order_id).await?;
        let items = self.find_items(order.id).await?;
        if items.is_empty() {
            return Err(ServiceError::PreconditionFailed(format!(
                "Order {} has no items to post",
                order.number
            )));
        }

        let deltas: Vec<LedgerDelta> = items
            .iter()
            .map(|item| LedgerDelta {
                product_id: item.product_id,
                lot_id: None,
                entry_type: LedgerEntryType::Issue,
                qty_delta: -item.quantity,
                unit_cost: None,
                note: None,
            })
            .collect();

        self.coordinator
            .post(
                ctx,
                DocumentKind::Order,
                order.id,
                order.location_id,
                order.status,
                DocumentStatus::Posted,
                deltas,
            )
            .await?;

        self.emit(Event::OrderPosted(order.id)).await;
        self.get_order(ctx, order_id).await
    }

    /// Voids the order. An order that was never posted just flips status; a
    /// posted order additionally gets one `issue_reversal` per original
    /// `issue` entry, restoring the ledger by new rows.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, order_id = %order_id))]
    pub async fn void_order(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let order = self.find_order(ctx, order_id).await?;

        if order.status == DocumentStatus::Posted {
            let issues = LedgerEntity::find()
                .filter(stock_ledger_entry::Column::TenantId.eq(ctx.tenant_id))
                .filter(
                    stock_ledger_entry::Column::ReferenceType
                        .eq(DocumentKind::Order.to_string()),
                )
                .filter(stock_ledger_entry::Column::ReferenceId.eq(order.id))
                .filter(stock_ledger_entry::Column::EntryType.eq(LedgerEntryType::Issue))
                .all(&*self.db)
                .await?;

            let deltas: Vec<LedgerDelta> = issues
                .iter()
                .map(|entry| LedgerDelta {
                    product_id: entry.product_id,
                    lot_id: entry.lot_id,
                    entry_type: LedgerEntryType::IssueReversal,
                    qty_delta: -entry.qty_delta,
                    unit_cost: entry.unit_cost,
                    note: None,
                })
                .collect();

            self.coordinator
                .post(
                    ctx,
                    DocumentKind::Order,
                    order.id,
                    order.location_id,
                    order.status,
                    DocumentStatus::Voided,
                    deltas,
                )
                .await?;
        } else {
            self.coordinator
                .transition(
                    ctx,
                    DocumentKind::Order,
                    order.id,
                    order.status,
                    DocumentStatus::Voided,
                )
                .await?;
        }

        self.emit(Event::OrderVoided(order.id)).await;
        self.get_order(ctx, order_id).await
    }

    /// Moves one item through the kitchen machine, then re-derives the
    /// order's aggregate kitchen status from all its items.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, order_id = %order_id, item_id = %item_id))]
    pub async fn update_item_prep_status(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        item_id: Uuid,
        new_status: KitchenStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let order = OrderEntity::find_by_id(order_id)
            .filter(order::Column::TenantId.eq(ctx.tenant_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let item = OrderItemEntity::find_by_id(item_id)
            .filter(order_item::Column::OrderId.eq(order.id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {} not found", item_id)))?;

        kitchen::ensure_item_transition(item.id, item.prep_status, new_status)?;

        let mut active: OrderItemActiveModel = item.into();
        active.prep_status = Set(new_status);
        active.updated_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&txn)
            .await?;
        let statuses: Vec<KitchenStatus> = items.iter().map(|i| i.prep_status).collect();

        let old_status = order.kitchen_status;
        let derived = kitchen::derive_order_status(old_status, &statuses);

        if derived != old_status {
            let mut active: OrderActiveModel = order.into();
            active.kitchen_status = Set(derived);
            active.updated_at = Set(Some(Utc::now()));
            active.update(&txn).await?;
        }

        txn.commit().await?;

        if derived != old_status {
            info!(order_id = %order_id, old = %old_status, new = %derived, "order kitchen status derived");
            self.emit(Event::OrderKitchenStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: derived.to_string(),
            })
            .await;
        }

        self.get_order(ctx, order_id).await
    }

    /// Retrieves an order with its items.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, order_id = %order_id))]
    pub async fn get_order(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let order = self.find_order(ctx, order_id).await?;
        let items = self.find_items(order.id).await?;
        Ok(model_to_response(order, items))
    }

    async fn find_order(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .filter(order::Column::TenantId.eq(ctx.tenant_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    async fn find_items(&self, order_id: Uuid) -> Result<Vec<OrderItemModel>, ServiceError> {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send order event");
            }
        }
    }
}

fn validate_item_input(item: &OrderItemInput) -> Result<(), ServiceError> {
    if item.quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Item quantity must be positive".to_string(),
        ));
    }
    if item.unit_price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Item unit price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn model_to_response(model: OrderModel, items: Vec<OrderItemModel>) -> OrderResponse {
    OrderResponse {
        id: model.id,
        number: model.number,
        location_id: model.location_id,
        status: model.status,
        kitchen_status: model.kitchen_status,
        note: model.note,
        created_at: model.created_at,
        posted_at: model.posted_at,
        voided_at: model.voided_at,
        items: items.into_iter().map(item_to_response).collect(),
    }
}

fn item_to_response(item: OrderItemModel) -> OrderItemResponse {
    OrderItemResponse {
        id: item.id,
        product_id: item.product_id,
        quantity: item.quantity,
        unit_price: item.unit_price,
        prep_status: item.prep_status,
    }
}
