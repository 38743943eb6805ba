//! Stock ledger store and quantity aggregator.
//!
//! The ledger is the single source of truth for on-hand quantity: the sum of
//! all `qty_delta` for a key since the beginning of time. There is no
//! snapshot or compaction; reads aggregate over the indexed key columns.
//! Writes happen only through the posting coordinator, inside a document's
//! posting transaction.

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    context::RequestContext,
    entities::stock_ledger_entry::{
        self, Entity as LedgerEntity, LedgerEntryType, Model as LedgerEntryModel,
    },
    errors::ServiceError,
    workflow::DocumentKind,
};

/// One quantity movement to be written by the posting coordinator.
#[derive(Debug, Clone)]
pub struct LedgerDelta {
    pub product_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub entry_type: LedgerEntryType,
    pub qty_delta: Decimal,
    pub unit_cost: Option<Decimal>,
    pub note: Option<String>,
}

#[derive(FromQueryResult)]
struct QtySum {
    total: Option<Decimal>,
}

/// Sums `qty_delta` over all entries matching the key. The lot filter is
/// applied only when a lot is supplied; otherwise the sum spans every lot
/// (and unlotted movements) of the product at the location. An empty result
/// set yields zero, not an error.
///
/// Generic over the connection so it can run inside an open transaction —
/// the stock-count review recompute depends on that.
pub async fn on_hand_qty<C: ConnectionTrait>(
    conn: &C,
    ctx: &RequestContext,
    location_id: Uuid,
    product_id: Uuid,
    lot_id: Option<Uuid>,
) -> Result<Decimal, ServiceError> {
    let mut query = LedgerEntity::find()
        .select_only()
        .column_as(Expr::col(stock_ledger_entry::Column::QtyDelta).sum(), "total")
        .filter(stock_ledger_entry::Column::TenantId.eq(ctx.tenant_id))
        .filter(stock_ledger_entry::Column::LocationId.eq(location_id))
        .filter(stock_ledger_entry::Column::ProductId.eq(product_id));

    if let Some(lot_id) = lot_id {
        query = query.filter(stock_ledger_entry::Column::LotId.eq(lot_id));
    }

    let total = query
        .into_model::<QtySum>()
        .one(conn)
        .await?
        .and_then(|row| row.total)
        .unwrap_or(Decimal::ZERO);

    Ok(total)
}

/// Appends one entry per delta. Crate-internal: the posting coordinator is
/// the only writer, and it always calls this inside the transaction that
/// flips the owning document's status.
pub(crate) async fn append_entries<C: ConnectionTrait>(
    conn: &C,
    ctx: &RequestContext,
    location_id: Uuid,
    reference_kind: DocumentKind,
    reference_id: Uuid,
    deltas: Vec<LedgerDelta>,
) -> Result<Vec<LedgerEntryModel>, ServiceError> {
    let now = chrono::Utc::now();
    let mut entries = Vec::with_capacity(deltas.len());

    for delta in deltas {
        let entry = stock_ledger_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            location_id: Set(location_id),
            product_id: Set(delta.product_id),
            lot_id: Set(delta.lot_id),
            entry_type: Set(delta.entry_type),
            qty_delta: Set(delta.qty_delta),
            unit_cost: Set(delta.unit_cost),
            reference_type: Set(reference_kind.to_string()),
            reference_id: Set(reference_id),
            note: Set(delta.note),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
        };
        entries.push(entry.insert(conn).await?);
    }

    Ok(entries)
}

/// Read side of the ledger. No mutation API exists here: entries are created
/// by the posting coordinator and never touched again.
#[derive(Clone)]
pub struct LedgerService {
    db: Arc<DatabaseConnection>,
}

impl LedgerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Current on-hand quantity for a (location, product, lot-or-all-lots) key.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, location_id = %location_id, product_id = %product_id))]
    pub async fn on_hand(
        &self,
        ctx: &RequestContext,
        location_id: Uuid,
        product_id: Uuid,
        lot_id: Option<Uuid>,
    ) -> Result<Decimal, ServiceError> {
        on_hand_qty(&*self.db, ctx, location_id, product_id, lot_id).await
    }

    /// Every entry written by one document, in insertion order.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, reference_id = %reference_id))]
    pub async fn entries_for_reference(
        &self,
        ctx: &RequestContext,
        reference_kind: DocumentKind,
        reference_id: Uuid,
    ) -> Result<Vec<LedgerEntryModel>, ServiceError> {
        let entries = LedgerEntity::find()
            .filter(stock_ledger_entry::Column::TenantId.eq(ctx.tenant_id))
            .filter(stock_ledger_entry::Column::ReferenceType.eq(reference_kind.to_string()))
            .filter(stock_ledger_entry::Column::ReferenceId.eq(reference_id))
            .order_by_asc(stock_ledger_entry::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(entries)
    }

    /// Movement history for a key, in insertion order.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, location_id = %location_id, product_id = %product_id))]
    pub async fn entries_for_key(
        &self,
        ctx: &RequestContext,
        location_id: Uuid,
        product_id: Uuid,
        lot_id: Option<Uuid>,
    ) -> Result<Vec<LedgerEntryModel>, ServiceError> {
        let mut query = LedgerEntity::find()
            .filter(stock_ledger_entry::Column::TenantId.eq(ctx.tenant_id))
            .filter(stock_ledger_entry::Column::LocationId.eq(location_id))
            .filter(stock_ledger_entry::Column::ProductId.eq(product_id));

        if let Some(lot_id) = lot_id {
            query = query.filter(stock_ledger_entry::Column::LotId.eq(lot_id));
        }

        let entries = query
            .order_by_asc(stock_ledger_entry::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(entries)
    }
}
