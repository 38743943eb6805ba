//! Posting coordinator.
//!
//! Every terminal transition — anything that writes ledger rows — runs here,
//! as one transaction: compare-and-swap the document's status from the state
//! the caller last observed, then append the ledger entries. If the swap
//! affects zero rows the document changed under the caller; the transaction
//! rolls back, nothing is written, and the caller gets `PreconditionFailed`
//! (safe to retry after re-fetching the document). Two concurrent `post`
//! calls on the same document can therefore never both succeed.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    context::RequestContext,
    entities::stock_ledger_entry::Model as LedgerEntryModel,
    errors::ServiceError,
    services::ledger::{self, LedgerDelta},
    workflow::{self, DocumentKind, DocumentStatus},
};

#[derive(Clone)]
pub struct PostingCoordinator {
    db: Arc<DatabaseConnection>,
}

impl PostingCoordinator {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Performs a terminal transition: flips the document's status from the
    /// expected source state and writes one ledger entry per non-zero delta,
    /// all-or-nothing.
    #[instrument(
        skip(self, ctx, deltas),
        fields(tenant_id = %ctx.tenant_id, kind = %kind, document_id = %document_id, deltas = deltas.len())
    )]
    pub async fn post(
        &self,
        ctx: &RequestContext,
        kind: DocumentKind,
        document_id: Uuid,
        location_id: Uuid,
        from: DocumentStatus,
        to: DocumentStatus,
        deltas: Vec<LedgerDelta>,
    ) -> Result<Vec<LedgerEntryModel>, ServiceError> {
        workflow::ensure_transition(kind, from, to)?;

        let deltas: Vec<LedgerDelta> = deltas
            .into_iter()
            .filter(|delta| !delta.qty_delta.is_zero())
            .collect();
        if deltas.is_empty() {
            return Err(ServiceError::PreconditionFailed(format!(
                "{} {} has no non-zero quantity deltas to post",
                kind, document_id
            )));
        }

        let txn = self.db.begin().await?;

        if !flip_status(&txn, ctx, kind, document_id, from, to).await? {
            txn.rollback().await?;
            warn!(
                kind = %kind,
                document_id = %document_id,
                expected = %from,
                "posting lost a status race; nothing written"
            );
            return Err(ServiceError::PreconditionFailed(format!(
                "{} {} is no longer in '{}'",
                kind, document_id, from
            )));
        }

        let entries =
            ledger::append_entries(&txn, ctx, location_id, kind, document_id, deltas).await?;

        txn.commit().await?;

        info!(
            kind = %kind,
            document_id = %document_id,
            entries = entries.len(),
            "document posted to ledger"
        );
        Ok(entries)
    }

    /// Guarded status change with no ledger effect (draft -> review, voiding
    /// an order that was never posted). Single compare-and-swap update.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, kind = %kind, document_id = %document_id))]
    pub async fn transition(
        &self,
        ctx: &RequestContext,
        kind: DocumentKind,
        document_id: Uuid,
        from: DocumentStatus,
        to: DocumentStatus,
    ) -> Result<(), ServiceError> {
        self.transition_on(&*self.db, ctx, kind, document_id, from, to)
            .await
    }

    /// Same as [`transition`](Self::transition) but on a caller-owned
    /// connection, so the swap can participate in an open transaction — the
    /// stock-count review recompute updates its lines and flips the status
    /// atomically this way.
    pub async fn transition_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        ctx: &RequestContext,
        kind: DocumentKind,
        document_id: Uuid,
        from: DocumentStatus,
        to: DocumentStatus,
    ) -> Result<(), ServiceError> {
        workflow::ensure_transition(kind, from, to)?;

        if !flip_status(conn, ctx, kind, document_id, from, to).await? {
            return Err(ServiceError::PreconditionFailed(format!(
                "{} {} is no longer in '{}'",
                kind, document_id, from
            )));
        }
        Ok(())
    }
}

/// Compare-and-swap on the document's status row. Returns whether exactly
/// one row moved; zero means the document was not in `from` anymore (or not
/// visible to this tenant). Also stamps the actor/timestamp columns that the
/// target state implies for the kind.
async fn flip_status<C: ConnectionTrait>(
    conn: &C,
    ctx: &RequestContext,
    kind: DocumentKind,
    document_id: Uuid,
    from: DocumentStatus,
    to: DocumentStatus,
) -> Result<bool, ServiceError> {
    let now = Utc::now();
    let actor = ctx.user_id;

    let rows_affected = match kind {
        DocumentKind::StockCount => {
            use crate::entities::stock_count::{Column, Entity};
            let mut update = Entity::update_many()
                .col_expr(Column::Status, Expr::value(to))
                .col_expr(Column::UpdatedAt, Expr::value(Some(now)));
            match to {
                DocumentStatus::Review => {
                    update = update
                        .col_expr(Column::ReviewedAt, Expr::value(Some(now)))
                        .col_expr(Column::ReviewedBy, Expr::value(Some(actor)));
                }
                DocumentStatus::Posted => {
                    update = update
                        .col_expr(Column::PostedAt, Expr::value(Some(now)))
                        .col_expr(Column::PostedBy, Expr::value(Some(actor)));
                }
                _ => {}
            }
            update
                .filter(Column::Id.eq(document_id))
                .filter(Column::TenantId.eq(ctx.tenant_id))
                .filter(Column::Status.eq(from))
                .exec(conn)
                .await?
                .rows_affected
        }
        DocumentKind::Order => {
            use crate::entities::order::{Column, Entity};
            let mut update = Entity::update_many()
                .col_expr(Column::Status, Expr::value(to))
                .col_expr(Column::UpdatedAt, Expr::value(Some(now)));
            match to {
                DocumentStatus::Posted => {
                    update = update
                        .col_expr(Column::PostedAt, Expr::value(Some(now)))
                        .col_expr(Column::PostedBy, Expr::value(Some(actor)));
                }
                DocumentStatus::Voided => {
                    update = update
                        .col_expr(Column::VoidedAt, Expr::value(Some(now)))
                        .col_expr(Column::VoidedBy, Expr::value(Some(actor)));
                }
                _ => {}
            }
            update
                .filter(Column::Id.eq(document_id))
                .filter(Column::TenantId.eq(ctx.tenant_id))
                .filter(Column::Status.eq(from))
                .exec(conn)
                .await?
                .rows_affected
        }
        DocumentKind::WasteRecord => {
            use crate::entities::waste_record::{Column, Entity};
            let mut update = Entity::update_many()
                .col_expr(Column::Status, Expr::value(to))
                .col_expr(Column::UpdatedAt, Expr::value(Some(now)));
            if to == DocumentStatus::Posted {
                update = update
                    .col_expr(Column::ApprovedAt, Expr::value(Some(now)))
                    .col_expr(Column::ApprovedBy, Expr::value(Some(actor)));
            }
            update
                .filter(Column::Id.eq(document_id))
                .filter(Column::TenantId.eq(ctx.tenant_id))
                .filter(Column::Status.eq(from))
                .exec(conn)
                .await?
                .rows_affected
        }
        DocumentKind::GoodsReceipt => {
            use crate::entities::goods_receipt::{Column, Entity};
            let mut update = Entity::update_many()
                .col_expr(Column::Status, Expr::value(to))
                .col_expr(Column::UpdatedAt, Expr::value(Some(now)));
            if to == DocumentStatus::Posted {
                update = update
                    .col_expr(Column::PostedAt, Expr::value(Some(now)))
                    .col_expr(Column::PostedBy, Expr::value(Some(actor)));
            }
            update
                .filter(Column::Id.eq(document_id))
                .filter(Column::TenantId.eq(ctx.tenant_id))
                .filter(Column::Status.eq(from))
                .exec(conn)
                .await?
                .rows_affected
        }
    };

    Ok(rows_affected == 1)
}
