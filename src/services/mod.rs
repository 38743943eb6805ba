use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    context::RequestContext,
    entities::{inventory_lot, location, product},
    errors::ServiceError,
};

pub mod goods_receipts;
pub mod ledger;
pub mod orders;
pub mod posting;
pub mod stock_counts;
pub mod variance;
pub mod waste;

/// Fails with `NotFound` unless the location exists for the tenant.
pub(crate) async fn ensure_location_exists<C: ConnectionTrait>(
    conn: &C,
    ctx: &RequestContext,
    location_id: Uuid,
) -> Result<(), ServiceError> {
    location::Entity::find_by_id(location_id)
        .filter(location::Column::TenantId.eq(ctx.tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", location_id)))?;
    Ok(())
}

/// Fails with `NotFound` unless the product exists for the tenant.
pub(crate) async fn ensure_product_exists<C: ConnectionTrait>(
    conn: &C,
    ctx: &RequestContext,
    product_id: Uuid,
) -> Result<(), ServiceError> {
    product::Entity::find_by_id(product_id)
        .filter(product::Column::TenantId.eq(ctx.tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
    Ok(())
}

/// Fails with `NotFound` unless the lot exists for the tenant, and with
/// `ValidationError` if it belongs to a different product.
pub(crate) async fn ensure_lot_matches_product<C: ConnectionTrait>(
    conn: &C,
    ctx: &RequestContext,
    lot_id: Uuid,
    product_id: Uuid,
) -> Result<(), ServiceError> {
    let lot = inventory_lot::Entity::find_by_id(lot_id)
        .filter(inventory_lot::Column::TenantId.eq(ctx.tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Lot {} not found", lot_id)))?;

    if lot.product_id != product_id {
        return Err(ServiceError::ValidationError(format!(
            "Lot {} does not belong to product {}",
            lot_id, product_id
        )));
    }
    Ok(())
}
