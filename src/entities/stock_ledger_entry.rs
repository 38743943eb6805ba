use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Movement types recorded in the stock ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    /// Stock entering a location (goods receipt).
    #[sea_orm(string_value = "receipt")]
    Receipt,
    /// Stock leaving a location (order posting).
    #[sea_orm(string_value = "issue")]
    Issue,
    /// Correction of a previously posted issue (order void).
    #[sea_orm(string_value = "issue_reversal")]
    IssueReversal,
    /// Stock-count variance or approved waste.
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

/// One immutable signed quantity movement.
///
/// On-hand quantity for a (tenant, location, product, lot) key is never
/// stored; it is always the sum of `qty_delta` over matching rows. Entries
/// are never updated or deleted; corrections are new rows.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub location_id: Uuid,
    pub product_id: Uuid,
    /// None means the movement is unlotted.
    pub lot_id: Option<Uuid>,
    pub entry_type: LedgerEntryType,
    /// Signed quantity in the product's base unit; positive increases stock.
    pub qty_delta: Decimal,
    pub unit_cost: Option<Decimal>,
    /// Originating document kind (e.g. "order", "stock_count"). Tagged
    /// reference; no foreign key because the target table is polymorphic.
    pub reference_type: String,
    pub reference_id: Uuid,
    pub note: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        // The ledger is append-only; corrections must be new rows.
        if !insert {
            return Err(DbErr::Custom(
                "stock ledger entries are append-only".to_string(),
            ));
        }

        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }

    async fn before_delete<C: ConnectionTrait>(self, _db: &C) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Err(DbErr::Custom(
            "stock ledger entries are append-only".to_string(),
        ))
    }
}

impl Model {
    /// Whether this entry increases on-hand quantity.
    pub fn is_increase(&self) -> bool {
        self.qty_delta > Decimal::ZERO
    }
}
