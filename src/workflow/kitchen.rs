//! Kitchen preparation state machine.
//!
//! Orders and their items carry a second status, independent of the document
//! workflow: `open -> preparing -> ready -> served`, with `cancelled`
//! reachable from `open` and `preparing`. Items transition individually and
//! the order's aggregate status is re-derived after every item transition.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum KitchenStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "served")]
    Served,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl fmt::Display for KitchenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KitchenStatus::Open => "open",
            KitchenStatus::Preparing => "preparing",
            KitchenStatus::Ready => "ready",
            KitchenStatus::Served => "served",
            KitchenStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl KitchenStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, KitchenStatus::Served | KitchenStatus::Cancelled)
    }

    pub fn can_transition(self, to: KitchenStatus) -> bool {
        use KitchenStatus::*;
        matches!(
            (self, to),
            (Open, Preparing)
                | (Preparing, Ready)
                | (Ready, Served)
                | (Open, Cancelled)
                | (Preparing, Cancelled)
        )
    }
}

/// Rejects an item-level transition that is not in the kitchen table.
pub fn ensure_item_transition(
    item: impl fmt::Display,
    from: KitchenStatus,
    to: KitchenStatus,
) -> Result<(), ServiceError> {
    if from.can_transition(to) {
        Ok(())
    } else {
        Err(ServiceError::invalid_transition(item, from, to))
    }
}

/// Derives an order's aggregate kitchen status from its items' statuses.
///
/// Rules, in precedence order:
/// - any item served => the order is served
/// - all items in {ready, served, cancelled} while the order was preparing
///   => the order is ready
/// - any item preparing while the order is open => the order is preparing
/// - otherwise the order keeps its current status
pub fn derive_order_status(current: KitchenStatus, items: &[KitchenStatus]) -> KitchenStatus {
    use KitchenStatus::*;

    if items.iter().any(|s| *s == Served) {
        return Served;
    }
    if current == Preparing
        && !items.is_empty()
        && items.iter().all(|s| matches!(s, Ready | Served | Cancelled))
    {
        return Ready;
    }
    if current == Open && items.iter().any(|s| *s == Preparing) {
        return Preparing;
    }
    current
}
