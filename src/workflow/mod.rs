//! Document workflow engine.
//!
//! Every document kind (stock count, order, waste record, goods receipt)
//! shares one state machine implementation, parameterized by a per-kind
//! transition table. Services never flip a status with a plain field update;
//! legality is checked here and the actual flip happens inside the posting
//! coordinator's transaction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::Display;

use crate::errors::ServiceError;

pub mod kitchen;

/// The document kinds that participate in the shared workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum DocumentKind {
    StockCount,
    Order,
    WasteRecord,
    GoodsReceipt,
}

/// Union of the per-kind status sets, persisted as a string column on each
/// document table. Each kind only ever occupies its own subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "review")]
    Review,
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "posted")]
    Posted,
    #[sea_orm(string_value = "voided")]
    Voided,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Review => "review",
            DocumentStatus::Open => "open",
            DocumentStatus::Created => "created",
            DocumentStatus::Posted => "posted",
            DocumentStatus::Voided => "voided",
        };
        write!(f, "{}", s)
    }
}

impl DocumentKind {
    /// The state a freshly created document starts in. Child lines may be
    /// added or edited only while the document is still in this state.
    pub fn initial_status(self) -> DocumentStatus {
        match self {
            DocumentKind::StockCount | DocumentKind::WasteRecord => DocumentStatus::Draft,
            DocumentKind::Order => DocumentStatus::Open,
            DocumentKind::GoodsReceipt => DocumentStatus::Created,
        }
    }

    /// The legal (from, to) pairs for this kind.
    pub fn transitions(self) -> &'static [(DocumentStatus, DocumentStatus)] {
        use DocumentStatus::*;
        match self {
            DocumentKind::StockCount => &[(Draft, Review), (Review, Posted)],
            DocumentKind::Order => &[(Open, Posted), (Open, Voided), (Posted, Voided)],
            DocumentKind::WasteRecord => &[(Draft, Posted)],
            DocumentKind::GoodsReceipt => &[(Created, Posted)],
        }
    }

    pub fn can_transition(self, from: DocumentStatus, to: DocumentStatus) -> bool {
        self.transitions().contains(&(from, to))
    }

    pub fn is_editable_in(self, status: DocumentStatus) -> bool {
        status == self.initial_status()
    }
}

/// Rejects a transition that is not in the kind's table.
pub fn ensure_transition(
    kind: DocumentKind,
    from: DocumentStatus,
    to: DocumentStatus,
) -> Result<(), ServiceError> {
    if kind.can_transition(from, to) {
        Ok(())
    } else {
        Err(ServiceError::invalid_transition(kind, from, to))
    }
}

/// Rejects line mutations on a document that has left its initial state.
pub fn ensure_editable(
    kind: DocumentKind,
    status: DocumentStatus,
    document: impl fmt::Display,
) -> Result<(), ServiceError> {
    if kind.is_editable_in(status) {
        Ok(())
    } else {
        Err(ServiceError::DocumentLocked(format!(
            "{} {} is in '{}' and no longer accepts line changes",
            kind, document, status
        )))
    }
}
