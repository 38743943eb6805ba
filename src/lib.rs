//! mise-api Library
//!
//! Inventory core for kitchen and retail operations: an append-only stock
//! ledger plus the document workflows (stock counts, orders, waste records,
//! goods receipts) that post to it.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod context;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod health;
pub mod migrator;
pub mod services;
pub mod workflow;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::CapabilityFlags;

/// The wired-up service layer.
#[derive(Clone)]
pub struct AppServices {
    pub ledger: Arc<services::ledger::LedgerService>,
    pub stock_counts: Arc<services::stock_counts::StockCountService>,
    pub orders: Arc<services::orders::OrderService>,
    pub waste: Arc<services::waste::WasteService>,
    pub goods_receipts: Arc<services::goods_receipts::GoodsReceiptService>,
}

impl AppServices {
    pub fn build(
        db: Arc<DatabaseConnection>,
        event_sender: events::EventSender,
        capabilities: CapabilityFlags,
    ) -> Self {
        Self {
            ledger: Arc::new(services::ledger::LedgerService::new(db.clone())),
            stock_counts: Arc::new(services::stock_counts::StockCountService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            orders: Arc::new(services::orders::OrderService::new(
                db.clone(),
                Some(event_sender.clone()),
                capabilities,
            )),
            waste: Arc::new(services::waste::WasteService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            goods_receipts: Arc::new(services::goods_receipts::GoodsReceiptService::new(
                db,
                Some(event_sender),
            )),
        }
    }
}

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: AppServices,
}

/// Builds the HTTP surface. The request layer proper (document routes,
/// authentication, tenancy resolution) lives outside this crate; only the
/// health endpoint is served here.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
