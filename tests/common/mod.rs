#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use mise_api::{
    config::CapabilityFlags,
    context::RequestContext,
    entities::{inventory_lot, location, product},
    events::{Event, EventSender},
    migrator::Migrator,
    services::{
        goods_receipts::GoodsReceiptService, ledger::LedgerService, orders::OrderService,
        posting::PostingCoordinator, stock_counts::StockCountService, waste::WasteService,
    },
};

/// Harness over an in-memory SQLite database with the real migrations and a
/// fully wired service layer. Each instance is an isolated tenant.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub ctx: RequestContext,
    pub ledger: LedgerService,
    pub stock_counts: StockCountService,
    pub orders: OrderService,
    pub waste: WasteService,
    pub goods_receipts: GoodsReceiptService,
    pub coordinator: PostingCoordinator,
    // Held so service event sends keep succeeding.
    pub events: mpsc::Receiver<Event>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let db = Database::connect(options)
            .await
            .expect("connect to in-memory sqlite");
        Migrator::up(&db, None).await.expect("run migrations");
        let db = Arc::new(db);

        let (tx, events) = mpsc::channel(256);
        let sender = EventSender::new(tx);

        let ctx = RequestContext::new(Uuid::new_v4(), Uuid::new_v4());

        Self {
            ledger: LedgerService::new(db.clone()),
            stock_counts: StockCountService::new(db.clone(), Some(sender.clone())),
            orders: OrderService::new(db.clone(), Some(sender.clone()), CapabilityFlags::default()),
            waste: WasteService::new(db.clone(), Some(sender.clone())),
            goods_receipts: GoodsReceiptService::new(db.clone(), Some(sender)),
            coordinator: PostingCoordinator::new(db.clone()),
            db,
            ctx,
            events,
        }
    }

    /// A context for a different tenant against the same database.
    pub fn other_tenant(&self) -> RequestContext {
        RequestContext::new(Uuid::new_v4(), Uuid::new_v4())
    }

    pub async fn seed_location(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        location::ActiveModel {
            id: Set(id),
            tenant_id: Set(self.ctx.tenant_id),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed location");
        id
    }

    pub async fn seed_product(&self, sku: &str) -> Uuid {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            tenant_id: Set(self.ctx.tenant_id),
            sku: Set(sku.to_string()),
            name: Set(format!("Product {}", sku)),
            base_unit: Set("ea".to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed product");
        id
    }

    pub async fn seed_lot(&self, product_id: Uuid, lot_code: &str) -> Uuid {
        let id = Uuid::new_v4();
        inventory_lot::ActiveModel {
            id: Set(id),
            tenant_id: Set(self.ctx.tenant_id),
            product_id: Set(product_id),
            lot_code: Set(lot_code.to_string()),
            expires_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed lot");
        id
    }
}
