use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_stock_ledger_table::Migration),
            Box::new(m20240101_000003_create_stock_counts_tables::Migration),
            Box::new(m20240101_000004_create_orders_tables::Migration),
            Box::new(m20240101_000005_create_waste_tables::Migration),
            Box::new(m20240101_000006_create_goods_receipts_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Locations::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Locations::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Locations::Name).string().not_null())
                        .col(ColumnDef::new(Locations::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::BaseUnit).string().not_null())
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-products-tenant-sku")
                        .table(Products::Table)
                        .col(Products::TenantId)
                        .col(Products::Sku)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryLots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryLots::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLots::TenantId).uuid().not_null())
                        .col(ColumnDef::new(InventoryLots::ProductId).uuid().not_null())
                        .col(ColumnDef::new(InventoryLots::LotCode).string().not_null())
                        .col(ColumnDef::new(InventoryLots::ExpiresAt).timestamp().null())
                        .col(
                            ColumnDef::new(InventoryLots::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-inventory-lots-product")
                        .table(InventoryLots::Table)
                        .col(InventoryLots::ProductId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryLots::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Locations {
        Table,
        Id,
        TenantId,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        TenantId,
        Sku,
        Name,
        BaseUnit,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryLots {
        Table,
        Id,
        TenantId,
        ProductId,
        LotCode,
        ExpiresAt,
        CreatedAt,
    }
}

mod m20240101_000002_create_stock_ledger_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_ledger_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockLedgerEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLedgerEntries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::TenantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::LocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLedgerEntries::LotId).uuid().null())
                        .col(
                            ColumnDef::new(StockLedgerEntries::EntryType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::QtyDelta)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::UnitCost)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::ReferenceType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::ReferenceId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLedgerEntries::Note).string().null())
                        .col(
                            ColumnDef::new(StockLedgerEntries::CreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // The aggregation key: every on-hand query filters these columns.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-stock-ledger-key")
                        .table(StockLedgerEntries::Table)
                        .col(StockLedgerEntries::TenantId)
                        .col(StockLedgerEntries::LocationId)
                        .col(StockLedgerEntries::ProductId)
                        .col(StockLedgerEntries::LotId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-stock-ledger-reference")
                        .table(StockLedgerEntries::Table)
                        .col(StockLedgerEntries::ReferenceType)
                        .col(StockLedgerEntries::ReferenceId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockLedgerEntries::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum StockLedgerEntries {
        Table,
        Id,
        TenantId,
        LocationId,
        ProductId,
        LotId,
        EntryType,
        QtyDelta,
        UnitCost,
        ReferenceType,
        ReferenceId,
        Note,
        CreatedBy,
        CreatedAt,
    }
}

mod m20240101_000003_create_stock_counts_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_stock_counts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockCounts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockCounts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockCounts::TenantId).uuid().not_null())
                        .col(ColumnDef::new(StockCounts::LocationId).uuid().not_null())
                        .col(ColumnDef::new(StockCounts::Number).string().not_null())
                        .col(
                            ColumnDef::new(StockCounts::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockCounts::Note).string().null())
                        .col(ColumnDef::new(StockCounts::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(StockCounts::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(StockCounts::UpdatedAt).timestamp().null())
                        .col(ColumnDef::new(StockCounts::ReviewedAt).timestamp().null())
                        .col(ColumnDef::new(StockCounts::ReviewedBy).uuid().null())
                        .col(ColumnDef::new(StockCounts::PostedAt).timestamp().null())
                        .col(ColumnDef::new(StockCounts::PostedBy).uuid().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-stock-counts-tenant-location")
                        .table(StockCounts::Table)
                        .col(StockCounts::TenantId)
                        .col(StockCounts::LocationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockCountLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockCountLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockCountLines::CountId).uuid().not_null())
                        .col(ColumnDef::new(StockCountLines::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockCountLines::LotId).uuid().null())
                        .col(
                            ColumnDef::new(StockCountLines::SystemQtyBase)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockCountLines::CountedQtyBase)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockCountLines::VarianceQtyBase)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockCountLines::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockCountLines::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-stock-count-lines-count")
                        .table(StockCountLines::Table)
                        .col(StockCountLines::CountId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockCountLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockCounts::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum StockCounts {
        Table,
        Id,
        TenantId,
        LocationId,
        Number,
        Status,
        Note,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        ReviewedAt,
        ReviewedBy,
        PostedAt,
        PostedBy,
    }

    #[derive(DeriveIden)]
    enum StockCountLines {
        Table,
        Id,
        CountId,
        ProductId,
        LotId,
        SystemQtyBase,
        CountedQtyBase,
        VarianceQtyBase,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_orders_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Orders::LocationId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Number).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Orders::KitchenStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Note).string().null())
                        .col(ColumnDef::new(Orders::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                        .col(ColumnDef::new(Orders::PostedAt).timestamp().null())
                        .col(ColumnDef::new(Orders::PostedBy).uuid().null())
                        .col(ColumnDef::new(Orders::VoidedAt).timestamp().null())
                        .col(ColumnDef::new(Orders::VoidedBy).uuid().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-orders-tenant-location")
                        .table(Orders::Table)
                        .col(Orders::TenantId)
                        .col(Orders::LocationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal().not_null())
                        .col(
                            ColumnDef::new(OrderItems::PrepStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(OrderItems::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-order-items-order")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        TenantId,
        LocationId,
        Number,
        Status,
        KitchenStatus,
        Note,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        PostedAt,
        PostedBy,
        VoidedAt,
        VoidedBy,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Quantity,
        UnitPrice,
        PrepStatus,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_waste_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_waste_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WasteRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WasteRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WasteRecords::TenantId).uuid().not_null())
                        .col(ColumnDef::new(WasteRecords::LocationId).uuid().not_null())
                        .col(ColumnDef::new(WasteRecords::Number).string().not_null())
                        .col(
                            ColumnDef::new(WasteRecords::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(WasteRecords::Reason).string().null())
                        .col(ColumnDef::new(WasteRecords::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(WasteRecords::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WasteRecords::UpdatedAt).timestamp().null())
                        .col(ColumnDef::new(WasteRecords::ApprovedAt).timestamp().null())
                        .col(ColumnDef::new(WasteRecords::ApprovedBy).uuid().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WasteLines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(WasteLines::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(WasteLines::WasteId).uuid().not_null())
                        .col(ColumnDef::new(WasteLines::ProductId).uuid().not_null())
                        .col(ColumnDef::new(WasteLines::LotId).uuid().null())
                        .col(ColumnDef::new(WasteLines::Quantity).decimal().not_null())
                        .col(ColumnDef::new(WasteLines::Reason).string().null())
                        .col(ColumnDef::new(WasteLines::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-waste-lines-waste")
                        .table(WasteLines::Table)
                        .col(WasteLines::WasteId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WasteLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WasteRecords::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum WasteRecords {
        Table,
        Id,
        TenantId,
        LocationId,
        Number,
        Status,
        Reason,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        ApprovedAt,
        ApprovedBy,
    }

    #[derive(DeriveIden)]
    enum WasteLines {
        Table,
        Id,
        WasteId,
        ProductId,
        LotId,
        Quantity,
        Reason,
        CreatedAt,
    }
}

mod m20240101_000006_create_goods_receipts_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_goods_receipts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(GoodsReceipts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(GoodsReceipts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(GoodsReceipts::TenantId).uuid().not_null())
                        .col(ColumnDef::new(GoodsReceipts::LocationId).uuid().not_null())
                        .col(ColumnDef::new(GoodsReceipts::Number).string().not_null())
                        .col(
                            ColumnDef::new(GoodsReceipts::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(GoodsReceipts::SupplierRef).string().null())
                        .col(ColumnDef::new(GoodsReceipts::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(GoodsReceipts::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(GoodsReceipts::UpdatedAt).timestamp().null())
                        .col(ColumnDef::new(GoodsReceipts::PostedAt).timestamp().null())
                        .col(ColumnDef::new(GoodsReceipts::PostedBy).uuid().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(GoodsReceiptLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(GoodsReceiptLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceiptLines::ReceiptId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceiptLines::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(GoodsReceiptLines::LotId).uuid().null())
                        .col(
                            ColumnDef::new(GoodsReceiptLines::Quantity)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(GoodsReceiptLines::UnitCost).decimal().null())
                        .col(
                            ColumnDef::new(GoodsReceiptLines::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx-goods-receipt-lines-receipt")
                        .table(GoodsReceiptLines::Table)
                        .col(GoodsReceiptLines::ReceiptId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(GoodsReceiptLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(GoodsReceipts::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum GoodsReceipts {
        Table,
        Id,
        TenantId,
        LocationId,
        Number,
        Status,
        SupplierRef,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        PostedAt,
        PostedBy,
    }

    #[derive(DeriveIden)]
    enum GoodsReceiptLines {
        Table,
        Id,
        ReceiptId,
        ProductId,
        LotId,
        Quantity,
        UnitCost,
        CreatedAt,
    }
}
