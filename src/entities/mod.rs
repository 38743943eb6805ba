pub mod goods_receipt;
pub mod goods_receipt_line;
pub mod inventory_lot;
pub mod location;
pub mod order;
pub mod order_item;
pub mod product;
pub mod stock_count;
pub mod stock_count_line;
pub mod stock_ledger_entry;
pub mod waste_line;
pub mod waste_record;
