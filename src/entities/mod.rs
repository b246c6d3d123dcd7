pub mod audit_log;
pub mod inventory_lot;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod vendor;
