// Core receiving engine
pub mod inventory;
pub mod po_status;
pub mod receiving;

// Order placement and read model
pub mod purchase_orders;

// Best-effort audit trail
pub mod audit;
