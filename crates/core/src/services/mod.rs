pub mod aggregation;
pub mod session_manager;
pub mod transaction_store;
