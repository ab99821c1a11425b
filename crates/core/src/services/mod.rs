pub mod credential_store;
pub mod metrics_service;
pub mod session_service;
pub mod transaction_service;
