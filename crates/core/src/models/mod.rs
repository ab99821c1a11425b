pub mod filter;
pub mod identity;
pub mod metrics;
pub mod money;
pub mod settings;
pub mod transaction;
