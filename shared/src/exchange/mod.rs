pub mod cache;
pub mod error;
pub mod exchange_config;
pub mod table_exchange;
