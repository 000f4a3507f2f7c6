//! oracle-swap - oracle-priced two-token AMM with LP share accounting
//! Built with Domain-Driven Design principles

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

// Re-export main types for convenience
pub use application::ExchangeService;
pub use domain::host::{Host, PoolSetup};
pub use domain::pool::{OraclePool, SwapDirection};
pub use shared::errors::{AppError, PoolError};
