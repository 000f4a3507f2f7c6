//! Infrastructure layer - external price source and state persistence

pub mod hermes;
pub mod state_store;

pub use hermes::{HermesClient, PriceSource, PriceUpdates};
pub use state_store::JsonStore;
