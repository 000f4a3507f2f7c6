//! Domain layer - core business logic and entities

pub mod host;
pub mod oracle;
pub mod pool;
pub mod token;
