//! Application layer - use cases and services

pub mod commands;
pub mod services;
pub mod simulation;

pub use commands::{Cli, CommandExecutor, Commands};
pub use services::{ExchangeService, ServiceSnapshot, TxRecord, TxStatus};
pub use simulation::{Simulation, SimulationConfig, SimulationReport};
