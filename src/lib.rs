//! Snake Arena - turn-based multi-agent snake simulation
//!
//! Agents decide concurrently each turn; the simulation resolves every move
//! against one board with deterministic ordering rules.

pub mod agent;
pub mod core;
pub mod engine;
pub mod simulation;
pub mod spatial;
