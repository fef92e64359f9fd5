//! Application layer - Services that drive the domain through the ports.

pub mod acquire;
pub mod orchestrator;
pub mod session;
