//! Adapters - Concrete implementations of ports, plus the HTTP inbound adapter.

pub mod fetch;
pub mod http;
pub mod process;
