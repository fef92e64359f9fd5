//! Ports - Trait definitions for the network and subprocess seams.

pub mod fetch;
pub mod process;
