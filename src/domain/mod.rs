//! Domain layer - Clip selection, encoding and probing logic.

pub mod av;
pub mod clip;
pub mod error;
pub mod path_safety;
pub mod stage;
pub mod window;
