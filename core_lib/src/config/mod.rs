//! Layered application configuration

pub mod settings;

pub use settings::*;
