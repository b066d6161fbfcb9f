//! # Pulse Common Library
//!
//! Shared code for the Pulse survey analytics services including:
//! - Error types
//! - Event types (PulseEvent enum) and the broadcast EventBus
//! - Bootstrap configuration (root folder and TOML file handling)

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
