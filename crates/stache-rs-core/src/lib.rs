//! # stache-rs-core
//!
//! Core types shared by the stache-rs crates: the error taxonomy, the
//! settings model used to configure a template compiler, settings loading
//! from files and the environment, and tracing-based logging setup.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Compiler and logging settings
//! - [`settings_loader`] - Loading settings from TOML, JSON, and environment variables
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{StacheError, StacheResult};
pub use settings::{CompilerSettings, Settings};
