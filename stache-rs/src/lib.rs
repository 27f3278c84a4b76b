//! # stache-rs
//!
//! A Mustache template engine: compile a template once, then execute it many
//! times, from many threads, against arbitrary data.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `stache-rs` for everything, or on individual crates
//! for finer-grained control.
//!
//! ```
//! use stache_rs::{json, Compiler};
//!
//! let template = Compiler::default()
//!     .compile("{{#langs}}{{name}}{{^-last}}, {{/-last}}{{/langs}}")
//!     .unwrap();
//! let out = template
//!     .execute(json!({"langs": [{"name": "Rust"}, {"name": "Mustache"}]}))
//!     .unwrap();
//! assert_eq!(out, "Rust, Mustache");
//! ```

use std::path::Path;

/// Errors, settings, settings loading, and logging setup.
pub use stache_rs_core as core;

/// The template engine: compiler, templates, values, and loaders.
pub use stache_rs_template as template;

/// `#[derive(Object)]`.
#[cfg(feature = "macros")]
pub use stache_rs_macros as macros;

#[cfg(feature = "macros")]
pub use stache_rs_macros::Object;

pub use serde_json::json;
pub use stache_rs_core::{CompilerSettings, Settings, StacheError, StacheResult};
pub use stache_rs_template::{Compiler, Fragment, Lambda, Object, Template, ToValue, Value, Visitor};

/// Loads settings from a TOML file, applies `STACHE_*` environment
/// overrides, installs the tracing subscriber, and builds a compiler.
///
/// # Errors
///
/// Returns `ConfigurationError` if the file cannot be read or parsed, or
/// if the configured delimiters are invalid.
pub fn compiler_from_file(path: impl AsRef<Path>) -> StacheResult<Compiler> {
    let settings = stache_rs_core::settings_loader::from_toml_file_with_env(path)?;
    stache_rs_core::logging::setup_logging(&settings);
    tracing::info!(
        standards_mode = settings.compiler.standards_mode,
        template_dirs = settings.compiler.template_dirs.len(),
        "stache-rs configured"
    );
    Compiler::from_settings(&settings.compiler)
}
