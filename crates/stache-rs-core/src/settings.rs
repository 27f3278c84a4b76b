//! Settings for stache-rs.
//!
//! [`Settings`] holds process-level configuration (debug flag, log level)
//! and a [`CompilerSettings`] block describing how templates are compiled
//! and executed. The defaults match a freshly constructed compiler: HTML
//! escaping on, `{{ }}` delimiters, parent-context fallback enabled, and no
//! partial template directories.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Template compiler configuration.
///
/// Each field maps onto a copy-on-modify builder method of the template
/// compiler; see `Compiler::from_settings` in `stache-rs-template`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Disables compound (`a.b.c`) names and parent-context fallback.
    pub standards_mode: bool,
    /// Makes a section over a missing name an error instead of an empty section.
    pub strict_sections: bool,
    /// Whether variable output is HTML-escaped.
    pub escape_html: bool,
    /// Substituted for null values. `{{name}}` inside it is replaced by the variable name.
    pub null_value: Option<String>,
    /// Substituted for null *and* missing values. Takes precedence over `null_value`.
    pub default_value: Option<String>,
    /// Treat the empty string as false in sections.
    pub empty_string_is_false: bool,
    /// Treat numeric zero as false in sections.
    pub zero_is_false: bool,
    /// The default delimiters, as an `open close` pair (e.g. `{{ }}` or `<% %>`).
    pub delims: String,
    /// Directories searched, in order, for partial templates.
    pub template_dirs: Vec<PathBuf>,
    /// Appended to partial names before searching (e.g. `.mustache`).
    pub template_suffix: String,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            standards_mode: false,
            strict_sections: false,
            escape_html: true,
            null_value: None,
            default_value: None,
            empty_string_is_false: false,
            zero_is_false: false,
            delims: "{{ }}".to_string(),
            template_dirs: Vec::new(),
            template_suffix: String::new(),
        }
    }
}

/// The complete set of stache-rs settings.
///
/// Every field falls back to its default when absent from a config file.
///
/// # Examples
///
/// ```
/// use stache_rs_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(!settings.debug);
/// assert_eq!(settings.log_level, "info");
/// assert!(settings.compiler.escape_html);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether debug mode is enabled (human-readable log output).
    pub debug: bool,
    /// The tracing filter directive (e.g. "info", "stache_rs_template=debug").
    pub log_level: String,
    /// Template compiler configuration.
    pub compiler: CompilerSettings,
    /// The `[extra]` table, passed through untouched for the host
    /// application. The engine never reads it, so an application can keep
    /// its own keys in the same file as the compiler settings.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            compiler: CompilerSettings::default(),
            extra: HashMap::new(),
        }
    }
}
