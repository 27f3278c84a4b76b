//! Reading [`Settings`] from configuration files and the environment.
//!
//! Values are layered: built-in defaults, then a TOML or JSON document,
//! then `STACHE_*` environment variables. Keys a document leaves out keep
//! their defaults.
//!
//! | Variable | Field |
//! |---|---|
//! | `STACHE_DEBUG` | `debug` |
//! | `STACHE_LOG_LEVEL` | `log_level` |
//! | `STACHE_STANDARDS_MODE` | `compiler.standards_mode` |
//! | `STACHE_STRICT_SECTIONS` | `compiler.strict_sections` |
//! | `STACHE_ESCAPE_HTML` | `compiler.escape_html` |
//! | `STACHE_DELIMS` | `compiler.delims` |
//! | `STACHE_TEMPLATE_DIRS` | `compiler.template_dirs` (comma-separated) |
//! | `STACHE_TEMPLATE_SUFFIX` | `compiler.template_suffix` |
//!
//! ```rust,no_run
//! use stache_rs_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/stache.toml").unwrap();
//! assert!(!settings.compiler.delims.is_empty());
//! ```

use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::error::StacheError;
use crate::settings::Settings;

/// Parses settings from TOML source.
///
/// # Errors
///
/// Returns a `ConfigurationError` for malformed TOML or a value of the wrong type.
pub fn from_toml_str(source: &str) -> Result<Settings, StacheError> {
    toml::from_str(source).map_err(|e| config_error("TOML", e))
}

/// Reads and parses a TOML settings file.
///
/// # Errors
///
/// Returns a `ConfigurationError` if the file is unreadable or invalid.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, StacheError> {
    from_toml_str(&read_config(path.as_ref())?)
}

/// Reads a TOML settings file, then layers `STACHE_*` variables on top.
///
/// # Errors
///
/// Returns a `ConfigurationError` if the file is unreadable or invalid.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, StacheError> {
    from_toml_file(path).map(|mut settings| {
        apply_env_overrides(&mut settings);
        settings
    })
}

/// Parses settings from JSON source.
///
/// # Errors
///
/// Returns a `ConfigurationError` for malformed JSON or a value of the wrong type.
pub fn from_json_str(source: &str) -> Result<Settings, StacheError> {
    serde_json::from_str(source).map_err(|e| config_error("JSON", e))
}

/// Reads and parses a JSON settings file.
///
/// # Errors
///
/// Returns a `ConfigurationError` if the file is unreadable or invalid.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, StacheError> {
    from_json_str(&read_config(path.as_ref())?)
}

/// The defaults with `STACHE_*` variables applied.
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Overwrites fields named by `STACHE_*` variables in the process environment.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides_from(settings, |key| std::env::var(key).ok());
}

/// Overwrites fields using `lookup` to resolve each `STACHE_*` name.
///
/// Flags are on for "true", "1", or "yes" in any case, off otherwise.
pub fn apply_overrides_from<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let flag = |key: &str| lookup(key).map(|v| parse_flag(&v));
    let compiler = &mut settings.compiler;

    if let Some(on) = flag("STACHE_DEBUG") {
        settings.debug = on;
    }
    if let Some(level) = lookup("STACHE_LOG_LEVEL") {
        settings.log_level = level;
    }
    if let Some(on) = flag("STACHE_STANDARDS_MODE") {
        compiler.standards_mode = on;
    }
    if let Some(on) = flag("STACHE_STRICT_SECTIONS") {
        compiler.strict_sections = on;
    }
    if let Some(on) = flag("STACHE_ESCAPE_HTML") {
        compiler.escape_html = on;
    }
    if let Some(delims) = lookup("STACHE_DELIMS") {
        compiler.delims = delims;
    }
    if let Some(dirs) = lookup("STACHE_TEMPLATE_DIRS") {
        compiler.template_dirs = dirs
            .split(',')
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .collect();
    }
    if let Some(suffix) = lookup("STACHE_TEMPLATE_SUFFIX") {
        compiler.template_suffix = suffix;
    }
}

fn parse_flag(val: &str) -> bool {
    ["true", "1", "yes"]
        .iter()
        .any(|on| val.eq_ignore_ascii_case(on))
}

fn read_config(path: &Path) -> Result<String, StacheError> {
    std::fs::read_to_string(path).map_err(|e| {
        StacheError::ConfigurationError(format!("cannot read {}: {e}", path.display()))
    })
}

fn config_error(format: &str, err: impl Display) -> StacheError {
    StacheError::ConfigurationError(format!("invalid {format} settings: {err}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    // ── TOML ────────────────────────────────────────────────────────

    #[test]
    fn test_toml_overrides_some_fields() {
        let toml = r#"
            debug = true
            log_level = "stache_rs_template=debug"

            [compiler]
            zero_is_false = true
            null_value = "[{{name}} is null]"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "stache_rs_template=debug");
        assert!(settings.compiler.zero_is_false);
        assert_eq!(
            settings.compiler.null_value.as_deref(),
            Some("[{{name}} is null]")
        );
        assert!(settings.compiler.escape_html);
        assert_eq!(settings.compiler.delims, "{{ }}");
    }

    #[test]
    fn test_from_toml_str_template_dirs() {
        let toml = r#"
            [compiler]
            template_dirs = ["templates", "shared/partials"]
            template_suffix = ".mustache"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(
            settings.compiler.template_dirs,
            vec![PathBuf::from("templates"), PathBuf::from("shared/partials")]
        );
        assert_eq!(settings.compiler.template_suffix, ".mustache");
    }

    #[test]
    fn test_toml_extra_table() {
        let settings = from_toml_str("[extra]\nsite = \"docs\"\nretries = 3").unwrap();
        assert_eq!(settings.extra["site"], serde_json::json!("docs"));
        assert_eq!(settings.extra["retries"], serde_json::json!(3));
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let settings = from_toml_str("").unwrap();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.compiler, crate::settings::CompilerSettings::default());
    }

    #[test]
    fn test_malformed_toml() {
        let err = from_toml_str("[compiler\nescape_html = ").unwrap_err();
        assert!(matches!(err, StacheError::ConfigurationError(_)));
    }

    #[test]
    fn test_from_toml_str_wrong_type() {
        let result = from_toml_str("[compiler]\nescape_html = \"sometimes\"");
        assert!(matches!(result, Err(StacheError::ConfigurationError(_))));
    }

    #[test]
    fn test_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[compiler]\nstandards_mode = true").unwrap();

        let settings = from_toml_file(file.path()).unwrap();
        assert!(settings.compiler.standards_mode);
    }

    #[test]
    fn test_missing_toml_file() {
        let result = from_toml_file("/nonexistent/stache.toml");
        assert!(matches!(result, Err(StacheError::ConfigurationError(_))));
    }

    // ── JSON ────────────────────────────────────────────────────────

    #[test]
    fn test_json_overrides_nested_fields() {
        let json = r#"{
            "log_level": "debug",
            "compiler": { "delims": "<% %>", "strict_sections": true }
        }"#;

        let settings = from_json_str(json).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.compiler.delims, "<% %>");
        assert!(settings.compiler.strict_sections);
        assert!(settings.compiler.escape_html);
    }

    #[test]
    fn test_malformed_json() {
        assert!(from_json_str("{not json").is_err());
    }

    #[test]
    fn test_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"compiler": {{"empty_string_is_false": true}}}}"#).unwrap();

        let settings = from_json_file(file.path()).unwrap();
        assert!(settings.compiler.empty_string_is_false);
    }

    // ── Environment overrides ───────────────────────────────────────

    #[test]
    fn test_apply_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("STACHE_DEBUG", "yes"),
            ("STACHE_LOG_LEVEL", "trace"),
            ("STACHE_ESCAPE_HTML", "false"),
            ("STACHE_DELIMS", "[[ ]]"),
            ("STACHE_TEMPLATE_DIRS", "a, b ,,c"),
            ("STACHE_TEMPLATE_SUFFIX", ".html"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        apply_overrides_from(&mut settings, |key| vars.get(key).map(|v| (*v).to_string()));

        assert!(settings.debug);
        assert_eq!(settings.log_level, "trace");
        assert!(!settings.compiler.escape_html);
        assert_eq!(settings.compiler.delims, "[[ ]]");
        assert_eq!(
            settings.compiler.template_dirs,
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
        assert_eq!(settings.compiler.template_suffix, ".html");
    }

    #[test]
    fn test_apply_overrides_leaves_unset_values() {
        let mut settings = Settings::default();
        settings.compiler.zero_is_false = true;
        apply_overrides_from(&mut settings, |_| None);
        assert!(settings.compiler.zero_is_false);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(parse_flag("Yes"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }
}
