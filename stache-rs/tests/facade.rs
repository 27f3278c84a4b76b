//! Integration tests for the `stache-rs` meta-crate: configuration from
//! files and derive support through the re-exports.

use std::fs;

use stache_rs::{compiler_from_file, json, Compiler, StacheError};

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_compiler_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let partials = dir.path().join("partials");
    fs::create_dir(&partials).unwrap();
    fs::write(partials.join("sig.mustache"), "-- <%name%>").unwrap();

    let config = dir.path().join("stache.toml");
    fs::write(
        &config,
        format!(
            "log_level = \"warn\"\n\
             \n\
             [compiler]\n\
             escape_html = false\n\
             delims = \"<% %>\"\n\
             template_dirs = [{:?}]\n\
             template_suffix = \".mustache\"\n",
            partials.display().to_string()
        ),
    )
    .unwrap();

    let compiler = compiler_from_file(&config).unwrap();
    assert!(!compiler.is_standards_mode());
    let template = compiler.compile("<%greeting%>\n<%>sig%>").unwrap();
    let out = template
        .execute(json!({"greeting": "<hi>", "name": "Ann"}))
        .unwrap();
    assert_eq!(out, "<hi>\n-- Ann");
}

#[test]
fn test_compiler_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = compiler_from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, StacheError::ConfigurationError(_)));
}

#[test]
fn test_compiler_from_file_with_bad_delims() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("stache.toml");
    fs::write(&config, "[compiler]\ndelims = \"<%%%\"\n").unwrap();
    let err = compiler_from_file(&config).unwrap_err();
    assert!(matches!(err, StacheError::ConfigurationError(_)));
}

// ── Derive through the re-export ────────────────────────────────────

#[derive(Debug, Clone, stache_rs::Object)]
#[stache(crate = "stache_rs::template", methods("is_overdue"))]
pub struct Invoice {
    pub number: u32,
    pub total: f64,
    pub days_open: u32,
}

impl Invoice {
    const fn is_overdue(&self) -> bool {
        self.days_open > 30
    }
}

#[test]
fn test_derive_with_crate_path() {
    let template = Compiler::default()
        .compile("#{{number}}: {{total}}{{#overdue}} (overdue){{/overdue}}")
        .unwrap();
    let invoice = Invoice {
        number: 7,
        total: 99.5,
        days_open: 45,
    };
    assert_eq!(template.execute(invoice).unwrap(), "#7: 99.5 (overdue)");
}
