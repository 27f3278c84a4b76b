//! The template compiler and its configuration.
//!
//! A [`Compiler`] is an immutable bundle of configuration. Every builder
//! method consumes the compiler and returns a modified copy, so a compiler
//! can be cloned and specialized without affecting templates already
//! compiled from it.
//!
//! ```
//! use stache_rs_template::Compiler;
//! use serde_json::json;
//!
//! let compiler = Compiler::default().escape_html(false).default_value("?");
//! let template = compiler.compile("{{a}} & {{b}}").unwrap();
//! assert_eq!(template.execute(json!({"a": "<x>"})).unwrap(), "<x> & ?");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use stache_rs_core::settings::CompilerSettings;
use stache_rs_core::{StacheError, StacheResult};

use crate::collector::{Collector, DefaultCollector};
use crate::delims::Delims;
use crate::escape::{Escaper, Escapers};
use crate::loaders::{FileSystemLoader, NoLoader, TemplateLoader};
use crate::parser::Parser;
use crate::template::Template;
use crate::value::Value;

/// Converts resolved values to text before escaping.
pub trait Formatter: Send + Sync {
    fn format<'a>(&self, value: &'a Value) -> Cow<'a, str>;
}

impl<F> Formatter for F
where
    F: Fn(&Value) -> String + Send + Sync,
{
    fn format<'a>(&self, value: &'a Value) -> Cow<'a, str> {
        Cow::Owned(self(value))
    }
}

/// Formats values with their [`Display`](std::fmt::Display) rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormatter;

impl Formatter for DefaultFormatter {
    fn format<'a>(&self, value: &'a Value) -> Cow<'a, str> {
        match value {
            Value::Str(s) => Cow::Borrowed(&**s),
            other => Cow::Owned(other.to_string()),
        }
    }
}

/// Compiles templates and holds the configuration they execute with.
#[derive(Clone)]
pub struct Compiler {
    standards_mode: bool,
    strict_sections: bool,
    null_value: Option<Arc<str>>,
    missing_is_null: bool,
    empty_string_is_false: bool,
    zero_is_false: bool,
    formatter: Arc<dyn Formatter>,
    escaper: Arc<dyn Escaper>,
    loader: Arc<dyn TemplateLoader>,
    collector: Arc<dyn Collector>,
    delims: Delims,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            standards_mode: false,
            strict_sections: false,
            null_value: None,
            missing_is_null: false,
            empty_string_is_false: false,
            zero_is_false: false,
            formatter: Arc::new(DefaultFormatter),
            escaper: Escapers::html(),
            loader: Arc::new(NoLoader),
            collector: Arc::new(DefaultCollector),
            delims: Delims::default(),
        }
    }
}

impl Compiler {
    /// Builds a compiler from settings. Partials are loaded from
    /// `template_dirs` when any are configured.
    pub fn from_settings(settings: &CompilerSettings) -> StacheResult<Self> {
        let mut compiler = Self::default()
            .standards_mode(settings.standards_mode)
            .strict_sections(settings.strict_sections)
            .escape_html(settings.escape_html)
            .empty_string_is_false(settings.empty_string_is_false)
            .zero_is_false(settings.zero_is_false)
            .with_delims(&settings.delims)?;
        if let Some(null_value) = &settings.null_value {
            compiler = compiler.null_value(null_value.as_str());
        }
        if let Some(default_value) = &settings.default_value {
            compiler = compiler.default_value(default_value.as_str());
        }
        if !settings.template_dirs.is_empty() {
            let loader = FileSystemLoader::new(settings.template_dirs.clone())
                .with_suffix(settings.template_suffix.as_str());
            compiler = compiler.with_loader(Arc::new(loader));
        }
        tracing::debug!(?compiler, "compiler configured from settings");
        Ok(compiler)
    }

    // ── Builders ─────────────────────────────────────────────────────

    /// Disables compound names and parent-context fallback.
    #[must_use]
    pub const fn standards_mode(mut self, standards_mode: bool) -> Self {
        self.standards_mode = standards_mode;
        self
    }

    /// Makes a section over a missing name an error.
    #[must_use]
    pub const fn strict_sections(mut self, strict_sections: bool) -> Self {
        self.strict_sections = strict_sections;
        self
    }

    /// Chooses between HTML escaping and no escaping.
    #[must_use]
    pub fn escape_html(self, escape: bool) -> Self {
        self.with_escaper(if escape { Escapers::html() } else { Escapers::none() })
    }

    #[must_use]
    pub fn with_escaper(mut self, escaper: Arc<dyn Escaper>) -> Self {
        self.escaper = escaper;
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn TemplateLoader>) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn with_collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collector = collector;
        self
    }

    /// Renders null values as `value`. Missing names are still errors.
    /// `{{name}}` inside `value` is replaced by the variable's name.
    #[must_use]
    pub fn null_value(mut self, value: impl AsRef<str>) -> Self {
        self.null_value = Some(Arc::from(value.as_ref()));
        self.missing_is_null = false;
        self
    }

    /// Renders both null and missing values as `value`.
    #[must_use]
    pub fn default_value(mut self, value: impl AsRef<str>) -> Self {
        self.null_value = Some(Arc::from(value.as_ref()));
        self.missing_is_null = true;
        self
    }

    #[must_use]
    pub const fn empty_string_is_false(mut self, flag: bool) -> Self {
        self.empty_string_is_false = flag;
        self
    }

    #[must_use]
    pub const fn zero_is_false(mut self, flag: bool) -> Self {
        self.zero_is_false = flag;
        self
    }

    /// Sets the default delimiters, e.g. `"<% %>"`.
    pub fn with_delims(mut self, spec: &str) -> StacheResult<Self> {
        self.delims.update_delims(spec)?;
        Ok(self)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub const fn is_standards_mode(&self) -> bool {
        self.standards_mode
    }

    pub const fn is_strict_sections(&self) -> bool {
        self.strict_sections
    }

    pub const fn is_missing_null(&self) -> bool {
        self.missing_is_null
    }

    /// The configured null substitute, before `{{name}}` expansion.
    pub fn null_text(&self) -> Option<&str> {
        self.null_value.as_deref()
    }

    pub const fn delims(&self) -> Delims {
        self.delims
    }

    pub fn formatter(&self) -> &dyn Formatter {
        &*self.formatter
    }

    pub fn escaper(&self) -> Arc<dyn Escaper> {
        Arc::clone(&self.escaper)
    }

    pub fn collector(&self) -> &dyn Collector {
        &*self.collector
    }

    pub fn loader(&self) -> &dyn TemplateLoader {
        &*self.loader
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Compiles template source.
    pub fn compile(&self, source: &str) -> StacheResult<Template> {
        let segs = Parser::new(self).parse(source)?;
        tracing::debug!(segments = segs.len(), "compiled template");
        Ok(Template::new(segs, self.clone()))
    }

    /// Reads template source to the end and compiles it.
    pub fn compile_reader(&self, mut reader: impl Read) -> StacheResult<Template> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        self.compile(&source)
    }

    /// Loads and compiles the partial `name`.
    ///
    /// Loader and compile failures are reported as
    /// [`StacheError::PartialError`].
    pub fn load_template(&self, name: &str) -> StacheResult<Template> {
        let wrap = |source: StacheError| StacheError::PartialError {
            name: name.to_string(),
            source: Box::new(source),
        };
        let source = self.loader.load(name).map_err(wrap)?;
        self.compile(&source).map_err(wrap)
    }

    /// Whether `value` counts as false under the empty-string and zero
    /// policies. Booleans, lists and null are handled by the caller.
    pub fn is_falsey(&self, value: &Value) -> bool {
        (self.empty_string_is_false && self.formatter.format(value).is_empty())
            || (self.zero_is_false && value.is_zero())
    }

    /// The text substituted for a null value of `name`, if configured.
    pub fn compute_null_value(&self, name: &str) -> Option<String> {
        self.null_value
            .as_deref()
            .map(|value| value.replace("{{name}}", name))
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("standards_mode", &self.standards_mode)
            .field("strict_sections", &self.strict_sections)
            .field("null_value", &self.null_value)
            .field("missing_is_null", &self.missing_is_null)
            .field("empty_string_is_false", &self.empty_string_is_false)
            .field("zero_is_false", &self.zero_is_false)
            .field("delims", &self.delims.to_string())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let compiler = Compiler::default();
        assert!(!compiler.is_standards_mode());
        assert!(!compiler.is_strict_sections());
        assert!(!compiler.is_missing_null());
        assert_eq!(compiler.null_text(), None);
        assert!(compiler.delims().is_staches());
    }

    #[test]
    fn test_builders_copy_on_modify() {
        let base = Compiler::default();
        let strict = base.clone().strict_sections(true);
        assert!(strict.is_strict_sections());
        assert!(!base.is_strict_sections());
    }

    #[test]
    fn test_null_and_default_value() {
        let nulls = Compiler::default().null_value("[{{name}}]");
        assert!(!nulls.is_missing_null());
        assert_eq!(nulls.compute_null_value("x").as_deref(), Some("[x]"));

        let defaults = nulls.default_value("-");
        assert!(defaults.is_missing_null());
        assert_eq!(defaults.compute_null_value("x").as_deref(), Some("-"));
    }

    #[test]
    fn test_is_falsey_policies() {
        let plain = Compiler::default();
        assert!(!plain.is_falsey(&Value::from("")));
        assert!(!plain.is_falsey(&Value::Int(0)));

        let strict = plain.empty_string_is_false(true).zero_is_false(true);
        assert!(strict.is_falsey(&Value::from("")));
        assert!(strict.is_falsey(&Value::Int(0)));
        assert!(strict.is_falsey(&Value::Float(0.0)));
        assert!(!strict.is_falsey(&Value::from("0")));
        assert!(!strict.is_falsey(&Value::Int(2)));
    }

    #[test]
    fn test_default_formatter() {
        assert_eq!(DefaultFormatter.format(&Value::from("s")), "s");
        assert_eq!(DefaultFormatter.format(&Value::Null), "null");
        assert_eq!(DefaultFormatter.format(&Value::Bool(true)), "true");
    }

    #[test]
    fn test_with_delims_rejects_bad_spec() {
        assert!(matches!(
            Compiler::default().with_delims("<<< >>>"),
            Err(StacheError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_compile_reader() {
        let template = Compiler::default()
            .compile_reader("hi {{x}}".as_bytes())
            .unwrap();
        assert_eq!(template.execute(serde_json::json!({"x": 1})).unwrap(), "hi 1");
    }

    #[test]
    fn test_load_template_wraps_errors() {
        let err = Compiler::default().load_template("nav").unwrap_err();
        match err {
            StacheError::PartialError { name, source } => {
                assert_eq!(name, "nav");
                assert!(matches!(*source, StacheError::Unsupported(_)));
            }
            other => panic!("expected partial error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("greet.html"), "<% who %>").unwrap();

        let settings = CompilerSettings {
            escape_html: false,
            delims: "<% %>".to_string(),
            default_value: Some("nobody".to_string()),
            template_dirs: vec![PathBuf::from(dir.path())],
            template_suffix: ".html".to_string(),
            ..CompilerSettings::default()
        };
        let compiler = Compiler::from_settings(&settings).unwrap();
        assert!(compiler.is_missing_null());
        assert_eq!(compiler.delims().to_string(), "<% %>");

        let template = compiler.compile("<%> greet %>/<%x%>").unwrap();
        let out = template
            .execute(serde_json::json!({"who": "<me>", "x": null}))
            .unwrap();
        assert_eq!(out, "<me>/nobody");
    }
}
