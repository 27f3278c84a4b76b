//! Compiled templates.
//!
//! A [`Template`] is immutable after compilation and may be executed from
//! many threads at once. Each template owns a fetcher cache shared by all
//! of its executions.
//!
//! ## Name resolution
//!
//! A name is resolved against the context chain:
//!
//! 1. Unless in standards mode, a compound name `a.b.c` resolves `a`
//!    normally, then `b` within that value, then `c` within that.
//! 2. `.` and `this` are the current context value; `-first`, `-last`
//!    and `-index` describe the innermost iteration.
//! 3. In standards mode only the current context value is consulted.
//! 4. Otherwise each frame is consulted from innermost outward and the
//!    first one with a member by that name wins.

use std::fmt;
use std::sync::Arc;

use stache_rs_core::{StacheError, StacheResult};

use crate::collector::{FetcherCache, FetcherKey, NOT_FOUND_FETCHER};
use crate::compiler::Compiler;
use crate::context::Context;
use crate::segment::{Name, Segment};
use crate::value::Value;

/// A compiled template.
pub struct Template {
    segs: Vec<Segment>,
    compiler: Compiler,
    fcache: FetcherCache,
}

impl Template {
    pub(crate) fn new(segs: Vec<Segment>, compiler: Compiler) -> Self {
        let fcache = compiler.collector().create_fetcher_cache();
        Self {
            segs,
            compiler,
            fcache,
        }
    }

    /// Executes the template against `data` and returns the output.
    ///
    /// # Examples
    ///
    /// ```
    /// use stache_rs_template::Compiler;
    /// use serde_json::json;
    ///
    /// let t = Compiler::default().compile("{{greeting}}, {{name}}!").unwrap();
    /// let out = t.execute(json!({"greeting": "Hi", "name": "<you>"})).unwrap();
    /// assert_eq!(out, "Hi, &lt;you&gt;!");
    /// ```
    pub fn execute(&self, data: impl Into<Value>) -> StacheResult<String> {
        let mut out = String::new();
        self.execute_into(data, &mut out)?;
        Ok(out)
    }

    /// Executes the template against `data`, writing to `out`.
    pub fn execute_into(&self, data: impl Into<Value>, out: &mut dyn fmt::Write) -> StacheResult<()> {
        let ctx = Context::root(data.into());
        self.execute_segs(&self.segs, &ctx, out)
    }

    /// Executes the template against `data`, falling back to `parent` for
    /// names `data` does not have.
    pub fn execute_with_parent(
        &self,
        data: impl Into<Value>,
        parent: impl Into<Value>,
        out: &mut dyn fmt::Write,
    ) -> StacheResult<()> {
        let parent = Context::root(parent.into());
        let ctx = parent.nest(data.into());
        self.execute_segs(&self.segs, &ctx, out)
    }

    /// Walks the template structure. Partials are loaded and descended
    /// into when the visitor asks for it.
    pub fn visit(&self, visitor: &mut dyn Visitor) -> StacheResult<()> {
        for seg in &self.segs {
            seg.visit(visitor)?;
        }
        Ok(())
    }

    /// Reconstructs the template source using the compiler's delimiters.
    pub fn decompile(&self) -> String {
        let delims = self.compiler.delims();
        let mut out = String::new();
        for seg in &self.segs {
            seg.decompile(&delims, &mut out);
        }
        out
    }

    pub const fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segs
    }

    pub const fn fetcher_cache(&self) -> &FetcherCache {
        &self.fcache
    }

    pub(crate) fn execute_segs(
        &self,
        segs: &[Segment],
        ctx: &Context<'_>,
        out: &mut dyn fmt::Write,
    ) -> StacheResult<()> {
        for seg in segs {
            seg.execute(self, ctx, out)?;
        }
        Ok(())
    }

    // ── Resolution ───────────────────────────────────────────────────

    /// Resolves a variable tag, substituting the configured null value.
    pub(crate) fn get_value_or_default(
        &self,
        ctx: &Context<'_>,
        name: &Name,
        line: usize,
    ) -> StacheResult<Value> {
        let value = self.get_value(ctx, name, line, self.compiler.is_missing_null())?;
        if value.is_null() {
            if let Some(substitute) = self.compiler.compute_null_value(name.as_str()) {
                return Ok(Value::from(substitute));
            }
        }
        Ok(value)
    }

    /// Resolves a section name. Missing names are an empty list unless
    /// sections are strict.
    pub(crate) fn get_section_value(
        &self,
        ctx: &Context<'_>,
        name: &Name,
        line: usize,
    ) -> StacheResult<Value> {
        let value = self.get_value(ctx, name, line, !self.compiler.is_strict_sections())?;
        Ok(if value.is_null() {
            Value::List(Arc::default())
        } else {
            value
        })
    }

    /// Resolves `name`; a missing name is `Null` when `missing_is_null`,
    /// otherwise an error.
    pub(crate) fn get_value(
        &self,
        ctx: &Context<'_>,
        name: &Name,
        line: usize,
        missing_is_null: bool,
    ) -> StacheResult<Value> {
        if !self.compiler.is_standards_mode() && name.is_compound() {
            return self.get_compound_value(ctx, name, line, missing_is_null);
        }
        let value = self.lookup(ctx, name.full(), line)?;
        check_for_missing(name.as_str(), line, missing_is_null, value)
    }

    fn get_compound_value(
        &self,
        ctx: &Context<'_>,
        name: &Name,
        line: usize,
        missing_is_null: bool,
    ) -> StacheResult<Value> {
        let Some((first, rest)) = name.components().split_first() else {
            return check_for_missing(name.as_str(), line, missing_is_null, None);
        };
        let mut data = self.lookup(ctx, first, line)?;
        let mut resolved = first;
        for comp in rest {
            match data {
                None if missing_is_null => return Ok(Value::Null),
                None => {
                    return Err(StacheError::resolution(
                        name.as_str(),
                        line,
                        format!(
                            "Missing context for compound variable '{name}' on line {line}. \
                             '{resolved}' was not found."
                        ),
                    ))
                }
                Some(Value::Null) if missing_is_null || self.compiler.null_text().is_some() => {
                    return Ok(Value::Null)
                }
                Some(Value::Null) => {
                    return Err(StacheError::resolution(
                        name.as_str(),
                        line,
                        format!(
                            "Null context for compound variable '{name}' on line {line}. \
                             '{resolved}' resolved to null."
                        ),
                    ))
                }
                Some(value) => data = self.get_value_in(&value, comp, line)?,
            }
            resolved = comp;
        }
        check_for_missing(name.as_str(), line, missing_is_null, data)
    }

    /// Resolves one simple name against the context chain.
    fn lookup(&self, ctx: &Context<'_>, name: &Arc<str>, line: usize) -> StacheResult<Option<Value>> {
        match &**name {
            "." | "this" => return Ok(Some(ctx.data.clone())),
            "-first" => return Ok(Some(Value::Bool(ctx.on_first))),
            "-last" => return Ok(Some(Value::Bool(ctx.on_last))),
            "-index" => return Ok(Some(Value::from(ctx.index))),
            _ => {}
        }

        if self.compiler.is_standards_mode() {
            return self.get_value_in(&ctx.data, name, line);
        }
        for frame in ctx.frames() {
            if let Some(value) = self.get_value_in(&frame.data, name, line)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Fetches `name` from one value through the fetcher cache.
    fn get_value_in(&self, data: &Value, name: &Arc<str>, line: usize) -> StacheResult<Option<Value>> {
        if data.is_null() {
            return Err(StacheError::resolution(
                &**name,
                line,
                format!("Null context for variable '{name}' on line {line}"),
            ));
        }

        let key = FetcherKey::new(data, name);
        if let Some(cached) = self.fcache.get(&key) {
            match cached.get(data, name) {
                Ok(value) => return Ok(value),
                Err(err) => tracing::trace!(name = %name, error = %err, "discarding stale fetcher"),
            }
        }

        let fetcher = self
            .compiler
            .collector()
            .create_fetcher(data, name)
            .unwrap_or_else(|| Arc::clone(&NOT_FOUND_FETCHER));
        match fetcher.get(data, name) {
            Ok(value) => {
                tracing::trace!(name = %name, kind = data.type_name(), "caching fetcher");
                self.fcache.insert(key, fetcher);
                Ok(value)
            }
            Err(err) => Err(StacheError::resolution(
                &**name,
                line,
                format!("Failure fetching variable '{name}' on line {line}: {err}"),
            )),
        }
    }
}

fn check_for_missing(
    name: &str,
    line: usize,
    missing_is_null: bool,
    value: Option<Value>,
) -> StacheResult<Value> {
    match value {
        Some(value) => Ok(value),
        None if missing_is_null => Ok(Value::Null),
        None => Err(StacheError::resolution(
            name,
            line,
            format!("No key, method or field with name '{name}' on line {line}"),
        )),
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("segs", &self.segs)
            .field("fcache", &self.fcache)
            .finish_non_exhaustive()
    }
}

/// The body of a section handed to a [`Lambda`](crate::value::Lambda).
pub struct Fragment<'a> {
    template: &'a Template,
    segs: &'a [Segment],
    context: &'a Context<'a>,
}

impl<'a> Fragment<'a> {
    pub(crate) const fn new(template: &'a Template, segs: &'a [Segment], context: &'a Context<'a>) -> Self {
        Self {
            template,
            segs,
            context,
        }
    }

    /// Renders the section body in the current context.
    pub fn execute(&self, out: &mut dyn fmt::Write) -> StacheResult<()> {
        self.template.execute_segs(self.segs, self.context, out)
    }

    /// Renders the section body with `data` pushed as a new context frame.
    pub fn execute_with(&self, data: impl Into<Value>, out: &mut dyn fmt::Write) -> StacheResult<()> {
        let ctx = self.context.nest(data.into());
        self.template.execute_segs(self.segs, &ctx, out)
    }

    /// Renders the section body in the current context to a string.
    pub fn execute_to_string(&self) -> StacheResult<String> {
        let mut out = String::new();
        self.execute(&mut out)?;
        Ok(out)
    }

    /// The innermost context value.
    pub fn context(&self) -> &Value {
        &self.context.data
    }

    /// The context value `n` frames out; `context_at(0)` is [`context`](Self::context).
    pub fn context_at(&self, n: usize) -> Option<&Value> {
        self.context.frames().nth(n).map(|frame| &frame.data)
    }

    /// Reconstructs the section body source using the compiler's default
    /// delimiters.
    pub fn decompile(&self) -> String {
        let delims = self.template.compiler().delims();
        let mut out = String::new();
        for seg in self.segs {
            seg.decompile(&delims, &mut out);
        }
        out
    }
}

/// Walks the structure of a template. Returning `false` from a section or
/// include callback skips its contents.
///
/// A visitor that always descends into a partial that includes itself
/// will recurse without end.
pub trait Visitor {
    fn visit_text(&mut self, _text: &str) {}

    fn visit_variable(&mut self, _name: &str) {}

    fn visit_include(&mut self, _name: &str) -> bool {
        true
    }

    fn visit_section(&mut self, _name: &str) -> bool {
        true
    }

    fn visit_inverted_section(&mut self, _name: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(source: &str, data: serde_json::Value) -> StacheResult<String> {
        Compiler::default().compile(source)?.execute(data)
    }

    #[test]
    fn test_parent_fallback() {
        let out = render("{{#a}}{{x}}{{y}}{{/a}}", json!({"a": {"x": 1}, "y": 2})).unwrap();
        assert_eq!(out, "12");
    }

    #[test]
    fn test_execute_with_parent() {
        let template = Compiler::default().compile("{{a}} {{b}}").unwrap();
        let mut out = String::new();
        template
            .execute_with_parent(json!({"a": "child"}), json!({"a": "x", "b": "parent"}), &mut out)
            .unwrap();
        assert_eq!(out, "child parent");
    }

    #[test]
    fn test_fetcher_cache_populated() {
        let template = Compiler::default().compile("{{a}}{{b}}{{a}}").unwrap();
        assert!(template.fetcher_cache().is_empty());
        template.execute(json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(template.fetcher_cache().len(), 2);
    }

    #[test]
    fn test_missing_name_error() {
        let err = render("line1\n{{nope}}", json!({})).unwrap_err();
        assert_eq!(err.name(), Some("nope"));
        assert_eq!(err.line(), Some(2));
        assert!(err.to_string().contains("No key, method or field with name 'nope' on line 2"));
    }

    #[test]
    fn test_null_context_error() {
        let err = render("{{#items}}{{name}}{{/items}}", json!({"items": [null]})).unwrap_err();
        assert!(err.to_string().contains("Null context for variable 'name'"));
    }

    #[test]
    fn test_decompile_roundtrips_source() {
        let source = "a {{b}} {{#c}}{{&d}}{{/c}}{{^e}}!{{/e}}{{>f}}";
        let template = Compiler::default().compile(source).unwrap();
        assert_eq!(template.decompile(), source);
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Visitor for Recorder {
        fn visit_text(&mut self, text: &str) {
            self.events.push(format!("text:{text}"));
        }

        fn visit_variable(&mut self, name: &str) {
            self.events.push(format!("var:{name}"));
        }

        fn visit_section(&mut self, name: &str) -> bool {
            self.events.push(format!("section:{name}"));
            name != "skip"
        }

        fn visit_inverted_section(&mut self, name: &str) -> bool {
            self.events.push(format!("inverted:{name}"));
            true
        }
    }

    #[test]
    fn test_visitor_walks_and_skips() {
        let template = Compiler::default()
            .compile("hi {{#keep}}{{a}}{{/keep}}{{#skip}}{{b}}{{/skip}}{{^neg}}{{c}}{{/neg}}")
            .unwrap();
        let mut recorder = Recorder::default();
        template.visit(&mut recorder).unwrap();
        assert_eq!(
            recorder.events,
            [
                "text:hi ",
                "section:keep",
                "var:a",
                "section:skip",
                "inverted:neg",
                "var:c"
            ]
        );
    }
}
