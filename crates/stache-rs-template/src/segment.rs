//! Compiled template segments.
//!
//! A compiled template is a tree of [`Segment`]s: literal text, variable
//! tags, sections (normal and inverted) holding nested segments, and
//! partial includes. Segments are immutable once compiled, except that an
//! include loads its partial on first use.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use stache_rs_core::logging::partial_span;
use stache_rs_core::{StacheError, StacheResult};

use crate::compiler::Compiler;
use crate::context::Context;
use crate::delims::Delims;
use crate::escape::Escaper;
use crate::template::{Fragment, Template, Visitor};
use crate::value::Value;

/// A variable or section name, split into its dotted components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    full: Arc<str>,
    path: Box<[Arc<str>]>,
}

impl Name {
    pub fn new(name: &str) -> Self {
        let full: Arc<str> = Arc::from(name);
        let path = if name != "." && name.contains('.') {
            name.split('.').map(Arc::from).collect()
        } else {
            vec![Arc::clone(&full)].into_boxed_slice()
        };
        Self { full, path }
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }

    pub const fn full(&self) -> &Arc<str> {
        &self.full
    }

    /// The dotted components; a single element for simple names.
    pub fn components(&self) -> &[Arc<str>] {
        &self.path
    }

    pub fn is_compound(&self) -> bool {
        self.path.len() > 1
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// One node of a compiled template.
#[derive(Debug)]
pub enum Segment {
    Text(String),
    Variable(VariableSegment),
    Section(BlockSegment),
    InvertedSection(BlockSegment),
    Include(IncludeSegment),
}

impl Segment {
    pub(crate) fn execute(
        &self,
        tmpl: &Template,
        ctx: &Context<'_>,
        out: &mut dyn fmt::Write,
    ) -> StacheResult<()> {
        match self {
            Self::Text(text) => out.write_str(text)?,
            Self::Variable(var) => var.execute(tmpl, ctx, out)?,
            Self::Section(block) => block.execute_section(tmpl, ctx, out)?,
            Self::InvertedSection(block) => block.execute_inverted(tmpl, ctx, out)?,
            Self::Include(include) => include.execute(ctx, out)?,
        }
        Ok(())
    }

    /// Writes the source form of this segment using `delims`.
    pub(crate) fn decompile(&self, delims: &Delims, out: &mut String) {
        let (open, close) = (delims.start(), delims.end());
        let mut tag = |sigil: &str, name: &str| {
            out.push_str(&open);
            out.push_str(sigil);
            out.push_str(name);
            out.push_str(&close);
        };
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Variable(var) => tag(if var.is_escaped() { "" } else { "&" }, var.name.as_str()),
            Self::Section(block) | Self::InvertedSection(block) => {
                let sigil = if matches!(self, Self::Section(_)) { "#" } else { "^" };
                tag(sigil, block.name.as_str());
                for seg in &block.segs {
                    seg.decompile(delims, out);
                }
                out.push_str(&open);
                out.push('/');
                out.push_str(block.name.as_str());
                out.push_str(&close);
            }
            Self::Include(include) => tag(">", &include.name),
        }
    }

    pub(crate) fn visit(&self, visitor: &mut dyn Visitor) -> StacheResult<()> {
        match self {
            Self::Text(text) => visitor.visit_text(text),
            Self::Variable(var) => visitor.visit_variable(var.name.as_str()),
            Self::Section(block) => {
                if visitor.visit_section(block.name.as_str()) {
                    for seg in &block.segs {
                        seg.visit(visitor)?;
                    }
                }
            }
            Self::InvertedSection(block) => {
                if visitor.visit_inverted_section(block.name.as_str()) {
                    for seg in &block.segs {
                        seg.visit(visitor)?;
                    }
                }
            }
            Self::Include(include) => {
                if visitor.visit_include(&include.name) {
                    include.template()?.visit(visitor)?;
                }
            }
        }
        Ok(())
    }
}

/// A `{{name}}` or unescaped `{{{name}}}` / `{{&name}}` tag.
pub struct VariableSegment {
    name: Name,
    line: usize,
    escaper: Option<Arc<dyn Escaper>>,
}

impl VariableSegment {
    /// `escaper` is `None` for unescaped tags.
    pub fn new(name: Name, line: usize, escaper: Option<Arc<dyn Escaper>>) -> Self {
        Self { name, line, escaper }
    }

    pub const fn name(&self) -> &Name {
        &self.name
    }

    pub const fn line(&self) -> usize {
        self.line
    }

    pub const fn is_escaped(&self) -> bool {
        self.escaper.is_some()
    }

    fn execute(&self, tmpl: &Template, ctx: &Context<'_>, out: &mut dyn fmt::Write) -> StacheResult<()> {
        let value = tmpl.get_value_or_default(ctx, &self.name, self.line)?;
        let text = tmpl.compiler().formatter().format(&value);
        match &self.escaper {
            Some(escaper) => out.write_str(&escaper.escape(&text))?,
            None => out.write_str(&text)?,
        }
        Ok(())
    }
}

impl fmt::Debug for VariableSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableSegment")
            .field("name", &self.name.as_str())
            .field("line", &self.line)
            .field("escaped", &self.is_escaped())
            .finish()
    }
}

/// The body of a `{{#name}}` or `{{^name}}` section.
#[derive(Debug)]
pub struct BlockSegment {
    name: Name,
    line: usize,
    segs: Vec<Segment>,
}

impl BlockSegment {
    pub fn new(name: Name, line: usize, segs: Vec<Segment>) -> Self {
        Self { name, line, segs }
    }

    pub const fn name(&self) -> &Name {
        &self.name
    }

    pub const fn line(&self) -> usize {
        self.line
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segs
    }

    fn execute_section(
        &self,
        tmpl: &Template,
        ctx: &Context<'_>,
        out: &mut dyn fmt::Write,
    ) -> StacheResult<()> {
        let value = tmpl.get_section_value(ctx, &self.name, self.line)?;
        let compiler = tmpl.compiler();

        if let Some(elems) = compiler.collector().to_iterator(&value) {
            let mut elems = elems.peekable();
            let mut index = 0;
            while let Some(elem) = elems.next() {
                index += 1;
                let on_last = elems.peek().is_none();
                let frame = ctx.nest_iteration(elem, index, index == 1, on_last);
                tmpl.execute_segs(&self.segs, &frame, out)?;
            }
            return Ok(());
        }

        match &value {
            Value::Bool(true) => tmpl.execute_segs(&self.segs, ctx, out),
            Value::Bool(false) => Ok(()),
            Value::Lambda(lambda) => {
                let frag = Fragment::new(tmpl, &self.segs, ctx);
                lambda.execute(&frag, out).map_err(|e| StacheError::LambdaError {
                    name: self.name.to_string(),
                    line: self.line,
                    source: Box::new(e),
                })
            }
            other if compiler.is_falsey(other) => Ok(()),
            other => tmpl.execute_segs(&self.segs, &ctx.nest(other.clone()), out),
        }
    }

    fn execute_inverted(
        &self,
        tmpl: &Template,
        ctx: &Context<'_>,
        out: &mut dyn fmt::Write,
    ) -> StacheResult<()> {
        let value = tmpl.get_section_value(ctx, &self.name, self.line)?;
        let compiler = tmpl.compiler();

        if let Some(mut elems) = compiler.collector().to_iterator(&value) {
            if elems.next().is_none() {
                tmpl.execute_segs(&self.segs, ctx, out)?;
            }
            return Ok(());
        }

        match &value {
            Value::Bool(false) => tmpl.execute_segs(&self.segs, ctx, out),
            Value::Bool(true) | Value::Lambda(_) => Ok(()),
            other if compiler.is_falsey(other) => tmpl.execute_segs(&self.segs, ctx, out),
            _ => Ok(()),
        }
    }
}

/// A `{{>name}}` partial include. The partial is loaded and compiled the
/// first time the segment executes, then reused.
pub struct IncludeSegment {
    name: String,
    line: usize,
    compiler: Compiler,
    template: OnceCell<Arc<Template>>,
}

impl IncludeSegment {
    pub fn new(name: String, line: usize, compiler: Compiler) -> Self {
        Self {
            name,
            line,
            compiler,
            template: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn line(&self) -> usize {
        self.line
    }

    /// Returns `true` once the partial has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.template.get().is_some()
    }

    /// Loads the partial on first call. Concurrent first callers block
    /// until one of them finishes, so the loader runs once.
    fn template(&self) -> StacheResult<&Arc<Template>> {
        self.template.get_or_try_init(|| {
            let _span = partial_span(&self.name).entered();
            tracing::debug!(line = self.line, "loading partial");
            self.compiler.load_template(&self.name).map(Arc::new)
        })
    }

    fn execute(&self, ctx: &Context<'_>, out: &mut dyn fmt::Write) -> StacheResult<()> {
        let template = self.template()?;
        template.execute_segs(template.segments(), ctx, out)
    }
}

impl fmt::Debug for IncludeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeSegment")
            .field("name", &self.name)
            .field("line", &self.line)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
