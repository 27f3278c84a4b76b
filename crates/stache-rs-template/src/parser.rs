//! Template parsing.
//!
//! The parser is a character-level state machine. Literal text is collected
//! until an opening delimiter is seen; the tag text is then collected until
//! a closing delimiter and handed to an accumulator, which keeps a stack of
//! open sections. When a section closes, or the template ends, the
//! segments of that level are trimmed so that lines holding nothing but a
//! section, comment, or delimiter tag leave no trace in the output.

use std::str::Chars;

use stache_rs_core::{StacheError, StacheResult};

use crate::compiler::Compiler;
use crate::delims::Delims;
use crate::segment::{BlockSegment, IncludeSegment, Name, Segment, VariableSegment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    MatchingStart,
    Tag,
    MatchingEnd,
}

/// Parses template source into segments for a compiler.
pub struct Parser<'c> {
    compiler: &'c Compiler,
    delims: Delims,
    state: State,
    text: String,
    line: usize,
    accum: Accumulator,
}

impl<'c> Parser<'c> {
    pub fn new(compiler: &'c Compiler) -> Self {
        Self {
            compiler,
            delims: compiler.delims(),
            state: State::Text,
            text: String::new(),
            line: 1,
            accum: Accumulator::default(),
        }
    }

    /// Parses `source`. Delimiter directives inside the source only affect
    /// the rest of that source.
    pub fn parse(&mut self, source: &str) -> StacheResult<Vec<Segment>> {
        let saved = self.delims.save();
        let result = self.parse_source(source);
        self.delims.restore(saved);
        self.state = State::Text;
        self.text.clear();
        self.line = 1;
        let accum = std::mem::take(&mut self.accum);
        result?;
        accum.finish(self.compiler)
    }

    fn parse_source(&mut self, source: &str) -> StacheResult<()> {
        let mut chars = source.chars();
        while let Some(c) = chars.next() {
            if c == '\n' {
                self.line += 1;
            }
            self.parse_char(Some(c), &mut chars)?;
        }

        // Whatever was in progress when the input ran out is literal text.
        match self.state {
            State::Text => {}
            State::MatchingStart => self.text.push(self.delims.start1),
            State::Tag => self.restore_start_tag(),
            State::MatchingEnd => {
                self.restore_start_tag();
                self.text.push(self.delims.end1);
            }
        }
        self.accum.add_text(&mut self.text);
        Ok(())
    }

    /// `None` stands for the absent second character of a one-character
    /// delimiter, so a one-character match completes immediately.
    fn parse_char(&mut self, c: Option<char>, rest: &mut Chars<'_>) -> StacheResult<()> {
        match self.state {
            State::Text => {
                let Some(c) = c else { return Ok(()) };
                if c == self.delims.start1 {
                    self.state = State::MatchingStart;
                    if self.delims.start2.is_none() {
                        self.parse_char(None, rest)?;
                    }
                } else {
                    self.text.push(c);
                }
            }

            State::MatchingStart => {
                if c == self.delims.start2 {
                    self.accum.add_text(&mut self.text);
                    self.state = State::Tag;
                } else {
                    self.text.push(self.delims.start1);
                    self.state = State::Text;
                    self.parse_char(c, rest)?;
                }
            }

            State::Tag => {
                let Some(c) = c else { return Ok(()) };
                if c == self.delims.end1 {
                    self.state = State::MatchingEnd;
                    if self.delims.end2.is_none() {
                        self.parse_char(None, rest)?;
                    }
                } else if c == self.delims.start1 && !self.text.is_empty() && !self.text.starts_with('!') {
                    // An open delimiter inside an unfinished tag: what we
                    // have so far was literal text, and a new tag starts here.
                    self.restore_start_tag();
                    self.accum.add_text(&mut self.text);
                    self.state = if self.delims.start2.is_none() {
                        State::Tag
                    } else {
                        State::MatchingStart
                    };
                } else {
                    self.text.push(c);
                }
            }

            State::MatchingEnd => {
                if c == self.delims.end2 {
                    self.state = State::Text;
                    self.finish_tag(rest)?;
                } else {
                    self.text.push(self.delims.end1);
                    self.state = State::Tag;
                    self.parse_char(c, rest)?;
                }
            }
        }
        Ok(())
    }

    fn finish_tag(&mut self, rest: &mut Chars<'_>) -> StacheResult<()> {
        let mut tag = std::mem::take(&mut self.text);

        if let Some(directive) = tag.strip_prefix('=') {
            let Some(spec) = directive.strip_suffix('=') else {
                return Err(StacheError::parse(
                    format!("Invalid delimiter directive '{tag}'"),
                    self.line,
                ));
            };
            self.delims.update_delims(spec)?;
            self.accum.add_faux();
            return Ok(());
        }

        if self.delims.is_staches() && tag.starts_with('{') {
            match rest.next() {
                Some('}') => tag.replace_range(..1, "&"),
                _ => {
                    return Err(StacheError::parse(
                        format!("Invalid triple-mustache tag: {{{{{tag}}}}}"),
                        self.line,
                    ))
                }
            }
        }

        self.accum.add_tag(&tag, self.line)
    }

    fn restore_start_tag(&mut self) {
        self.text.insert_str(0, &self.delims.start());
    }
}

// ── Accumulation ─────────────────────────────────────────────────────

#[derive(Debug)]
struct TextNode {
    text: String,
    /// Index of the first newline, when only whitespace precedes it.
    lead_blank: Option<usize>,
    /// Index just past the last newline, when only whitespace follows it.
    trail_blank: Option<usize>,
}

impl TextNode {
    fn new(text: String, first: bool) -> Self {
        let lead_blank = lead_blank(&text);
        let trail_blank = trail_blank(&text, first);
        Self {
            text,
            lead_blank,
            trail_blank,
        }
    }

    fn trim_lead_blank(&mut self) {
        if let Some(lead) = self.lead_blank.take() {
            let pos = lead + 1;
            self.text.drain(..pos);
            self.trail_blank = self.trail_blank.map(|trail| trail.saturating_sub(pos));
        }
    }

    fn trim_trail_blank(&mut self) {
        if let Some(trail) = self.trail_blank.take() {
            self.text.truncate(trail);
        }
    }
}

fn lead_blank(text: &str) -> Option<usize> {
    for (ii, c) in text.char_indices() {
        if c == '\n' {
            return Some(ii);
        }
        if !c.is_whitespace() {
            return None;
        }
    }
    None
}

/// The first text of a template starts a line even without a newline.
fn trail_blank(text: &str, first: bool) -> Option<usize> {
    for (ii, c) in text.char_indices().rev() {
        if c == '\n' {
            return Some(ii + 1);
        }
        if !c.is_whitespace() {
            return None;
        }
    }
    first.then_some(0)
}

#[derive(Debug)]
enum Node {
    Text(TextNode),
    /// A tag that renders nothing (comment or delimiter change) but still
    /// takes part in standalone-line trimming.
    Faux,
    Variable {
        name: String,
        line: usize,
        escaped: bool,
    },
    Block {
        name: String,
        line: usize,
        inverted: bool,
        children: Vec<Node>,
    },
    Include {
        name: String,
        line: usize,
    },
}

impl Node {
    const fn leads_blank(&self) -> bool {
        matches!(self, Self::Text(TextNode { lead_blank: Some(_), .. }))
    }

    const fn trails_blank(&self) -> bool {
        matches!(self, Self::Text(TextNode { trail_blank: Some(_), .. }))
    }

    fn trim_lead_blank(&mut self) {
        if let Self::Text(text) = self {
            text.trim_lead_blank();
        }
    }

    fn trim_trail_blank(&mut self) {
        if let Self::Text(text) = self {
            text.trim_trail_blank();
        }
    }

    fn first_leads_blank(&self) -> bool {
        match self {
            Self::Block { children, .. } => children.first().is_some_and(Self::leads_blank),
            _ => false,
        }
    }

    fn last_trails_blank(&self) -> bool {
        match self {
            Self::Block { children, .. } => children.last().is_some_and(Self::trails_blank),
            _ => false,
        }
    }

    fn trim_first_blank(&mut self) {
        if let Self::Block { children, .. } = self {
            if let Some(first) = children.first_mut() {
                first.trim_lead_blank();
            }
        }
    }

    fn trim_last_blank(&mut self) {
        if let Self::Block { children, .. } = self {
            if let Some(last) = children.last_mut() {
                last.trim_trail_blank();
            }
        }
    }
}

/// Removes the whitespace and newline around tags that stand alone on
/// their line. `top` is set for the outermost level, whose start and end
/// count as line boundaries.
fn trim(nodes: &mut [Node], top: bool) {
    let len = nodes.len();
    for ii in 0..len {
        let is_block = matches!(nodes[ii], Node::Block { .. });
        let is_faux = matches!(nodes[ii], Node::Faux);
        if !is_block && !is_faux {
            continue;
        }

        let prev_blank = if ii == 0 { top } else { nodes[ii - 1].trails_blank() };
        let next_blank = if ii + 1 == len { top } else { nodes[ii + 1].leads_blank() };

        if is_faux {
            if prev_blank && next_blank {
                if ii > 0 {
                    nodes[ii - 1].trim_trail_blank();
                }
                if ii + 1 < len {
                    nodes[ii + 1].trim_lead_blank();
                }
            }
            continue;
        }

        // The open tag stands alone: blank before it, blank to the end of its line.
        if prev_blank && nodes[ii].first_leads_blank() {
            if ii > 0 {
                nodes[ii - 1].trim_trail_blank();
            }
            nodes[ii].trim_first_blank();
        }
        // The close tag stands alone.
        if next_blank && nodes[ii].last_trails_blank() {
            nodes[ii].trim_last_blank();
            if ii + 1 < len {
                nodes[ii + 1].trim_lead_blank();
            }
        }
    }
}

#[derive(Debug)]
struct Frame {
    name: String,
    line: usize,
    inverted: bool,
    children: Vec<Node>,
}

#[derive(Debug, Default)]
struct Accumulator {
    root: Vec<Node>,
    stack: Vec<Frame>,
}

impl Accumulator {
    fn current(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    fn add_text(&mut self, text: &mut String) {
        if text.is_empty() {
            return;
        }
        let first = self.stack.is_empty() && self.root.is_empty();
        let node = Node::Text(TextNode::new(std::mem::take(text), first));
        self.current().push(node);
    }

    fn add_faux(&mut self) {
        self.current().push(Node::Faux);
    }

    fn add_tag(&mut self, tag: &str, line: usize) -> StacheResult<()> {
        let tag = tag.trim();
        let Some(sigil) = tag.chars().next() else {
            return Err(StacheError::parse("Invalid empty tag", line));
        };
        let rest = &tag[sigil.len_utf8()..];

        match sigil {
            '#' | '^' => {
                let name = tag_name(rest, tag, line)?;
                self.stack.push(Frame {
                    name,
                    line,
                    inverted: sigil == '^',
                    children: Vec::new(),
                });
            }
            '/' => {
                let name = tag_name(rest, tag, line)?;
                let Some(frame) = self.stack.pop() else {
                    return Err(StacheError::parse(
                        format!("Section close tag with no open tag '{name}'"),
                        line,
                    ));
                };
                if frame.name != name {
                    return Err(StacheError::parse(
                        format!(
                            "Section close tag with mismatched open tag '{name}' != '{}'",
                            frame.name
                        ),
                        line,
                    ));
                }
                let mut children = frame.children;
                trim(&mut children, false);
                self.current().push(Node::Block {
                    name: frame.name,
                    line: frame.line,
                    inverted: frame.inverted,
                    children,
                });
            }
            '>' => {
                let name = tag_name(rest, tag, line)?;
                self.current().push(Node::Include { name, line });
            }
            '!' => self.add_faux(),
            '&' => {
                let name = tag_name(rest, tag, line)?;
                self.current().push(Node::Variable {
                    name,
                    line,
                    escaped: false,
                });
            }
            _ => {
                let name = tag_name(tag, tag, line)?;
                self.current().push(Node::Variable {
                    name,
                    line,
                    escaped: true,
                });
            }
        }
        Ok(())
    }

    fn finish(mut self, compiler: &Compiler) -> StacheResult<Vec<Segment>> {
        if let Some(frame) = self.stack.last() {
            return Err(StacheError::parse(
                format!("Section missing close tag '{}'", frame.name),
                frame.line,
            ));
        }
        trim(&mut self.root, true);
        Ok(lower(self.root, compiler))
    }
}

fn tag_name(raw: &str, tag: &str, line: usize) -> StacheResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(StacheError::parse(format!("Invalid empty tag name '{tag}'"), line));
    }
    if name.contains('\n') {
        return Err(StacheError::parse(
            format!("Invalid tag name: contains newline '{tag}'"),
            line,
        ));
    }
    Ok(name.to_string())
}

/// Converts trimmed parse nodes into executable segments, dropping faux
/// segments and text emptied by trimming.
fn lower(nodes: Vec<Node>, compiler: &Compiler) -> Vec<Segment> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            Node::Text(text) if text.text.is_empty() => None,
            Node::Text(text) => Some(Segment::Text(text.text)),
            Node::Faux => None,
            Node::Variable {
                name,
                line,
                escaped,
            } => Some(Segment::Variable(VariableSegment::new(
                Name::new(&name),
                line,
                escaped.then(|| compiler.escaper()),
            ))),
            Node::Block {
                name,
                line,
                inverted,
                children,
            } => {
                let block = BlockSegment::new(Name::new(&name), line, lower(children, compiler));
                Some(if inverted {
                    Segment::InvertedSection(block)
                } else {
                    Segment::Section(block)
                })
            }
            Node::Include { name, line } => Some(Segment::Include(IncludeSegment::new(
                name,
                line,
                compiler.clone(),
            ))),
        })
        .collect()
}
